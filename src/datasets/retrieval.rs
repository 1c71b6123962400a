//! Retrieval back-ends
//!
//! A [`Retriever`] turns a locator string into a parsed JSON value. The cache
//! only ever talks to this trait; transport details stay behind it.

use async_trait::async_trait;
use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Why a retrieval failed. Cloneable so one failure can be shared by every
/// caller awaiting the same in-flight retrieval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    #[error("network error fetching '{locator}': {message}")]
    Network { locator: String, message: String },

    #[error("'{locator}' answered with HTTP {status}")]
    Status { locator: String, status: u16 },

    #[error("could not read '{locator}': {message}")]
    Io { locator: String, message: String },

    #[error("'{locator}' is not valid JSON: {message}")]
    Parse { locator: String, message: String },

    #[error("no document at '{0}'")]
    NotFound(String),
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, locator: &str) -> Result<serde_json::Value, RetrievalError>;
}

#[async_trait]
impl<R: Retriever + ?Sized> Retriever for Arc<R> {
    async fn retrieve(&self, locator: &str) -> Result<serde_json::Value, RetrievalError> {
        (**self).retrieve(locator).await
    }
}

/// Shared HTTP client; building it once keeps one TLS setup and connection
/// pool for every dataset.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("choroplet/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            log::warn!("falling back to a default HTTP client: {}", err);
            reqwest::Client::new()
        })
});

/// Fetches `base_url` + locator over HTTP
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    base_url: String,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return locator.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            locator.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, locator: &str) -> Result<serde_json::Value, RetrievalError> {
        let url = self.url_for(locator);
        log::debug!("GET {}", url);

        let network = |err: reqwest::Error| RetrievalError::Network {
            locator: locator.to_string(),
            message: err.to_string(),
        };

        let response = HTTP_CLIENT.get(&url).send().await.map_err(network)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RetrievalError::NotFound(locator.to_string()));
        }
        if !status.is_success() {
            return Err(RetrievalError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(network)?;
        log::info!("downloaded {} ({} bytes)", locator, body.len());
        serde_json::from_slice(&body).map_err(|err| RetrievalError::Parse {
            locator: locator.to_string(),
            message: err.to_string(),
        })
    }
}

/// Reads locators as paths below a base directory
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct FileRetriever {
    base_dir: std::path::PathBuf,
}

#[cfg(feature = "tokio-runtime")]
impl FileRetriever {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[cfg(feature = "tokio-runtime")]
#[async_trait]
impl Retriever for FileRetriever {
    async fn retrieve(&self, locator: &str) -> Result<serde_json::Value, RetrievalError> {
        let path = self.base_dir.join(locator.trim_start_matches('/'));
        log::debug!("reading {}", path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                RetrievalError::NotFound(locator.to_string())
            } else {
                RetrievalError::Io {
                    locator: locator.to_string(),
                    message: err.to_string(),
                }
            }
        })?;

        serde_json::from_slice(&bytes).map_err(|err| RetrievalError::Parse {
            locator: locator.to_string(),
            message: err.to_string(),
        })
    }
}

/// In-memory documents keyed by locator
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    documents: FxHashMap<String, serde_json::Value>,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, locator: impl Into<String>, document: serde_json::Value) -> Self {
        self.documents.insert(locator.into(), document);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, document: serde_json::Value) {
        self.documents.insert(locator.into(), document);
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, locator: &str) -> Result<serde_json::Value, RetrievalError> {
        self.documents
            .get(locator)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_for_joins_base() {
        let http = HttpRetriever::new("https://example.org/data/");
        assert_eq!(http.url_for("/states.json"), "https://example.org/data/states.json");
        assert_eq!(http.url_for("states.json"), "https://example.org/data/states.json");
        assert_eq!(http.url_for("http://other.host/x.json"), "http://other.host/x.json");
    }

    #[test]
    fn test_static_retriever() {
        let retriever = StaticRetriever::new().with_document("a.json", json!([1, 2]));
        let found = futures::executor::block_on(retriever.retrieve("a.json")).unwrap();
        assert_eq!(found, json!([1, 2]));

        let missing = futures::executor::block_on(retriever.retrieve("b.json"));
        assert_eq!(missing, Err(RetrievalError::NotFound("b.json".into())));
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_file_retriever_missing_file() {
        let retriever = FileRetriever::new(std::env::temp_dir());
        let err = retriever
            .retrieve("choroplet-definitely-missing.json")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::NotFound(_)));
    }
}
