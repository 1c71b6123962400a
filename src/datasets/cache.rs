//! Lazy per-level dataset cache
//!
//! `ensure_level` issues at most one retrieval per missing component. The
//! boundary and population halves load independently and concurrently; each
//! completion writes only its own `(level, component)` entry in the store.
//!
//! A component that is already being fetched is not fetched again: later
//! callers await the same in-flight retrieval. Inside a tokio runtime every
//! retrieval runs as its own task, so dropping an `ensure_level` future does
//! not cancel it and the result is still cached. Without a runtime the shared
//! retrieval only makes progress while someone polls it.

use crate::core::config::{ChoroplethConfig, LevelSource};
use crate::core::lod::Level;
use crate::data::decoder::BoundaryDecoder;
use crate::data::population::PopulationDecoder;
use crate::data::region::BoundaryDataset;
use crate::data::DecodeError;
use crate::datasets::retrieval::{RetrievalError, Retriever};
use crate::datasets::store::{Component, ComponentData, DatasetStore, ReadyLevel};
use futures::future::{BoxFuture, FutureExt, Shared};
use fxhash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Failure of one component of one level
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("{level} {component} retrieval failed: {source}")]
    Retrieval {
        level: Level,
        component: Component,
        #[source]
        source: RetrievalError,
    },

    #[error("{level} {component} could not be decoded: {source}")]
    Decode {
        level: Level,
        component: Component,
        #[source]
        source: DecodeError,
    },

    #[error("{level} {component} load was interrupted: {message}")]
    Interrupted {
        level: Level,
        component: Component,
        message: String,
    },

    #[error("no data source configured for level {0}")]
    MissingSource(Level),
}

impl DatasetError {
    pub fn level(&self) -> Level {
        match self {
            DatasetError::Retrieval { level, .. }
            | DatasetError::Decode { level, .. }
            | DatasetError::Interrupted { level, .. }
            | DatasetError::MissingSource(level) => *level,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, DatasetError::Decode { .. })
    }
}

/// A level that could not be made ready. Recoverable: the level simply stays
/// not ready, and a later `ensure_level` retries the missing components.
/// `failures` always holds at least one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLoadError {
    pub level: Level,
    pub failures: Vec<DatasetError>,
}

impl fmt::Display for LevelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {} is not ready", self.level)?;
        for failure in &self.failures {
            write!(f, "; {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for LevelLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| failure as &(dyn std::error::Error + 'static))
    }
}

/// A level's sources with their decoders already selected
struct CompiledSource {
    boundary_locator: String,
    boundary_decoder: Box<dyn BoundaryDecoder>,
    population_locator: String,
    population_decoder: PopulationDecoder,
}

impl From<&LevelSource> for CompiledSource {
    fn from(source: &LevelSource) -> Self {
        Self {
            boundary_locator: source.boundary.locator.clone(),
            boundary_decoder: source.boundary.decoder(),
            population_locator: source.population.locator.clone(),
            population_decoder: source.population.decoder().clone(),
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<(), DatasetError>>>;

struct CacheInner {
    store: DatasetStore,
    sources: BTreeMap<Level, CompiledSource>,
    retriever: Arc<dyn Retriever>,
    inflight: Mutex<FxHashMap<(Level, Component), SharedFetch>>,
    retrievals: AtomicUsize,
}

impl CacheInner {
    fn inflight(&self) -> MutexGuard<'_, FxHashMap<(Level, Component), SharedFetch>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Session-long cache of per-level boundaries and population.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct DatasetCache {
    inner: Arc<CacheInner>,
}

impl DatasetCache {
    pub fn new(config: &ChoroplethConfig, retriever: Arc<dyn Retriever>) -> Self {
        let sources = config
            .levels
            .iter()
            .map(|(level, source)| (*level, CompiledSource::from(source)))
            .collect();

        Self {
            inner: Arc::new(CacheInner {
                store: DatasetStore::new(),
                sources,
                retriever,
                inflight: Mutex::new(FxHashMap::default()),
                retrievals: AtomicUsize::new(0),
            }),
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.inner.store
    }

    /// Levels with a configured source
    pub fn levels(&self) -> Vec<Level> {
        self.inner.sources.keys().copied().collect()
    }

    pub fn ready(&self, level: Level) -> Option<ReadyLevel> {
        self.inner.store.ready(level)
    }

    pub fn is_ready(&self, level: Level) -> bool {
        self.inner.store.is_ready(level)
    }

    /// Total retrievals issued so far
    pub fn retrievals_issued(&self) -> usize {
        self.inner.retrievals.load(Ordering::SeqCst)
    }

    /// Makes `level` ready, retrieving only what is missing.
    ///
    /// Resolves immediately without side effects when the level is already
    /// ready. Failures leave the failed components absent.
    pub async fn ensure_level(&self, level: Level) -> Result<ReadyLevel, LevelLoadError> {
        if !self.inner.sources.contains_key(&level) {
            return Err(LevelLoadError {
                level,
                failures: vec![DatasetError::MissingSource(level)],
            });
        }

        loop {
            if let Some(ready) = self.inner.store.ready(level) {
                return Ok(ready);
            }

            let (boundaries, population) = futures::join!(
                self.ensure_component(level, Component::Boundaries),
                self.ensure_component(level, Component::Population)
            );

            let failures: Vec<DatasetError> = [boundaries, population]
                .into_iter()
                .filter_map(Result::err)
                .collect();
            if !failures.is_empty() {
                return Err(LevelLoadError { level, failures });
            }
            // both components are merged once their fetches succeed
        }
    }

    /// Starts loading `level` on the tokio runtime without waiting for it.
    /// The result lands in the store even if nobody asks for the level again.
    #[cfg(feature = "tokio-runtime")]
    pub fn prefetch(
        &self,
        level: Level,
    ) -> tokio::task::JoinHandle<Result<ReadyLevel, LevelLoadError>> {
        let cache = self.clone();
        tokio::spawn(async move { cache.ensure_level(level).await })
    }

    /// Loads one component, joining an in-flight retrieval if there is one
    pub async fn ensure_component(
        &self,
        level: Level,
        component: Component,
    ) -> Result<(), DatasetError> {
        let key = (level, component);
        let fetch = {
            let mut inflight = self.inner.inflight();
            // checked under the in-flight lock: a fetch merges before it unregisters
            if self.inner.store.contains(level, component) {
                return Ok(());
            }
            match inflight.get(&key) {
                Some(fetch) => {
                    log::debug!("joining in-flight {} {} retrieval", level, component);
                    fetch.clone()
                }
                None => {
                    let fetch = Self::fetch(Arc::clone(&self.inner), level, component).boxed();
                    let fetch = Self::detach(&self.inner, fetch, level, component).shared();
                    inflight.insert(key, fetch.clone());
                    fetch
                }
            }
        };
        fetch.await
    }

    /// Runs the fetch as its own task when a tokio runtime is available, so it
    /// completes and merges even after every waiter has gone away.
    #[cfg(feature = "tokio-runtime")]
    fn detach(
        inner: &Arc<CacheInner>,
        fetch: BoxFuture<'static, Result<(), DatasetError>>,
        level: Level,
        component: Component,
    ) -> BoxFuture<'static, Result<(), DatasetError>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return fetch,
        };
        let task = handle.spawn(fetch);
        let inner = Arc::clone(inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    // the task died before unregistering itself
                    inner.inflight().remove(&(level, component));
                    Err(DatasetError::Interrupted {
                        level,
                        component,
                        message: err.to_string(),
                    })
                }
            }
        }
        .boxed()
    }

    #[cfg(not(feature = "tokio-runtime"))]
    fn detach(
        _inner: &Arc<CacheInner>,
        fetch: BoxFuture<'static, Result<(), DatasetError>>,
        _level: Level,
        _component: Component,
    ) -> BoxFuture<'static, Result<(), DatasetError>> {
        fetch
    }

    async fn fetch(
        inner: Arc<CacheInner>,
        level: Level,
        component: Component,
    ) -> Result<(), DatasetError> {
        let result = Self::load(&inner, level, component).await;

        match &result {
            Ok(data) => {
                inner.store.merge(level, data.clone());
                log::info!("{} {} loaded", level, component);
            }
            Err(err) => log::warn!("{}", err),
        }
        inner.inflight().remove(&(level, component));

        result.map(|_| ())
    }

    async fn load(
        inner: &CacheInner,
        level: Level,
        component: Component,
    ) -> Result<ComponentData, DatasetError> {
        let source = inner
            .sources
            .get(&level)
            .ok_or(DatasetError::MissingSource(level))?;
        let locator = match component {
            Component::Boundaries => &source.boundary_locator,
            Component::Population => &source.population_locator,
        };

        inner.retrievals.fetch_add(1, Ordering::SeqCst);
        log::debug!("retrieving {} {} from {}", level, component, locator);
        let raw = inner
            .retriever
            .retrieve(locator)
            .await
            .map_err(|source| DatasetError::Retrieval {
                level,
                component,
                source,
            })?;

        let decode_error = |source| DatasetError::Decode {
            level,
            component,
            source,
        };
        match component {
            Component::Boundaries => {
                let regions = source.boundary_decoder.decode(raw).map_err(decode_error)?;
                Ok(ComponentData::Boundaries(Arc::new(BoundaryDataset::new(regions))))
            }
            Component::Population => {
                let population = source.population_decoder.decode(raw).map_err(decode_error)?;
                Ok(ComponentData::Population(Arc::new(population)))
            }
        }
    }
}

impl fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCache")
            .field("levels", &self.levels())
            .field("retrievals", &self.retrievals_issued())
            .finish_non_exhaustive()
    }
}
