//! Test retrievers and sinks shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use choroplet::prelude::*;
use futures::channel::oneshot;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Routes crate logging to the test harness; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serves fixed documents, counts calls, and can hold or fail a locator
#[derive(Default)]
pub struct GatedRetriever {
    documents: HashMap<String, Value>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl GatedRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, locator: &str, document: Value) -> Self {
        self.documents.insert(locator.to_string(), document);
        self
    }

    /// The next retrieval of `locator` waits until the returned sender fires
    pub fn gate(&self, locator: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(locator.to_string(), rx);
        tx
    }

    pub fn fail(&self, locator: &str) {
        self.failing.lock().unwrap().insert(locator.to_string());
    }

    pub fn heal(&self, locator: &str) {
        self.failing.lock().unwrap().remove(locator);
    }

    pub fn calls_for(&self, locator: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.as_str() == locator)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Retriever for GatedRetriever {
    async fn retrieve(&self, locator: &str) -> std::result::Result<Value, RetrievalError> {
        self.calls.lock().unwrap().push(locator.to_string());

        let gate = self.gates.lock().unwrap().remove(locator);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.failing.lock().unwrap().contains(locator) {
            return Err(RetrievalError::Network {
                locator: locator.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.documents
            .get(locator)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(locator.to_string()))
    }
}

/// Everything a sink was handed, in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub cleared: Vec<Level>,
    /// `(key, fill hex, label)` for the most recent render
    pub drawn: Vec<(String, String, String)>,
    pub centers: Vec<(Level, Option<String>)>,
    pub notices: Vec<Diagnostic>,
}

impl RenderSink for RecordingSink {
    fn clear(&mut self, level: Level) {
        self.cleared.push(level);
        self.drawn.clear();
    }

    fn draw_region(&mut self, region: &Region, style: &RegionStyle, label: &str) {
        self.drawn
            .push((region.key.clone(), style.fill_color.to_hex(), label.to_string()));
    }

    fn center_region(&mut self, level: Level, region: Option<&Region>) {
        self.centers.push((level, region.map(|r| r.key.clone())));
    }

    fn notice(&mut self, diagnostic: &Diagnostic) {
        self.notices.push(diagnostic.clone());
    }
}

/// Axis-aligned rectangle feature; `x` is longitude, `y` latitude
pub fn rect_feature(properties: Value, west: f64, south: f64, east: f64, north: f64) -> Value {
    serde_json::json!({
        "type": "Feature",
        "properties": properties,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[west, south], [west, north], [east, north], [east, south], [west, south]]]
        }
    })
}

pub fn collection(features: Vec<Value>) -> Value {
    serde_json::json!({"type": "FeatureCollection", "features": features})
}

/// Config whose every level reads flat boundaries from `<level>.geojson`
/// and population from `<level>-pop.json` keyed by `name`/`population`.
pub fn flat_config(levels: &[Level]) -> ChoroplethConfig {
    let mut config = ChoroplethConfig::default();
    config.levels.clear();
    for level in levels {
        config.levels.insert(
            *level,
            LevelSource {
                boundary: BoundarySource::flat(format!("{}.geojson", level))
                    .with_key_properties(["name"]),
                population: PopulationSource::new(
                    format!("{}-pop.json", level),
                    PopulationDecoder::new(["name"], "population"),
                ),
            },
        );
    }
    config
}
