//! Seams to the external rendering surface

use crate::core::lod::Level;
use crate::data::region::Region;
use crate::datasets::cache::{DatasetError, LevelLoadError};
use crate::style::choropleth::RegionStyle;
use serde::Serialize;

/// Category of a non-fatal problem reported to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    RetrievalFailure,
    DecodeFailure,
    ConfigFailure,
}

/// A degraded-state notice; the map stays interactive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn from_failure(failure: &DatasetError) -> Self {
        let kind = match failure {
            DatasetError::Retrieval { .. } | DatasetError::Interrupted { .. } => {
                DiagnosticKind::RetrievalFailure
            }
            DatasetError::Decode { .. } => DiagnosticKind::DecodeFailure,
            DatasetError::MissingSource(_) => DiagnosticKind::ConfigFailure,
        };
        Self {
            level: failure.level(),
            kind,
            message: failure.to_string(),
        }
    }

    /// One notice per failed component
    pub fn from_load_error(error: &LevelLoadError) -> Vec<Self> {
        error.failures.iter().map(Self::from_failure).collect()
    }
}

/// Receives everything the engine wants drawn or reported
pub trait RenderSink: Send {
    /// Called before a level's regions are drawn
    fn clear(&mut self, _level: Level) {}

    fn draw_region(&mut self, region: &Region, style: &RegionStyle, label: &str);

    /// The region under the viewport center, `None` when the center is in no region
    fn center_region(&mut self, level: Level, region: Option<&Region>);

    fn notice(&mut self, diagnostic: &Diagnostic);
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn clear(&mut self, level: Level) {
        (**self).clear(level)
    }

    fn draw_region(&mut self, region: &Region, style: &RegionStyle, label: &str) {
        (**self).draw_region(region, style, label)
    }

    fn center_region(&mut self, level: Level, region: Option<&Region>) {
        (**self).center_region(level, region)
    }

    fn notice(&mut self, diagnostic: &Diagnostic) {
        (**self).notice(diagnostic)
    }
}
