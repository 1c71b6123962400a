//! # Choroplet
//!
//! A multi-resolution choropleth engine. The viewport zoom selects an
//! administrative level; that level's boundaries and population table are
//! loaded lazily and cached for the session; every region is colored by its
//! population, and the region under the viewport center is resolved by a
//! containment query.
//!
//! Drawing and event wiring stay outside: hand the engine a [`Retriever`] for
//! raw documents and a [`RenderSink`] for the output.

pub mod core;
pub mod data;
pub mod datasets;
pub mod map;
pub mod prelude;
pub mod spatial;
pub mod style;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::ChoroplethConfig,
    geo::{LatLng, LatLngBounds},
    lod::{derive_level, Level, LevelEvent, LevelOfDetailManager, LevelTransition, TransitionTrigger},
    viewport::{Viewport, ViewportEvent},
};

pub use data::{BoundaryDecoder, BoundaryFormat, DecodeError, PopulationDataset, Region};

pub use datasets::{DatasetCache, DatasetError, LevelLoadError, RetrievalError, Retriever};

pub use map::ChoroplethMap;

pub use spatial::PointLocator;

pub use style::{ChoroplethStyler, Color, RegionStyle};

pub use traits::{Diagnostic, DiagnosticKind, RenderSink};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    LevelLoad(#[from] LevelLoadError),
}

/// Error type alias for convenience
pub type Error = MapError;
