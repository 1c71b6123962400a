//! Prelude module for common choroplet types and traits
//!
//! Re-exports the types most embedders need, for `use choroplet::prelude::*;`

pub use crate::core::{
    config::{
        BoundarySource, ChoroplethConfig, ExpandPolicy, InitialView, LevelSource,
        PopulationSource,
    },
    geo::{LatLng, LatLngBounds},
    lod::{derive_level, Level, LevelEvent, LevelOfDetailManager, LevelTransition, TransitionTrigger},
    viewport::{Viewport, ViewportEvent},
};

pub use crate::data::{
    BoundaryDataset, BoundaryDecoder, BoundaryFormat, DecodeError, Domain, FlatDecoder,
    KeyProperty, PopulationDataset, PopulationDecoder, Region, RegionGeometry, TopologyDecoder,
};

pub use crate::datasets::{
    Component, DatasetCache, DatasetError, DatasetStore, HttpRetriever, LevelLoadError,
    ReadyLevel, RetrievalError, Retriever, StaticRetriever,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::datasets::FileRetriever;

pub use crate::map::ChoroplethMap;

pub use crate::spatial::{PointLocator, RegionIndex};

pub use crate::style::{ChoroplethStyler, Color, Palette, RegionStyle};

pub use crate::traits::{Diagnostic, DiagnosticKind, RenderSink};

pub use crate::{Error as MapError, Result};

pub use std::sync::{Arc, Mutex};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
