pub mod config;
pub mod constants;
pub mod geo;
pub mod lod;
pub mod viewport;

pub use self::config::{
    BoundarySource, ChoroplethConfig, ExpandPolicy, InitialView, LevelSource, PopulationSource,
};
pub use self::geo::{LatLng, LatLngBounds};
pub use self::lod::{derive_level, Level, LevelEvent, LevelOfDetailManager, LevelTransition, TransitionTrigger};
pub use self::viewport::{Viewport, ViewportEvent};
