pub mod choropleth;
pub mod color;

pub use choropleth::{format_population, ChoroplethStyler, ColorScale, Palette, RegionStyle};
pub use color::{Color, ColorParseError, Interpolatable};
