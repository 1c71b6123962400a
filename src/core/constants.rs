//! Engine-wide constants for the US census choropleth layout and common web-map conventions.

/// Zoom strictly above this shows subregions (counties).
pub const SUBREGION_ZOOM_THRESHOLD: f64 = 7.0;

/// Zoom strictly above this (and not above the subregion threshold) shows regions (states).
pub const REGION_ZOOM_THRESHOLD: f64 = 4.0;

/// Viewport zoom limits, matching the usual slippy-map range.
pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 18.0;

/// Initial view over the contiguous United States.
pub const DEFAULT_CENTER: (f64, f64) = (39.0, -100.0);
pub const DEFAULT_ZOOM: f64 = 5.0;

/// Two-color population scale endpoints.
pub const DEFAULT_LOW_COLOR: &str = "#ffffff";
pub const DEFAULT_HIGH_COLOR: &str = "#ff0000";

/// Fixed outline styling, independent of population.
pub const DEFAULT_STROKE_COLOR: &str = "#ff0000";
pub const DEFAULT_STROKE_WEIGHT: f64 = 1.0;
pub const DEFAULT_STROKE_OPACITY: f64 = 0.2;
pub const DEFAULT_FILL_OPACITY: f64 = 0.6;

/// Feature property carrying the ISO 3166 alpha-2 code in the world boundary file.
pub const DEFAULT_CODE_PROPERTY: &str = "Alpha-2";
