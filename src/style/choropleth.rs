//! Population to color mapping

use crate::core::constants::{
    DEFAULT_FILL_OPACITY, DEFAULT_HIGH_COLOR, DEFAULT_LOW_COLOR, DEFAULT_STROKE_COLOR,
    DEFAULT_STROKE_OPACITY, DEFAULT_STROKE_WEIGHT,
};
use crate::data::population::{Domain, PopulationDataset};
use crate::data::region::Region;
use crate::style::color::{Color, Interpolatable};
use serde::{Deserialize, Serialize};

/// Colors and fixed stroke/fill constants for a choropleth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub low_color: Color,
    pub high_color: Color,
    pub stroke_color: Color,
    pub stroke_weight: f64,
    pub stroke_opacity: f64,
    pub fill_opacity: f64,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            low_color: Color::parse_hex(DEFAULT_LOW_COLOR).unwrap_or(Color::WHITE),
            high_color: Color::parse_hex(DEFAULT_HIGH_COLOR).unwrap_or(Color::RED),
            stroke_color: Color::parse_hex(DEFAULT_STROKE_COLOR).unwrap_or(Color::RED),
            stroke_weight: DEFAULT_STROKE_WEIGHT,
            stroke_opacity: DEFAULT_STROKE_OPACITY,
            fill_opacity: DEFAULT_FILL_OPACITY,
        }
    }
}

/// Two-color linear scale over a population domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub low: Color,
    pub high: Color,
}

impl ColorScale {
    pub fn new(low: Color, high: Color) -> Self {
        Self { low, high }
    }

    /// Color at `value`; out-of-domain values clamp to the nearer endpoint
    /// and a degenerate domain always yields the low color.
    pub fn color_at(&self, domain: &Domain, value: f64) -> Color {
        if domain.is_degenerate() || !value.is_finite() {
            return self.low;
        }
        self.low.lerp(&self.high, domain.normalize(value))
    }
}

/// Style handed to the render sink for one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_weight: f64,
    pub stroke_opacity: f64,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethStyler {
    scale: ColorScale,
    palette: Palette,
}

impl ChoroplethStyler {
    pub fn from_palette(palette: Palette) -> Self {
        Self {
            scale: ColorScale::new(palette.low_color, palette.high_color),
            palette,
        }
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Style for a region; a missing population entry or an empty table falls
    /// back to the low color.
    pub fn style_for(&self, region: &Region, population: &PopulationDataset) -> RegionStyle {
        let fill_color = match (population.get(&region.key), population.domain()) {
            (Some(value), Some(domain)) => self.scale.color_at(&domain, value),
            _ => self.scale.low,
        };

        RegionStyle {
            fill_color,
            stroke_color: self.palette.stroke_color,
            stroke_weight: self.palette.stroke_weight,
            stroke_opacity: self.palette.stroke_opacity,
            fill_opacity: self.palette.fill_opacity,
        }
    }

    /// `"<name>: <population>"`, or `"<name>: population unknown"`
    pub fn label_for(&self, region: &Region, population: &PopulationDataset) -> String {
        match population.get(&region.key) {
            Some(value) => format!("{}: {}", region.display_name, format_population(value)),
            None => format!("{}: population unknown", region.display_name),
        }
    }
}

impl Default for ChoroplethStyler {
    fn default() -> Self {
        Self::from_palette(Palette::default())
    }
}

/// Rounds to a whole count and groups digits in threes
pub fn format_population(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::region::RegionGeometry;
    use geo::polygon;
    use fxhash::FxHashMap;

    fn region(key: &str) -> Region {
        Region {
            key: key.to_string(),
            display_name: key.to_string(),
            geometry: RegionGeometry::Polygon(polygon![
                (x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0)
            ]),
            properties: FxHashMap::default(),
        }
    }

    fn table() -> PopulationDataset {
        PopulationDataset::from_entries([("low", 0.0), ("mid", 500.0), ("high", 1000.0)])
    }

    #[test]
    fn test_color_endpoints_and_midpoint() {
        let styler = ChoroplethStyler::default();
        let population = table();

        assert_eq!(styler.style_for(&region("low"), &population).fill_color, Color::WHITE);
        assert_eq!(styler.style_for(&region("high"), &population).fill_color, Color::RED);
        assert_eq!(
            styler.style_for(&region("mid"), &population).fill_color,
            Color::rgb(255, 128, 128)
        );
    }

    #[test]
    fn test_degenerate_domain_is_low_color() {
        let styler = ChoroplethStyler::default();
        let population = PopulationDataset::from_entries([("a", 500.0), ("b", 500.0)]);
        assert_eq!(styler.style_for(&region("a"), &population).fill_color, Color::WHITE);

        let scale = styler.scale();
        let domain = Domain::new(500.0, 500.0);
        for value in [0.0, 500.0, 1e9] {
            assert_eq!(scale.color_at(&domain, value), Color::WHITE);
        }
    }

    #[test]
    fn test_out_of_domain_values_clamp() {
        let scale = ChoroplethStyler::default().scale;
        let domain = Domain::new(0.0, 1000.0);
        assert_eq!(scale.color_at(&domain, -50.0), Color::WHITE);
        assert_eq!(scale.color_at(&domain, 5000.0), Color::RED);
    }

    #[test]
    fn test_missing_entry_falls_back() {
        let styler = ChoroplethStyler::default();
        let population = table();
        let nowhere = region("Nowhere");

        let style = styler.style_for(&nowhere, &population);
        assert_eq!(style.fill_color, Color::WHITE);
        assert_eq!(style.stroke_color, Color::RED);
        assert_eq!(style.fill_opacity, 0.6);
        assert_eq!(styler.label_for(&nowhere, &population), "Nowhere: population unknown");

        let empty = PopulationDataset::default();
        assert_eq!(styler.style_for(&region("low"), &empty).fill_color, Color::WHITE);
    }

    #[test]
    fn test_label_formatting() {
        let styler = ChoroplethStyler::default();
        let population = PopulationDataset::from_entries([("California", 39512223.0)]);
        assert_eq!(
            styler.label_for(&region("California"), &population),
            "California: 39,512,223"
        );

        assert_eq!(format_population(0.0), "0");
        assert_eq!(format_population(999.4), "999");
        assert_eq!(format_population(1000.0), "1,000");
        assert_eq!(format_population(-1234567.0), "-1,234,567");
    }
}
