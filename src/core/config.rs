//! Configuration for the choropleth engine
//!
//! Every level names its own boundary and population source together with the
//! decoder settings for each. The default reproduces the US census layout:
//! world countries, US states and US counties.

use crate::core::constants::{
    DEFAULT_CENTER, DEFAULT_CODE_PROPERTY, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_ZOOM,
};
use crate::core::geo::LatLng;
use crate::core::lod::Level;
use crate::data::decoder::{decoder_for, BoundaryDecoder, BoundaryFormat, KeyProperty};
use crate::data::population::PopulationDecoder;
use crate::style::choropleth::Palette;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Where a level's boundaries come from and how to read them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySource {
    pub locator: String,
    pub format: BoundaryFormat,
    /// Join key, first present property wins
    #[serde(default = "default_key_properties")]
    pub key_properties: Vec<String>,
    /// Display name; falls back to `key_properties` when empty
    #[serde(default)]
    pub name_properties: Vec<String>,
}

fn default_key_properties() -> Vec<String> {
    vec!["shapeName".into(), "name".into()]
}

impl BoundarySource {
    pub fn topology(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            format: BoundaryFormat::Topology,
            key_properties: default_key_properties(),
            name_properties: Vec::new(),
        }
    }

    pub fn flat(locator: impl Into<String>) -> Self {
        Self {
            format: BoundaryFormat::Flat,
            ..Self::topology(locator)
        }
    }

    pub fn with_key_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn key_property(&self) -> KeyProperty {
        KeyProperty::new(self.key_properties.iter().cloned())
            .with_name_properties(self.name_properties.iter().cloned())
    }

    /// The decoder selected by this source's format
    pub fn decoder(&self) -> Box<dyn BoundaryDecoder> {
        decoder_for(self.format, self.key_property())
    }
}

/// Where a level's population table comes from and its field layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSource {
    pub locator: String,
    #[serde(flatten)]
    pub fields: PopulationDecoder,
}

impl PopulationSource {
    pub fn new(locator: impl Into<String>, fields: PopulationDecoder) -> Self {
        Self {
            locator: locator.into(),
            fields,
        }
    }

    pub fn decoder(&self) -> &PopulationDecoder {
        &self.fields
    }
}

/// Both data sources of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSource {
    pub boundary: BoundarySource,
    pub population: PopulationSource,
}

/// Selection codes that descend to the next finer level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandPolicy {
    /// Feature property holding the code
    pub code_property: String,
    pub codes: Vec<String>,
}

impl ExpandPolicy {
    pub fn expands(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }

    /// Owned predicate for the level manager
    pub fn predicate(&self) -> impl Fn(&str) -> bool + Send + Sync + 'static {
        let policy = self.clone();
        move |code| policy.expands(code)
    }
}

impl Default for ExpandPolicy {
    fn default() -> Self {
        Self {
            code_property: DEFAULT_CODE_PROPERTY.to_string(),
            codes: vec!["US".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialView {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

impl InitialView {
    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            lat: DEFAULT_CENTER.0,
            lon: DEFAULT_CENTER.1,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Top-level engine configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoroplethConfig {
    pub levels: BTreeMap<Level, LevelSource>,
    pub palette: Palette,
    pub expand: ExpandPolicy,
    pub initial_view: InitialView,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ChoroplethConfig {
    fn default() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(
            Level::Country,
            LevelSource {
                boundary: BoundarySource::topology("world-countries.topojson"),
                population: PopulationSource::new(
                    "population_country.json",
                    PopulationDecoder::country(),
                ),
            },
        );
        levels.insert(
            Level::Region,
            LevelSource {
                boundary: BoundarySource::topology("geoBoundaries-USA-ADM1_simplified.topojson"),
                population: PopulationSource::new(
                    "population_state.json",
                    PopulationDecoder::state_estimate(),
                ),
            },
        );
        levels.insert(
            Level::Subregion,
            LevelSource {
                boundary: BoundarySource::topology("geoBoundaries-USA-ADM2_simplified.topojson"),
                population: PopulationSource::new("population.json", PopulationDecoder::subregion()),
            },
        );

        Self {
            levels,
            palette: Palette::default(),
            expand: ExpandPolicy::default(),
            initial_view: InitialView::default(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ChoroplethConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::debug!("loading config from {}", path.display());
        Self::from_json_str(&json)
    }

    pub fn source(&self, level: Level) -> Option<&LevelSource> {
        self.levels.get(&level)
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(MapError::Config("no level sources configured".into()));
        }
        if !(self.min_zoom <= self.max_zoom) {
            return Err(MapError::Config(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        for (level, source) in &self.levels {
            if source.boundary.locator.is_empty() || source.population.locator.is_empty() {
                return Err(MapError::Config(format!("{} source has an empty locator", level)));
            }
            if source.boundary.key_properties.is_empty() {
                return Err(MapError::Config(format!(
                    "{} boundary source has no key properties",
                    level
                )));
            }
            if source.population.fields.key_fields.is_empty() {
                return Err(MapError::Config(format!(
                    "{} population source has no key fields",
                    level
                )));
            }
        }
        for opacity in [
            self.palette.stroke_opacity,
            self.palette.fill_opacity,
        ] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(MapError::Config(format!("opacity {} outside 0..=1", opacity)));
            }
        }
        Ok(())
    }
}
