//! Boundary decoders
//!
//! Each data source names its decoder explicitly; there is no format sniffing.
//! Both decoders produce the same [`Region`] shape, keyed by a configurable
//! property chain.

use crate::data::geojson::GeoJson;
use crate::data::region::{property_string, Region, RegionGeometry};
use crate::data::topojson::Topology;
use crate::data::DecodeError;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Boundary file shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryFormat {
    /// Hierarchical topology with named object groups
    Topology,
    /// Flat geometry collection
    Flat,
}

/// Which feature properties provide the join key and the display name.
///
/// Both are fallback chains: the first property holding a non-empty string or
/// number wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProperty {
    key_properties: Vec<String>,
    name_properties: Vec<String>,
}

impl KeyProperty {
    pub fn new<I, S>(key_properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key_properties: Vec<String> = key_properties.into_iter().map(Into::into).collect();
        Self {
            name_properties: key_properties.clone(),
            key_properties,
        }
    }

    /// Uses a different chain for the display name
    pub fn with_name_properties<I, S>(mut self, name_properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = name_properties.into_iter().map(Into::into).collect();
        if !names.is_empty() {
            self.name_properties = names;
        }
        self
    }

    /// geoBoundaries files name their shapes `shapeName`; generic files use `name`
    pub fn shape_name() -> Self {
        Self::new(["shapeName", "name"])
    }

    fn first_of(
        chain: &[String],
        properties: &FxHashMap<String, serde_json::Value>,
    ) -> Option<String> {
        chain
            .iter()
            .find_map(|name| properties.get(name).and_then(property_string))
    }

    /// Builds a region, falling back to the feature id for the key.
    ///
    /// A feature with neither keeps an empty key; it renders with the
    /// population fallback.
    fn region(
        &self,
        id: Option<serde_json::Value>,
        properties: FxHashMap<String, serde_json::Value>,
        geometry: RegionGeometry,
    ) -> Region {
        let key = Self::first_of(&self.key_properties, &properties)
            .or_else(|| id.as_ref().and_then(property_string))
            .unwrap_or_default();
        let display_name =
            Self::first_of(&self.name_properties, &properties).unwrap_or_else(|| key.clone());

        Region {
            key,
            display_name,
            geometry,
            properties,
        }
    }
}

impl Default for KeyProperty {
    fn default() -> Self {
        Self::shape_name()
    }
}

/// Turns a raw boundary document into regions. Pure; performs no I/O.
pub trait BoundaryDecoder: Send + Sync {
    fn decode(&self, raw: serde_json::Value) -> Result<Vec<Region>, DecodeError>;

    fn format(&self) -> BoundaryFormat;
}

/// Decoder for hierarchical topology files
#[derive(Debug, Clone, Default)]
pub struct TopologyDecoder {
    keys: KeyProperty,
}

impl TopologyDecoder {
    pub fn new(keys: KeyProperty) -> Self {
        Self { keys }
    }
}

impl BoundaryDecoder for TopologyDecoder {
    fn decode(&self, raw: serde_json::Value) -> Result<Vec<Region>, DecodeError> {
        let features = Topology::from_value(raw)?.into_features()?;
        let total = features.len();

        let regions: Vec<Region> = features
            .into_iter()
            .filter_map(|feature| {
                let geometry = feature.geometry?;
                Some(self.keys.region(feature.id, feature.properties, geometry))
            })
            .collect();

        log::debug!("decoded {} regions from {} topology features", regions.len(), total);
        Ok(regions)
    }

    fn format(&self) -> BoundaryFormat {
        BoundaryFormat::Topology
    }
}

/// Decoder for flat geometry collections, used as-is
#[derive(Debug, Clone, Default)]
pub struct FlatDecoder {
    keys: KeyProperty,
}

impl FlatDecoder {
    pub fn new(keys: KeyProperty) -> Self {
        Self { keys }
    }
}

impl BoundaryDecoder for FlatDecoder {
    fn decode(&self, raw: serde_json::Value) -> Result<Vec<Region>, DecodeError> {
        let geojson: GeoJson = serde_json::from_value(raw)?;
        let features = geojson.into_features();
        let total = features.len();

        let mut regions = Vec::with_capacity(total);
        for feature in features {
            let geometry = match &feature.geometry {
                Some(geometry) => geometry.to_region_geometry()?,
                None => None,
            };
            if let Some(geometry) = geometry {
                regions.push(self.keys.region(
                    feature.id,
                    feature.properties.unwrap_or_default(),
                    geometry,
                ));
            }
        }

        log::debug!("decoded {} regions from {} features", regions.len(), total);
        Ok(regions)
    }

    fn format(&self) -> BoundaryFormat {
        BoundaryFormat::Flat
    }
}

/// Creates the decoder for a format
pub fn decoder_for(format: BoundaryFormat, keys: KeyProperty) -> Box<dyn BoundaryDecoder> {
    match format {
        BoundaryFormat::Topology => Box::new(TopologyDecoder::new(keys)),
        BoundaryFormat::Flat => Box::new(FlatDecoder::new(keys)),
    }
}
