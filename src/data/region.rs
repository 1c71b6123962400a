use crate::core::geo::{LatLng, LatLngBounds};
use crate::spatial::index::RegionIndex;
use fxhash::FxHashMap;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{BoundingRect, MultiPolygon, Polygon};

/// Areal geometry of a region
#[derive(Debug, Clone, PartialEq)]
pub enum RegionGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl RegionGeometry {
    /// Point-in-polygon test; holes are excluded and boundary points count as inside
    pub fn contains(&self, point: &LatLng) -> bool {
        let coord = point.to_coord();
        let position = match self {
            RegionGeometry::Polygon(p) => p.coordinate_position(&coord),
            RegionGeometry::MultiPolygon(mp) => mp.coordinate_position(&coord),
        };
        position != CoordPos::Outside
    }

    /// Bounding box, `None` for empty geometry
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let rect = match self {
            RegionGeometry::Polygon(p) => p.bounding_rect(),
            RegionGeometry::MultiPolygon(mp) => mp.bounding_rect(),
        };
        rect.map(LatLngBounds::from)
    }
}

/// A named area at one level, joined to population data by `key`
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Join identifier for population lookups
    pub key: String,
    /// Human-readable name used in labels
    pub display_name: String,
    pub geometry: RegionGeometry,
    /// Remaining feature properties (country codes and the like)
    pub properties: FxHashMap<String, serde_json::Value>,
}

impl Region {
    pub fn contains(&self, point: &LatLng) -> bool {
        self.geometry.contains(point)
    }

    /// String value of a property, numbers rendered as-is
    pub fn property_str(&self, name: &str) -> Option<String> {
        property_string(self.properties.get(name)?)
    }
}

/// Renders a scalar property as a join string
pub(crate) fn property_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The decoded boundaries of one level plus their containment index
#[derive(Debug)]
pub struct BoundaryDataset {
    regions: Vec<Region>,
    index: RegionIndex,
}

impl BoundaryDataset {
    pub fn new(regions: Vec<Region>) -> Self {
        let index = RegionIndex::build(&regions);
        Self { regions, index }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn index(&self) -> &RegionIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
