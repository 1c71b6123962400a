use crate::data::region::RegionGeometry;
use crate::data::DecodeError;
use fxhash::FxHashMap;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

/// A GeoJSON position; altitude and extra members are ignored
pub type Position = Vec<f64>;

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<FxHashMap<String, serde_json::Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
    Geometry(GeoJsonGeometry),
}

impl GeoJson {
    /// Flattens the document into its features, in document order
    pub fn into_features(self) -> Vec<GeoJsonFeature> {
        match self {
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::FeatureCollection { features } => features,
            GeoJson::Geometry(geometry) => vec![GeoJsonFeature {
                id: None,
                geometry: Some(geometry),
                properties: None,
            }],
        }
    }
}

impl GeoJsonGeometry {
    /// Converts areal geometries into a region geometry.
    ///
    /// Points and lines have no area and yield `None`; a collection keeps only
    /// its polygons.
    pub fn to_region_geometry(&self) -> Result<Option<RegionGeometry>, DecodeError> {
        match self {
            GeoJsonGeometry::Polygon { coordinates } => {
                Ok(Some(RegionGeometry::Polygon(polygon(coordinates)?)))
            }
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                let polygons = coordinates
                    .iter()
                    .map(|rings| polygon(rings))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(RegionGeometry::MultiPolygon(MultiPolygon::new(
                    polygons,
                ))))
            }
            GeoJsonGeometry::GeometryCollection { geometries } => {
                let mut polygons = Vec::new();
                for geometry in geometries {
                    match geometry.to_region_geometry()? {
                        Some(RegionGeometry::Polygon(p)) => polygons.push(p),
                        Some(RegionGeometry::MultiPolygon(mp)) => polygons.extend(mp.0),
                        None => {}
                    }
                }
                if polygons.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(RegionGeometry::MultiPolygon(MultiPolygon::new(
                        polygons,
                    ))))
                }
            }
            _ => Ok(None),
        }
    }
}

fn coord(position: &Position) -> Result<Coord<f64>, DecodeError> {
    match position.as_slice() {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(DecodeError::InvalidGeometry(format!(
            "position needs two coordinates, got {}",
            position.len()
        ))),
    }
}

fn ring(positions: &[Position]) -> Result<LineString<f64>, DecodeError> {
    positions
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, DecodeError> {
    let mut rings = rings.iter();
    let exterior = match rings.next() {
        Some(exterior) => ring(exterior)?,
        None => return Err(DecodeError::InvalidGeometry("polygon without rings".into())),
    };
    let interiors = rings
        .map(|r| ring(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geojson_parsing() {
        let geojson_str = r#"
        {
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "Square"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"name": "Nowhere"},
                    "geometry": null
                }
            ]
        }
        "#;

        let geojson: GeoJson = serde_json::from_str(geojson_str).unwrap();
        let features = geojson.into_features();
        assert_eq!(features.len(), 2);
        assert!(features[1].geometry.is_none());
    }

    #[test]
    fn test_altitude_is_ignored() {
        let geometry: GeoJsonGeometry = serde_json::from_str(
            r#"{"type":"Polygon","coordinates":[[[0,0,12],[0,2,12],[2,2,12],[0,0,12]]]}"#,
        )
        .unwrap();
        match geometry.to_region_geometry().unwrap() {
            Some(RegionGeometry::Polygon(p)) => assert_eq!(p.exterior().0.len(), 4),
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn test_non_areal_geometry_is_skipped() {
        let point = GeoJsonGeometry::Point {
            coordinates: vec![-74.0060, 40.7128],
        };
        assert!(point.to_region_geometry().unwrap().is_none());
    }

    #[test]
    fn test_short_position_is_rejected() {
        let geometry = GeoJsonGeometry::Polygon {
            coordinates: vec![vec![vec![0.0], vec![1.0, 1.0]]],
        };
        assert!(matches!(
            geometry.to_region_geometry(),
            Err(DecodeError::InvalidGeometry(_))
        ));
    }
}
