//! Hierarchical topology (TopoJSON) decoding
//!
//! A topology stores every boundary segment once, as an "arc", in a shared
//! table. Geometries reference arcs by index; a negative index `~i` walks arc
//! `i` backwards. When a `transform` is present, arc positions are quantized
//! integers and every position after the first is a delta from the previous one.

use crate::data::geojson::Position;
use crate::data::region::RegionGeometry;
use crate::data::DecodeError;
use fxhash::FxHashMap;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;

/// Quantization transform
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// Arc references, nested according to the geometry type
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArcRefs {
    Line(Vec<i64>),
    Rings(Vec<Vec<i64>>),
    Polygons(Vec<Vec<Vec<i64>>>),
}

/// A geometry object inside a topology's `objects` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopoGeometry {
    /// `null` for features without geometry
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub arcs: Option<ArcRefs>,
    #[serde(default)]
    pub geometries: Vec<TopoGeometry>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: Option<FxHashMap<String, serde_json::Value>>,
}

/// Root topology document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Position>>,
    /// Named object groups, in document order
    pub objects: serde_json::Map<String, serde_json::Value>,
}

/// One geometry lifted out of a topology, with its own properties
#[derive(Debug, Clone, PartialEq)]
pub struct TopoFeature {
    pub id: Option<serde_json::Value>,
    pub properties: FxHashMap<String, serde_json::Value>,
    pub geometry: Option<RegionGeometry>,
}

impl Topology {
    /// Parses and validates a topology document
    pub fn from_value(raw: serde_json::Value) -> Result<Self, DecodeError> {
        let topology: Topology = serde_json::from_value(raw)?;
        if topology.kind != "Topology" {
            return Err(DecodeError::UnexpectedType {
                expected: "Topology",
                found: topology.kind,
            });
        }
        Ok(topology)
    }

    /// Converts every named object group into features and concatenates them
    /// in group order.
    pub fn into_features(self) -> Result<Vec<TopoFeature>, DecodeError> {
        let arcs = self.resolve_arcs()?;
        let mut features = Vec::new();

        for (name, object) in self.objects {
            let object: TopoGeometry = serde_json::from_value(object)?;
            let before = features.len();
            collect_features(&arcs, object, &mut features)?;
            log::debug!("topology object '{}' yielded {} features", name, features.len() - before);
        }

        Ok(features)
    }

    /// Absolute coordinates for every arc, dequantized when a transform is present
    fn resolve_arcs(&self) -> Result<Vec<Vec<Coord<f64>>>, DecodeError> {
        self.arcs
            .iter()
            .map(|arc| {
                let mut x = 0.0;
                let mut y = 0.0;
                arc.iter()
                    .map(|position| {
                        let (px, py) = match position.as_slice() {
                            [px, py, ..] => (*px, *py),
                            _ => {
                                return Err(DecodeError::InvalidGeometry(
                                    "arc position needs two coordinates".into(),
                                ))
                            }
                        };
                        Ok(match &self.transform {
                            Some(t) => {
                                x += px;
                                y += py;
                                Coord {
                                    x: x * t.scale[0] + t.translate[0],
                                    y: y * t.scale[1] + t.translate[1],
                                }
                            }
                            None => Coord { x: px, y: py },
                        })
                    })
                    .collect::<Result<Vec<_>, DecodeError>>()
            })
            .collect()
    }
}

fn collect_features(
    arcs: &[Vec<Coord<f64>>],
    object: TopoGeometry,
    out: &mut Vec<TopoFeature>,
) -> Result<(), DecodeError> {
    if object.kind.as_deref() == Some("GeometryCollection") {
        for child in object.geometries {
            collect_features(arcs, child, out)?;
        }
        return Ok(());
    }

    let geometry = match (object.kind.as_deref(), &object.arcs) {
        (Some("Polygon"), Some(ArcRefs::Rings(rings))) => {
            Some(RegionGeometry::Polygon(polygon(arcs, rings)?))
        }
        (Some("MultiPolygon"), Some(ArcRefs::Polygons(polygons))) => {
            let polygons = polygons
                .iter()
                .map(|rings| polygon(arcs, rings))
                .collect::<Result<Vec<_>, _>>()?;
            Some(RegionGeometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        // an empty arc list is ambiguous to the untagged parse
        (Some("Polygon"), Some(ArcRefs::Line(refs)))
        | (Some("MultiPolygon"), Some(ArcRefs::Line(refs)))
            if refs.is_empty() =>
        {
            None
        }
        (Some(kind @ ("Polygon" | "MultiPolygon")), _) => {
            return Err(DecodeError::InvalidGeometry(format!(
                "{} with malformed arc references",
                kind
            )))
        }
        _ => None,
    };

    out.push(TopoFeature {
        id: object.id,
        properties: object.properties.unwrap_or_default(),
        geometry,
    });
    Ok(())
}

fn polygon(arcs: &[Vec<Coord<f64>>], rings: &[Vec<i64>]) -> Result<Polygon<f64>, DecodeError> {
    let mut rings = rings.iter();
    let exterior = match rings.next() {
        Some(refs) => ring(arcs, refs)?,
        None => return Err(DecodeError::InvalidGeometry("polygon without rings".into())),
    };
    let interiors = rings
        .map(|refs| ring(arcs, refs))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Stitches arcs into one ring; consecutive arcs share their junction point
fn ring(arcs: &[Vec<Coord<f64>>], refs: &[i64]) -> Result<LineString<f64>, DecodeError> {
    let mut points: Vec<Coord<f64>> = Vec::new();

    for &arc_ref in refs {
        let (index, reversed) = if arc_ref < 0 {
            (!arc_ref, true)
        } else {
            (arc_ref, false)
        };
        let arc = usize::try_from(index)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or(DecodeError::ArcIndexOutOfRange(arc_ref))?;

        points.pop();
        if reversed {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }

    if let Some(&first) = points.first() {
        while points.len() < 4 {
            points.push(first);
        }
    }

    Ok(LineString::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exterior(feature: &TopoFeature) -> Vec<(f64, f64)> {
        match &feature.geometry {
            Some(RegionGeometry::Polygon(p)) => p.exterior().0.iter().map(|c| (c.x, c.y)).collect(),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_arcs_are_stitched() {
        // two squares sharing the edge x = 1
        let topology = Topology::from_value(json!({
            "type": "Topology",
            "arcs": [
                [[1, 0], [0, 0], [0, 1], [1, 1]],
                [[1, 0], [1, 1]],
                [[1, 1], [2, 1], [2, 0], [1, 0]]
            ],
            "objects": {
                "squares": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Polygon", "arcs": [[0, -2]], "properties": {"name": "west"}},
                        {"type": "Polygon", "arcs": [[2, 1]], "properties": {"name": "east"}}
                    ]
                }
            }
        }))
        .unwrap();

        let features = topology.into_features().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(
            exterior(&features[0]),
            vec![(1.0, 0.0), (0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]
        );
        assert_eq!(
            exterior(&features[1]),
            vec![(1.0, 1.0), (2.0, 1.0), (2.0, 0.0), (1.0, 0.0), (1.0, 1.0)]
        );
        assert_eq!(features[1].properties["name"], json!("east"));
    }

    #[test]
    fn test_quantized_delta_arcs() {
        let topology = Topology::from_value(json!({
            "type": "Topology",
            "transform": {"scale": [0.5, 2.0], "translate": [10.0, -5.0]},
            "arcs": [[[0, 0], [2, 0], [0, 1], [-2, 0], [0, -1]]],
            "objects": {
                "box": {"type": "Polygon", "arcs": [[0]]}
            }
        }))
        .unwrap();

        let features = topology.into_features().unwrap();
        assert_eq!(
            exterior(&features[0]),
            vec![(10.0, -5.0), (11.0, -5.0), (11.0, -3.0), (10.0, -3.0), (10.0, -5.0)]
        );
    }

    #[test]
    fn test_object_groups_are_concatenated_in_order() {
        let topology = Topology::from_value(json!({
            "type": "Topology",
            "arcs": [[[0, 0], [0, 1], [1, 1], [0, 0]]],
            "objects": {
                "zeta": {"type": "Polygon", "arcs": [[0]], "properties": {"name": "z"}},
                "alpha": {"type": "MultiPolygon", "arcs": [[[0]]], "properties": {"name": "a"}},
                "line": {"type": "LineString", "arcs": [0]}
            }
        }))
        .unwrap();

        let features = topology.into_features().unwrap();
        let names: Vec<_> = features
            .iter()
            .map(|f| f.properties.get("name").cloned())
            .collect();
        assert_eq!(names, vec![Some(json!("z")), Some(json!("a")), None]);
        assert!(features[2].geometry.is_none());
    }

    #[test]
    fn test_short_rings_are_padded_to_four_points() {
        let arcs = vec![vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }]];

        let padded = ring(&arcs, &[0]).unwrap();
        let points: Vec<(f64, f64)> = padded.0.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(points, vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0), (0.0, 0.0)]);

        assert!(ring(&arcs, &[]).unwrap().0.is_empty());
    }

    #[test]
    fn test_bad_arc_index_is_a_decode_error() {
        let topology = Topology::from_value(json!({
            "type": "Topology",
            "arcs": [[[0, 0], [0, 1]]],
            "objects": {"bad": {"type": "Polygon", "arcs": [[3]]}}
        }))
        .unwrap();

        assert!(matches!(
            topology.into_features(),
            Err(DecodeError::ArcIndexOutOfRange(3))
        ));
    }

    #[test]
    fn test_rejects_non_topology() {
        let err = Topology::from_value(json!({
            "type": "FeatureCollection",
            "objects": {}
        }))
        .unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedType { .. }));
    }
}
