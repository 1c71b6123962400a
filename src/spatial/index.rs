use crate::core::geo::{LatLng, LatLngBounds};
use crate::data::region::Region;

use rstar::{RTree, RTreeObject, AABB};

/// Bounding box of one region, tagged with its input position
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRegion {
    pub position: usize,
    pub bounds: LatLngBounds,
}

// --- rstar integration -------------------------------------------------------------------------

impl RTreeObject for IndexedRegion {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.south_west.lng, self.bounds.south_west.lat],
            [self.bounds.north_east.lng, self.bounds.north_east.lat],
        )
    }
}

/// R-tree over region bounding boxes.
///
/// Only narrows the search: every candidate still needs an exact
/// containment test.
pub struct RegionIndex {
    rtree: RTree<IndexedRegion>,
    bounds: Option<LatLngBounds>,
}

impl RegionIndex {
    /// Bulk-loads the index; regions without a bounding box are left out
    pub fn build(regions: &[Region]) -> Self {
        let items: Vec<IndexedRegion> = regions
            .iter()
            .enumerate()
            .filter_map(|(position, region)| {
                region
                    .geometry
                    .bounds()
                    .map(|bounds| IndexedRegion { position, bounds })
            })
            .collect();

        let mut bounds: Option<LatLngBounds> = None;
        for item in &items {
            match bounds.as_mut() {
                Some(b) => {
                    b.extend(&item.bounds.south_west);
                    b.extend(&item.bounds.north_east);
                }
                None => bounds = Some(item.bounds.clone()),
            }
        }

        Self {
            rtree: RTree::bulk_load(items),
            bounds,
        }
    }

    /// Input positions of regions whose bounding box covers `point`, ascending
    pub fn candidates(&self, point: &LatLng) -> Vec<usize> {
        match &self.bounds {
            Some(bounds) if bounds.contains(point) => {}
            _ => return Vec::new(),
        }
        let envelope = AABB::from_point([point.lng, point.lat]);
        let mut positions: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}

impl std::fmt::Debug for RegionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionIndex")
            .field("len", &self.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl Default for RegionIndex {
    fn default() -> Self {
        Self::build(&[])
    }
}
