//! Containment queries
//!
//! Containment uses closed boundaries: a point on an edge belongs to the
//! region. Overlapping or adjacent regions resolve to the first match in
//! input order.

use crate::core::geo::LatLng;
use crate::data::region::{BoundaryDataset, Region};

#[derive(Debug, Clone, Copy, Default)]
pub struct PointLocator;

impl PointLocator {
    /// Linear scan; the first region containing `point` wins
    pub fn locate<'a>(point: &LatLng, regions: &'a [Region]) -> Option<&'a Region> {
        if !point.is_valid() {
            return None;
        }
        regions.iter().find(|region| region.contains(point))
    }

    /// Same answer as [`PointLocator::locate`], narrowed through the dataset's index
    pub fn locate_in<'a>(point: &LatLng, dataset: &'a BoundaryDataset) -> Option<&'a Region> {
        if !point.is_valid() {
            return None;
        }
        let regions = dataset.regions();
        dataset
            .index()
            .candidates(point)
            .into_iter()
            .filter_map(|position| regions.get(position))
            .find(|region| region.contains(point))
    }
}
