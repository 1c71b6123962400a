pub mod index;
pub mod locator;

pub use index::{IndexedRegion, RegionIndex};
pub use locator::PointLocator;
