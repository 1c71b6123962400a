use geo_types::{Coord, Rect};
use serde::{Deserialize, Serialize};

const MAX_LATITUDE: f64 = 90.0;

/// A point in degrees. Boundary files store it as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite, with latitude in `-90..=90` and longitude in `-180..=180`
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= MAX_LATITUDE
            && self.lng.abs() <= 180.0
    }

    /// Clamps latitude and brings a panned longitude back past the antimeridian
    pub fn normalized(&self) -> Self {
        let mut lng = self.lng % 360.0;
        if lng > 180.0 {
            lng -= 360.0;
        } else if lng < -180.0 {
            lng += 360.0;
        }
        Self::new(self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), lng)
    }

    /// Planar coordinate in boundary-file order (x = longitude, y = latitude)
    pub fn to_coord(&self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(coord: Coord<f64>) -> Self {
        Self::new(coord.y, coord.x)
    }
}

/// Axis-aligned box in degrees; used for region extents and index envelopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Checks if the bounds contain a point (edges included)
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// Grows the box to cover `point`
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }
}

impl From<Rect<f64>> for LatLngBounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().into(), rect.max().into())
    }
}
