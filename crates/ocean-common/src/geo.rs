//! Spherical geodesy helpers.
//!
//! All longitudes handed back by this module are normalized to the canonical
//! `[-180, 180)` convention. Grids stored in `[0, 360)` are still accepted as
//! input; the Cartesian projection used for neighbour search does not care
//! which convention a grid uses.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Tolerance (degrees) below which two coordinates are treated as equal.
pub const COORD_EPSILON: f64 = 1e-9;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Same position with the longitude folded into `[-180, 180)`.
    pub fn normalized(&self) -> Self {
        Self {
            lat: self.lat,
            lon: normalize_longitude(self.lon),
        }
    }

    /// Whether two positions coincide within [`COORD_EPSILON`].
    ///
    /// Longitudes are compared modulo 360, so `(0, 180)` and `(0, -180)`
    /// are the same point.
    pub fn coincides_with(&self, other: &LatLon) -> bool {
        (self.lat - other.lat).abs() < COORD_EPSILON
            && longitude_delta(self.lon, other.lon).abs() < COORD_EPSILON
    }

    /// Unit-sphere Cartesian projection of this position.
    pub fn to_unit_vector(&self) -> [f64; 3] {
        to_unit_vector(self.lat, self.lon)
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Fold a longitude into `[-180, 180)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 180 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed shortest longitude difference `to - from`, in `[-180, 180)`.
pub fn longitude_delta(from: f64, to: f64) -> f64 {
    normalize_longitude(to - from)
}

/// Project a lat/lon pair (degrees) onto the unit sphere.
pub fn to_unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let lat = lat.to_radians();
    let lon = lon.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Great-circle distance in meters using the haversine formula.
pub fn haversine_distance(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = longitude_delta(a.lon, b.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial compass bearing from `a` towards `b`, degrees clockwise from north in `[0, 360)`.
pub fn initial_bearing(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = longitude_delta(a.lon, b.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Bearing on arrival at `b` when travelling from `a` along the great circle.
pub fn final_bearing(a: LatLon, b: LatLon) -> f64 {
    (initial_bearing(b, a) + 180.0).rem_euclid(360.0)
}

/// Point reached by travelling `distance_m` from `origin` on `bearing_deg`.
pub fn destination_point(origin: LatLon, bearing_deg: f64, distance_m: f64) -> LatLon {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let bearing = bearing_deg.to_radians();
    let angular = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    LatLon::new(lat2.to_degrees(), normalize_longitude(lon2.to_degrees()))
}

/// Chord length between two unit vectors, scaled to meters on the Earth sphere.
pub fn chord_to_meters(chord: f64) -> f64 {
    chord * EARTH_RADIUS_M
}
