//! Great-circle discretization of multi-segment paths.
//!
//! Points are distributed over segments in proportion to their length, with
//! at least two points per segment so every waypoint appears in the output.
//! Joint waypoints appear twice (end of one segment, start of the next), which
//! keeps each segment's samples self-contained for plotting.

use chrono::{DateTime, Duration, Utc};
use ocean_common::geo::{
    destination_point, final_bearing, haversine_distance, initial_bearing, longitude_delta,
    normalize_longitude, LatLon, COORD_EPSILON,
};
use serde::Serialize;

use crate::error::{ResampleError, Result};

/// A path sampled at discrete points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscretizedPath {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Cumulative distance from the first point, meters.
    pub distances: Vec<f64>,
    /// Direction of travel at each point, degrees clockwise from north.
    pub bearings: Vec<f64>,
    /// Timestamp of each point, for timed paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<DateTime<Utc>>>,
}

impl DiscretizedPath {
    pub fn len(&self) -> usize {
        self.lats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lats.is_empty()
    }

    /// Length of the whole path in meters.
    pub fn total_distance(&self) -> f64 {
        self.distances.last().copied().unwrap_or(0.0)
    }

    pub fn point(&self, i: usize) -> LatLon {
        LatLon::new(self.lats[i], self.lons[i])
    }
}

/// Sample `n_points` along the path through `waypoints`.
///
/// The result may hold slightly more than `n_points` because each segment
/// rounds its share up and keeps both endpoints.
pub fn discretize(waypoints: &[LatLon], n_points: usize) -> Result<DiscretizedPath> {
    Ok(discretize_segments(waypoints, n_points)?.0)
}

/// Sample a timed path, interpolating a timestamp for every point.
///
/// `times[i]` is the time at `waypoints[i]`; points in between get a time
/// proportional to their position along their segment.
pub fn discretize_with_time(
    waypoints: &[LatLon],
    times: &[DateTime<Utc>],
    n_points: usize,
) -> Result<DiscretizedPath> {
    if times.len() != waypoints.len() {
        return Err(ResampleError::TimeCountMismatch {
            waypoints: waypoints.len(),
            times: times.len(),
        });
    }

    let (mut path, placement) = discretize_segments(waypoints, n_points)?;
    let stamped = placement
        .iter()
        .map(|&(segment, fraction)| interpolate_time(times[segment], times[segment + 1], fraction))
        .collect();
    path.times = Some(stamped);
    Ok(path)
}

fn interpolate_time(a: DateTime<Utc>, b: DateTime<Utc>, fraction: f64) -> DateTime<Utc> {
    let span_ms = (b - a).num_milliseconds() as f64;
    a + Duration::milliseconds((span_ms * fraction).round() as i64)
}

/// Discretize and also report, per point, its segment and fraction along it.
fn discretize_segments(
    waypoints: &[LatLon],
    n_points: usize,
) -> Result<(DiscretizedPath, Vec<(usize, f64)>)> {
    if waypoints.len() < 2 {
        return Err(ResampleError::TooFewWaypoints(waypoints.len()));
    }
    if let Some(index) = waypoints
        .windows(2)
        .position(|pair| pair[0].coincides_with(&pair[1]))
    {
        return Err(ResampleError::CoincidentWaypoints { index });
    }

    let lengths: Vec<f64> = waypoints
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .collect();
    let total: f64 = lengths.iter().sum();

    let mut path = DiscretizedPath {
        lats: Vec::with_capacity(n_points + waypoints.len()),
        lons: Vec::with_capacity(n_points + waypoints.len()),
        distances: Vec::with_capacity(n_points + waypoints.len()),
        bearings: Vec::with_capacity(n_points + waypoints.len()),
        times: None,
    };
    let mut placement = Vec::with_capacity(n_points + waypoints.len());
    let mut offset = 0.0;

    for (segment, (pair, &length)) in waypoints.windows(2).zip(&lengths).enumerate() {
        let count = if total > 0.0 {
            ((n_points as f64 * length / total).ceil() as usize).max(2)
        } else {
            2
        };
        for j in 0..count {
            let t = j as f64 / (count - 1) as f64;
            let (point, bearing) = sample_segment(pair[0], pair[1], length, t, j == count - 1);
            path.lats.push(point.lat);
            path.lons.push(point.lon);
            path.distances.push(offset + t * length);
            path.bearings.push(bearing);
            placement.push((segment, t));
        }
        offset += length;
    }

    Ok((path, placement))
}

/// Point and bearing at fraction `t` of the segment `a -> b`.
fn sample_segment(a: LatLon, b: LatLon, length: f64, t: f64, is_last: bool) -> (LatLon, f64) {
    let d_lon = longitude_delta(a.lon, b.lon);

    if (a.lat - b.lat).abs() < COORD_EPSILON {
        let lon = normalize_longitude(a.lon + t * d_lon);
        let bearing = if d_lon >= 0.0 { 90.0 } else { 270.0 };
        return (LatLon::new(a.lat, lon), bearing);
    }

    if d_lon.abs() < COORD_EPSILON {
        let lat = a.lat + t * (b.lat - a.lat);
        let bearing = if b.lat > a.lat { 0.0 } else { 180.0 };
        return (LatLon::new(lat, normalize_longitude(a.lon)), bearing);
    }

    if is_last {
        return (b.normalized(), final_bearing(a, b));
    }
    let point = destination_point(a, initial_bearing(a, b), t * length);
    (point, initial_bearing(point, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<LatLon> {
        raw.iter().copied().map(LatLon::from).collect()
    }

    #[test]
    fn test_constant_latitude_segment() {
        let path = discretize(&pts(&[(0.0, 0.0), (0.0, 10.0)]), 11).unwrap();
        assert_eq!(path.len(), 11);
        for (i, lon) in path.lons.iter().enumerate() {
            assert!((lon - i as f64).abs() < 1e-9);
        }
        assert!(path.lats.iter().all(|&l| l == 0.0));
        assert!(path.bearings.iter().all(|&b| b == 90.0));
    }

    #[test]
    fn test_westward_and_southward_bearings() {
        let west = discretize(&pts(&[(10.0, 5.0), (10.0, -5.0)]), 5).unwrap();
        assert!(west.bearings.iter().all(|&b| b == 270.0));
        let south = discretize(&pts(&[(10.0, 5.0), (-10.0, 5.0)]), 5).unwrap();
        assert!(south.bearings.iter().all(|&b| b == 180.0));
    }

    #[test]
    fn test_endpoints_and_total_length() {
        let wps = pts(&[(44.0, -63.0), (42.0, -50.0), (47.0, -45.0)]);
        let path = discretize(&wps, 50).unwrap();

        assert!((path.lats[0] - 44.0).abs() < 1e-9);
        assert!((path.lons[0] + 63.0).abs() < 1e-9);
        let last = path.len() - 1;
        assert!((path.lats[last] - 47.0).abs() < 1e-9);
        assert!((path.lons[last] + 45.0).abs() < 1e-9);

        let expected = haversine_distance(wps[0], wps[1]) + haversine_distance(wps[1], wps[2]);
        assert!((path.total_distance() - expected).abs() < 1e-6);
        assert!(path.distances.windows(2).all(|d| d[1] >= d[0]));
        assert_eq!(path.distances[0], 0.0);
    }

    #[test]
    fn test_points_lie_on_great_circle() {
        let a = LatLon::new(10.0, 20.0);
        let b = LatLon::new(40.0, 60.0);
        let path = discretize(&[a, b], 20).unwrap();
        let total = haversine_distance(a, b);
        for i in 0..path.len() {
            let p = path.point(i);
            let via = haversine_distance(a, p) + haversine_distance(p, b);
            assert!((via - total).abs() < 1.0, "point {} off the arc by {} m", i, via - total);
        }
    }

    #[test]
    fn test_proportional_allocation() {
        // second leg is three times longer than the first
        let path = discretize(&pts(&[(0.0, 0.0), (0.0, 10.0), (0.0, 40.0)]), 40).unwrap();
        let first_leg = path.distances.iter().filter(|&&d| d <= 1_112_000.0).count();
        assert!(first_leg >= 10 && first_leg <= 12, "first leg had {} points", first_leg);
        assert!(path.len() >= 40);
    }

    #[test]
    fn test_short_segment_gets_two_points() {
        let path = discretize(&pts(&[(0.0, 0.0), (0.0, 0.001), (0.0, 50.0)]), 10).unwrap();
        assert!((path.lons[1] - 0.001).abs() < 1e-12);
        assert!((path.lons[2] - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_dateline_crossing() {
        let path = discretize(&pts(&[(0.0, 170.0), (0.0, -170.0)]), 21).unwrap();
        assert!(path.lons.iter().all(|&l| (-180.0..180.0).contains(&l)));
        assert!(path.lons.iter().all(|&l| l >= 170.0 || l <= -170.0));
        // 20 degrees of arc, not 340
        assert!(path.total_distance() < 2_300_000.0);
        assert!(path.bearings.iter().all(|&b| b == 90.0));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            discretize(&pts(&[(0.0, 0.0)]), 10),
            Err(ResampleError::TooFewWaypoints(1))
        ));
        assert!(matches!(
            discretize(&pts(&[(0.0, 0.0), (1.0, 1.0), (1.0, 1.0)]), 10),
            Err(ResampleError::CoincidentWaypoints { index: 1 })
        ));
        assert!(matches!(
            discretize(&pts(&[(0.0, 180.0), (0.0, -180.0)]), 10),
            Err(ResampleError::CoincidentWaypoints { index: 0 })
        ));
    }

    #[test]
    fn test_timed_path() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = start + Duration::hours(10);
        let path =
            discretize_with_time(&pts(&[(0.0, 0.0), (0.0, 10.0)]), &[start, end], 11).unwrap();
        let times = path.times.unwrap();
        assert_eq!(times.len(), 11);
        assert_eq!(times[0], start);
        assert_eq!(times[5], start + Duration::hours(5));
        assert_eq!(times[10], end);

        assert!(matches!(
            discretize_with_time(&pts(&[(0.0, 0.0), (0.0, 10.0)]), &[start], 11),
            Err(ResampleError::TimeCountMismatch {
                waypoints: 2,
                times: 1
            })
        ));
    }
}
