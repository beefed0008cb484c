//! Common test fixtures for resampling tests.
//!
//! Waypoint sets are `(lat, lon)` pairs in degrees.

/// Common waypoint lists for path and transect tests.
pub mod paths {
    /// Along the equator, 0°E to 10°E.
    pub const EQUATOR_10: &[(f64, f64)] = &[(0.0, 0.0), (0.0, 10.0)];

    /// Due north along the prime meridian.
    pub const MERIDIAN_NORTH: &[(f64, f64)] = &[(-5.0, 0.0), (5.0, 0.0)];

    /// Scotian Shelf section off Halifax.
    pub const HALIFAX_LINE: &[(f64, f64)] = &[(44.4, -63.3), (42.5, -61.4)];

    /// Three-leg dog-leg path in the North Atlantic.
    pub const DOG_LEG: &[(f64, f64)] = &[(40.0, -50.0), (45.0, -45.0), (45.0, -35.0), (50.0, -30.0)];

    /// Short eastward hop across the prime meridian.
    pub const PRIME_MERIDIAN_EAST: &[(f64, f64)] = &[(10.0, -2.0), (10.0, 2.0)];

    /// Short eastward hop across the antimeridian.
    pub const DATELINE_EAST: &[(f64, f64)] = &[(10.0, 178.0), (10.0, -178.0)];

    /// Same point twice (degenerate).
    pub const COINCIDENT: &[(f64, f64)] = &[(20.0, 20.0), (20.0, 20.0)];
}

/// Common grid layouts for testing.
pub mod grid {
    /// A grid layout described by its first coordinate, spacing and size.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub lat0: f64,
        pub dlat: f64,
        pub ny: usize,
        pub lon0: f64,
        pub dlon: f64,
        pub nx: usize,
    }

    /// 4x4 one-degree grid starting at the origin.
    pub const UNIT_4X4: GridSpec = GridSpec {
        lat0: 0.0,
        dlat: 1.0,
        ny: 4,
        lon0: 0.0,
        dlon: 1.0,
        nx: 4,
    };

    /// Global one-degree grid stored in the 0..360 convention.
    pub const GLOBAL_1DEG_360: GridSpec = GridSpec {
        lat0: -89.5,
        dlat: 1.0,
        ny: 180,
        lon0: 0.5,
        dlon: 1.0,
        nx: 360,
    };

    /// Regional quarter-degree grid over the North Atlantic.
    pub const ATLANTIC_QUARTER: GridSpec = GridSpec {
        lat0: 35.0,
        dlat: 0.25,
        ny: 80,
        lon0: -70.0,
        dlon: 0.25,
        nx: 160,
    };
}
