//! Alignment of query timestamps onto a dataset's discrete time axis.

use chrono::{DateTime, Duration, Utc};
use num_traits::Float;
use ocean_common::query::TimeSelector;
use ocean_common::time::Quantum;
use serde::Serialize;

use crate::error::{ResampleError, Result};

/// Where a query time falls on a time axis.
///
/// `lower == upper` with `fraction == 0` for exact matches and clamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeBracket {
    pub lower: usize,
    pub upper: usize,
    /// Position between `lower` (0) and `upper` (1).
    pub fraction: f64,
}

impl TimeBracket {
    pub fn exact(index: usize) -> Self {
        Self {
            lower: index,
            upper: index,
            fraction: 0.0,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }

    /// Blend the values at `lower` and `upper`.
    ///
    /// A side with zero weight may be masked; a side that contributes may not.
    pub fn interpolate<T: Float>(&self, lower: Option<T>, upper: Option<T>) -> Option<T> {
        if self.is_exact() || self.fraction <= 0.0 {
            return lower;
        }
        if self.fraction >= 1.0 {
            return upper;
        }
        let (a, b) = (lower?.to_f64()?, upper?.to_f64()?);
        T::from(a + (b - a) * self.fraction)
    }
}

/// A strictly increasing time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    times: Vec<DateTime<Utc>>,
    quantum: Quantum,
}

impl TimeAxis {
    pub fn new(times: Vec<DateTime<Utc>>, quantum: Quantum) -> Result<Self> {
        if times.is_empty() {
            return Err(ResampleError::EmptyTimeAxis);
        }
        if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ResampleError::NonMonotonicTimeAxis { index: i + 1 });
        }
        Ok(Self { times, quantum })
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn quantum(&self) -> Quantum {
        self.quantum
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Align every query time; `None` marks times too far outside the axis.
    pub fn align(&self, query: &[DateTime<Utc>]) -> Vec<Option<TimeBracket>> {
        query.iter().map(|t| self.align_one(*t)).collect()
    }

    /// Align a single query time.
    pub fn align_one(&self, t: DateTime<Utc>) -> Option<TimeBracket> {
        let n = self.times.len();
        if n == 1 {
            let half = self.quantum.nominal_duration() / 2;
            return (abs(t - self.times[0]) <= half).then(|| TimeBracket::exact(0));
        }

        let upper = self.times.partition_point(|x| *x < t);
        if upper < n && self.times[upper] == t {
            return Some(TimeBracket::exact(upper));
        }
        if upper == 0 {
            let half = (self.times[1] - self.times[0]) / 2;
            return (self.times[0] - t <= half).then(|| TimeBracket::exact(0));
        }
        if upper == n {
            let half = (self.times[n - 1] - self.times[n - 2]) / 2;
            return (t - self.times[n - 1] <= half).then(|| TimeBracket::exact(n - 1));
        }

        let lower = upper - 1;
        let step = (self.times[upper] - self.times[lower]).num_milliseconds() as f64;
        let into = (t - self.times[lower]).num_milliseconds() as f64;
        Some(TimeBracket {
            lower,
            upper,
            fraction: into / step,
        })
    }

    /// Index of the axis step nearest to `t`, within half a step.
    pub fn nearest_index(&self, t: DateTime<Utc>) -> Option<usize> {
        self.align_one(t).map(|b| {
            if b.fraction > 0.5 {
                b.upper
            } else {
                b.lower
            }
        })
    }

    /// Resolve a discrete time selection to an axis index.
    pub fn resolve(&self, selector: TimeSelector) -> Result<usize> {
        match selector {
            TimeSelector::Index(index) if index < self.len() => Ok(index),
            TimeSelector::Index(index) => Err(ResampleError::TimeIndexOutOfRange {
                index,
                len: self.len(),
            }),
            TimeSelector::Timestamp(t) => self
                .nearest_index(t)
                .ok_or_else(|| ResampleError::TimeOutOfRange(t.to_rfc3339())),
        }
    }

    /// Axis indices within an inclusive selection range.
    pub fn resolve_range(&self, start: TimeSelector, end: TimeSelector) -> Result<Vec<usize>> {
        let (a, b) = (self.resolve(start)?, self.resolve(end)?);
        Ok(if a <= b { (a..=b).collect() } else { (b..=a).collect() })
    }
}

fn abs(d: Duration) -> Duration {
    if d < Duration::zero() {
        -d
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn hourly(hours: &[i64]) -> TimeAxis {
        TimeAxis::new(hours.iter().map(|&h| t(h)).collect(), Quantum::Hour).unwrap()
    }

    #[test]
    fn test_rejects_bad_axes() {
        assert!(matches!(
            TimeAxis::new(vec![], Quantum::Day),
            Err(ResampleError::EmptyTimeAxis)
        ));
        assert!(matches!(
            TimeAxis::new(vec![t(0), t(2), t(2)], Quantum::Hour),
            Err(ResampleError::NonMonotonicTimeAxis { index: 2 })
        ));
    }

    #[test]
    fn test_exact_and_halfway() {
        let axis = hourly(&[0, 6, 12]);
        assert_eq!(axis.align_one(t(6)), Some(TimeBracket::exact(1)));

        let b = axis.align_one(t(3)).unwrap();
        assert_eq!((b.lower, b.upper), (0, 1));
        assert!((b.fraction - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_irregular_axis_fraction() {
        let axis = hourly(&[0, 2, 12]);
        let b = axis.align_one(t(4)).unwrap();
        assert_eq!((b.lower, b.upper), (1, 2));
        assert!((b.fraction - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_clamp_and_mask() {
        let axis = hourly(&[0, 6, 12]);
        assert_eq!(axis.align_one(t(-3)), Some(TimeBracket::exact(0)));
        assert_eq!(axis.align_one(t(-4)), None);
        assert_eq!(axis.align_one(t(15)), Some(TimeBracket::exact(2)));
        assert_eq!(axis.align_one(t(16)), None);
    }

    #[test]
    fn test_single_timestamp_uses_quantum() {
        let axis = TimeAxis::new(vec![t(0)], Quantum::Day).unwrap();
        assert_eq!(axis.align_one(t(11)), Some(TimeBracket::exact(0)));
        assert_eq!(axis.align_one(t(-12)), Some(TimeBracket::exact(0)));
        assert_eq!(axis.align_one(t(13)), None);
    }

    #[test]
    fn test_interpolate_masks() {
        let half = TimeBracket {
            lower: 0,
            upper: 1,
            fraction: 0.5,
        };
        assert_eq!(half.interpolate(Some(2.0f32), Some(4.0)), Some(3.0));
        assert_eq!(half.interpolate(Some(2.0f32), None), None);
        assert_eq!(TimeBracket::exact(0).interpolate(Some(2.0f32), None), Some(2.0));
    }

    #[test]
    fn test_resolve_selectors() {
        let axis = hourly(&[0, 6, 12]);
        assert_eq!(axis.resolve(TimeSelector::Index(2)).unwrap(), 2);
        assert!(matches!(
            axis.resolve(TimeSelector::Index(3)),
            Err(ResampleError::TimeIndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(axis.resolve(TimeSelector::Timestamp(t(8))).unwrap(), 1);
        assert_eq!(axis.resolve(TimeSelector::Timestamp(t(10))).unwrap(), 2);
        assert!(axis.resolve(TimeSelector::Timestamp(t(40))).is_err());
        assert_eq!(
            axis.resolve_range(TimeSelector::Index(2), TimeSelector::Index(0))
                .unwrap(),
            vec![0, 1, 2]
        );
    }
}
