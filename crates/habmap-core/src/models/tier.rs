//! Resolution tiers and simplification tolerance buckets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution level a layer can be served at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Simplified,
    Full,
}

impl Tier {
    /// Tier to display at `zoom`: full detail at and above `threshold`
    pub fn for_zoom(zoom: f64, threshold: f64) -> Self {
        if zoom >= threshold {
            Tier::Full
        } else {
            Tier::Simplified
        }
    }

    /// Tolerance to request for this tier
    pub fn tolerance(&self, simplify_tolerance: f64) -> Option<f64> {
        match self {
            Tier::Simplified => Some(simplify_tolerance),
            Tier::Full => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Simplified => f.write_str("simplified"),
            Tier::Full => f.write_str("full"),
        }
    }
}

/// Document cache bucket for a requested tolerance.
///
/// Tolerances are rounded to micro-degrees. Missing, non-positive, and
/// non-finite tolerances (and those that round to zero) mean full resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToleranceBucket {
    Full,
    Micro(u64),
}

const MICRO: f64 = 1e6;

impl ToleranceBucket {
    pub fn from_tolerance(tolerance: Option<f64>) -> Self {
        match tolerance {
            Some(t) if t.is_finite() && t > 0.0 => match (t * MICRO).round() as u64 {
                0 => ToleranceBucket::Full,
                micro => ToleranceBucket::Micro(micro),
            },
            _ => ToleranceBucket::Full,
        }
    }

    /// Tolerance in degrees represented by the bucket
    pub fn tolerance(&self) -> Option<f64> {
        match self {
            ToleranceBucket::Full => None,
            ToleranceBucket::Micro(micro) => Some(*micro as f64 / MICRO),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, ToleranceBucket::Full)
    }
}

impl fmt::Display for ToleranceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tolerance() {
            None => f.write_str("full"),
            Some(t) => write!(f, "simplify={}", t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_zoom() {
        assert_eq!(Tier::for_zoom(12.0, 12.0), Tier::Full);
        assert_eq!(Tier::for_zoom(13.5, 12.0), Tier::Full);
        assert_eq!(Tier::for_zoom(11.99, 12.0), Tier::Simplified);
        assert_eq!(Tier::for_zoom(9.0, 10.0), Tier::Simplified);
    }

    #[test]
    fn test_tier_tolerance() {
        assert_eq!(Tier::Simplified.tolerance(0.001), Some(0.001));
        assert_eq!(Tier::Full.tolerance(0.001), None);
        assert_eq!(serde_json::to_value(Tier::Simplified).unwrap(), "simplified");
    }

    #[test]
    fn test_bucket_rounding() {
        let a = ToleranceBucket::from_tolerance(Some(0.001));
        let b = ToleranceBucket::from_tolerance(Some(0.0010000000001));
        assert_eq!(a, b);
        assert_eq!(a, ToleranceBucket::Micro(1000));
        assert_eq!(a.tolerance(), Some(0.001));
        assert_eq!(a.to_string(), "simplify=0.001");
    }

    #[test]
    fn test_bucket_full_resolution() {
        assert!(ToleranceBucket::from_tolerance(None).is_full());
        assert!(ToleranceBucket::from_tolerance(Some(0.0)).is_full());
        assert!(ToleranceBucket::from_tolerance(Some(-1.0)).is_full());
        assert!(ToleranceBucket::from_tolerance(Some(f64::NAN)).is_full());
        assert!(ToleranceBucket::from_tolerance(Some(1e-9)).is_full());
        assert_eq!(ToleranceBucket::Full.to_string(), "full");
    }
}
