// src/detection/sanity.rs
//
// Geometric plausibility gate for a (left, right) boundary pair.
//
// A pair is trusted only if the lane width stays inside the configured
// band at both the bottom and the middle of the frame, and both curves
// run roughly parallel at mid-frame. Anything else is treated as a bad
// split of the detector output and the whole pair is discarded.

use crate::types::PolyFit;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    /// Exclusive lower bound on lane width in warped pixels.
    pub min_lane_width_px: f64,
    /// Exclusive upper bound on lane width in warped pixels.
    pub max_lane_width_px: f64,
    /// Largest accepted |left slope − right slope| at mid-frame.
    pub max_slope_diff: f64,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            min_lane_width_px: 500.0,
            max_lane_width_px: 900.0,
            max_slope_diff: 0.5,
        }
    }
}

impl SanityConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_lane_width_px.is_finite()
                && self.max_lane_width_px.is_finite()
                && self.min_lane_width_px < self.max_lane_width_px,
            "sanity lane width band is empty: ({}, {})",
            self.min_lane_width_px,
            self.max_lane_width_px
        );
        ensure!(
            self.max_slope_diff.is_finite() && self.max_slope_diff >= 0.0,
            "sanity max_slope_diff must be >= 0, got {}",
            self.max_slope_diff
        );
        Ok(())
    }
}

/// Image rows at which the pair is checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationYs {
    pub bottom_y: f64,
    pub mid_y: f64,
}

/// Outcome of the gate, with the first failing criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SanityVerdict {
    Accepted,
    MissingFit,
    WidthOutOfBand { y: f64, width_px: f64 },
    NotParallel { slope_diff: f64 },
}

impl SanityVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::MissingFit => "MISSING_FIT",
            Self::WidthOutOfBand { .. } => "WIDTH_OUT_OF_BAND",
            Self::NotParallel { .. } => "NOT_PARALLEL",
        }
    }
}

pub fn check(
    left: Option<&PolyFit>,
    right: Option<&PolyFit>,
    ys: EvaluationYs,
    config: &SanityConfig,
) -> SanityVerdict {
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return SanityVerdict::MissingFit,
    };

    for y in [ys.bottom_y, ys.mid_y] {
        let width_px = right.x_at(y) - left.x_at(y);
        let in_band = width_px > config.min_lane_width_px && width_px < config.max_lane_width_px;
        if !in_band {
            return SanityVerdict::WidthOutOfBand { y, width_px };
        }
    }

    let slope_diff = (left.slope_at(ys.mid_y) - right.slope_at(ys.mid_y)).abs();
    if slope_diff > config.max_slope_diff {
        return SanityVerdict::NotParallel { slope_diff };
    }

    SanityVerdict::Accepted
}

/// `true` when the pair may update tracker state.
pub fn validate(
    left: Option<&PolyFit>,
    right: Option<&PolyFit>,
    ys: EvaluationYs,
    config: &SanityConfig,
) -> bool {
    check(left, right, ys, config).is_accepted()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YS: EvaluationYs = EvaluationYs {
        bottom_y: 720.0,
        mid_y: 360.0,
    };

    fn make_fit(a: f64, b: f64, c: f64) -> PolyFit {
        PolyFit::new(a, b, c).unwrap()
    }

    #[test]
    fn test_width_at_band_edges_rejected() {
        let config = SanityConfig::default();
        let left = make_fit(0.0, 0.0, 100.0);

        let at_min = make_fit(0.0, 0.0, 600.0);
        assert!(!validate(Some(&left), Some(&at_min), YS, &config));

        let at_max = make_fit(0.0, 0.0, 1000.0);
        assert!(!validate(Some(&left), Some(&at_max), YS, &config));
    }

    #[test]
    fn test_plausible_parallel_pair_accepted() {
        let config = SanityConfig::default();
        let left = make_fit(0.0, 0.0, 300.0);
        let right = make_fit(0.0, 0.0, 1000.0);
        assert_eq!(
            check(Some(&left), Some(&right), YS, &config),
            SanityVerdict::Accepted
        );
    }

    #[test]
    fn test_curved_parallel_pair_accepted() {
        let config = SanityConfig::default();
        let left = make_fit(2e-4, -0.1, 300.0);
        let right = make_fit(2e-4, -0.1, 1000.0);
        assert!(validate(Some(&left), Some(&right), YS, &config));
    }

    #[test]
    fn test_missing_fit_rejected() {
        let config = SanityConfig::default();
        let fit = make_fit(0.0, 0.0, 300.0);
        assert_eq!(
            check(Some(&fit), None, YS, &config),
            SanityVerdict::MissingFit
        );
        assert_eq!(
            check(None, Some(&fit), YS, &config),
            SanityVerdict::MissingFit
        );
        assert_eq!(check(None, None, YS, &config), SanityVerdict::MissingFit);
    }

    #[test]
    fn test_width_checked_at_mid_frame_too() {
        let config = SanityConfig::default();
        // 700 px apart at the bottom, 1060 px apart at mid-frame.
        let left = make_fit(0.0, 0.5, 0.0);
        let right = make_fit(0.0, -0.5, 1420.0);
        match check(Some(&left), Some(&right), YS, &config) {
            SanityVerdict::WidthOutOfBand { y, width_px } => {
                assert_eq!(y, 360.0);
                assert!((width_px - 1060.0).abs() < 1e-9);
            }
            other => panic!("expected width rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_diverging_slopes_rejected() {
        let config = SanityConfig::default();
        // Widths 616 px (mid) and 832 px (bottom) are fine; slopes differ by 0.6.
        let left = make_fit(0.0, 0.0, 300.0);
        let right = make_fit(0.0, 0.6, 700.0);
        match check(Some(&left), Some(&right), YS, &config) {
            SanityVerdict::NotParallel { slope_diff } => {
                assert!((slope_diff - 0.6).abs() < 1e-12);
            }
            other => panic!("expected parallelism rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let config = SanityConfig {
            min_lane_width_px: 100.0,
            max_lane_width_px: 300.0,
            max_slope_diff: 0.5,
        };
        let left = make_fit(0.0, 0.0, 300.0);
        let right = make_fit(0.0, 0.0, 500.0);
        assert!(validate(Some(&left), Some(&right), YS, &config));
        assert!(!validate(Some(&left), Some(&right), YS, &SanityConfig::default()));
    }

    #[test]
    fn test_config_validation() {
        assert!(SanityConfig::default().validate().is_ok());
        let inverted = SanityConfig {
            min_lane_width_px: 900.0,
            max_lane_width_px: 500.0,
            ..SanityConfig::default()
        };
        assert!(inverted.validate().is_err());
        let negative = SanityConfig {
            max_slope_diff: -0.1,
            ..SanityConfig::default()
        };
        assert!(negative.validate().is_err());
    }
}
