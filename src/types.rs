// src/types.rs

use crate::control::DEFAULT_DT;
use crate::detection::SanityConfig;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub sanity: SanityConfig,
    pub controller: ControllerConfig,
    pub camera: CameraConfig,
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// EMA weight given to each newly accepted fit, in (0, 1].
    pub alpha: f64,
    /// Consecutive missed frames tolerated before a boundary is dropped.
    pub max_lost: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            max_lost: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteeringMode {
    /// Offset fed through the PID controller.
    Pid,
    /// Offset scaled linearly onto the steering range, no controller state.
    Proportional,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Steering command bounds in degrees.
    pub min_output: f64,
    pub max_output: f64,
    /// Fallback frame period in seconds (30 fps).
    pub dt: f64,
    pub mode: SteeringMode,
    /// Offset in meters that maps to full lock in proportional mode.
    pub max_offset_m: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kp: 20.0,
            ki: 0.5,
            kd: 0.1,
            min_output: -25.0,
            max_output: 25.0,
            dt: DEFAULT_DT,
            mode: SteeringMode::Pid,
            max_offset_m: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Bird's-eye frame size in pixels.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Meters per pixel along x and y of the warped frame.
    pub xm_per_pix: f64,
    pub ym_per_pix: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frame_width: 1280,
            frame_height: 720,
            xm_per_pix: 3.7 / 700.0,
            ym_per_pix: 30.0 / 720.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "data/traces".to_string(),
            output_dir: "outputs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// LANE GEOMETRY
// ============================================================================

/// Quadratic lane boundary `x = a·y² + b·y + c` in warped-image pixels.
///
/// Coefficients are always finite; construct through [`PolyFit::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 3]", into = "[f64; 3]")]
pub struct PolyFit {
    a: f64,
    b: f64,
    c: f64,
}

impl PolyFit {
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self> {
        ensure!(
            a.is_finite() && b.is_finite() && c.is_finite(),
            "polynomial fit has non-finite coefficients: ({}, {}, {})",
            a,
            b,
            c
        );
        Ok(Self { a, b, c })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn coefficients(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Boundary x position at image row `y`.
    #[inline]
    pub fn x_at(&self, y: f64) -> f64 {
        self.a * y * y + self.b * y + self.c
    }

    /// First derivative dx/dy at image row `y`.
    #[inline]
    pub fn slope_at(&self, y: f64) -> f64 {
        2.0 * self.a * y + self.b
    }

    /// Component-wise exponential moving average towards `newer`.
    pub fn blend(&self, newer: &PolyFit, alpha: f64) -> PolyFit {
        PolyFit {
            a: alpha * newer.a + (1.0 - alpha) * self.a,
            b: alpha * newer.b + (1.0 - alpha) * self.b,
            c: alpha * newer.c + (1.0 - alpha) * self.c,
        }
    }
}

impl TryFrom<[f64; 3]> for PolyFit {
    type Error = anyhow::Error;

    fn try_from(coeffs: [f64; 3]) -> Result<Self> {
        PolyFit::new(coeffs[0], coeffs[1], coeffs[2])
    }
}

impl From<PolyFit> for [f64; 3] {
    fn from(fit: PolyFit) -> Self {
        fit.coefficients()
    }
}

// ============================================================================
// FRAME I/O
// ============================================================================

/// Raw per-frame detector output, one line of a fit trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub frame: u64,
    #[serde(default)]
    pub timestamp_ms: Option<f64>,
    #[serde(default)]
    pub left: Option<PolyFit>,
    #[serde(default)]
    pub right: Option<PolyFit>,
}

impl FrameInput {
    pub fn new(frame: u64, left: Option<PolyFit>, right: Option<PolyFit>) -> Self {
        Self {
            frame,
            timestamp_ms: None,
            left,
            right,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poly_eval_and_slope() {
        let fit = PolyFit::new(0.001, -0.5, 300.0).unwrap();
        let y = 100.0;
        assert!((fit.x_at(y) - (10.0 - 50.0 + 300.0)).abs() < 1e-9);
        assert!((fit.slope_at(y) - (0.2 - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_poly_rejects_non_finite() {
        assert!(PolyFit::new(f64::NAN, 0.0, 0.0).is_err());
        assert!(PolyFit::new(0.0, f64::INFINITY, 0.0).is_err());
        assert!(PolyFit::new(0.0, 0.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_frame_input_from_json() {
        let line = r#"{"frame": 7, "left": [0.0001, -0.2, 320.0], "right": null}"#;
        let input: FrameInput = serde_json::from_str(line).unwrap();
        assert_eq!(input.frame, 7);
        assert_eq!(input.timestamp_ms, None);
        assert_eq!(
            input.left.unwrap().coefficients(),
            [0.0001, -0.2, 320.0]
        );
        assert!(input.right.is_none());
    }

    #[test]
    fn test_partial_yaml_config_keeps_defaults() {
        let yaml = "tracker:\n  alpha: 0.5\ncontroller:\n  mode: proportional\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tracker.alpha, 0.5);
        assert_eq!(config.tracker.max_lost, 10);
        assert_eq!(config.controller.mode, SteeringMode::Proportional);
        assert_eq!(config.controller.max_output, 25.0);
        assert_eq!(config.camera.frame_width, 1280);
    }
}
