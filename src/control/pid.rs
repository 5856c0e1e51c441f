// src/control/pid.rs
//
// Steering PID with output saturation and integral anti-windup.
//
// The integral is clamped to ±|max_output| / (2·ki), so the I term alone
// can never contribute more than half of full lock no matter how long the
// error has persisted. With ki = 0 the integral is pinned at zero.

use crate::types::ControllerConfig;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Frame period assumed when the caller has no timing (30 fps).
pub const DEFAULT_DT: f64 = 0.033;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    min_output: f64,
    max_output: f64,
    max_integral: f64,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(gains: PidGains, min_output: f64, max_output: f64) -> Result<Self> {
        ensure!(
            gains.kp.is_finite() && gains.ki.is_finite() && gains.kd.is_finite(),
            "PID gains must be finite: {:?}",
            gains
        );
        ensure!(gains.ki >= 0.0, "PID ki must be >= 0, got {}", gains.ki);
        ensure!(
            min_output.is_finite() && max_output.is_finite() && min_output <= max_output,
            "PID output bounds are invalid: [{}, {}]",
            min_output,
            max_output
        );

        let max_integral = if gains.ki > 0.0 {
            max_output.abs() / (2.0 * gains.ki)
        } else {
            0.0
        };

        Ok(Self {
            gains,
            min_output,
            max_output,
            max_integral,
            integral: 0.0,
            prev_error: 0.0,
        })
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        Self::new(
            PidGains {
                kp: config.kp,
                ki: config.ki,
                kd: config.kd,
            },
            config.min_output,
            config.max_output,
        )
    }

    /// Advances the controller by `dt` seconds and returns the clamped command.
    ///
    /// Fails without touching state when `dt` is not a positive finite
    /// number or `error` is not finite.
    pub fn update(&mut self, error: f64, dt: f64) -> Result<f64> {
        ensure!(dt.is_finite() && dt > 0.0, "PID dt must be > 0, got {}", dt);
        ensure!(error.is_finite(), "PID error must be finite, got {}", error);

        let p_term = self.gains.kp * error;

        self.integral = (self.integral + error * dt).clamp(-self.max_integral, self.max_integral);
        let i_term = self.gains.ki * self.integral;

        let derivative = (error - self.prev_error) / dt;
        let d_term = self.gains.kd * derivative;

        self.prev_error = error;

        Ok((p_term + i_term + d_term).clamp(self.min_output, self.max_output))
    }

    /// Clears accumulated history; gains and bounds are kept.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn output_bounds(&self) -> (f64, f64) {
        (self.min_output, self.max_output)
    }

    pub fn max_integral(&self) -> f64 {
        self.max_integral
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}
