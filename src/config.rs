use crate::detection::EvaluationYs;
use crate::types::Config;
use anyhow::{ensure, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would make the tracker or controller
    /// produce undefined values later on.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;
        ensure!(
            t.alpha > 0.0 && t.alpha <= 1.0,
            "tracker.alpha must be in (0, 1], got {}",
            t.alpha
        );
        ensure!(t.max_lost >= 1, "tracker.max_lost must be >= 1");

        self.sanity.validate()?;

        let c = &self.controller;
        ensure!(
            c.kp.is_finite() && c.ki.is_finite() && c.kd.is_finite(),
            "controller gains must be finite"
        );
        ensure!(c.ki >= 0.0, "controller.ki must be >= 0, got {}", c.ki);
        ensure!(
            c.min_output.is_finite() && c.max_output.is_finite() && c.min_output <= c.max_output,
            "controller output bounds are invalid: [{}, {}]",
            c.min_output,
            c.max_output
        );
        ensure!(
            c.dt.is_finite() && c.dt > 0.0,
            "controller.dt must be > 0, got {}",
            c.dt
        );
        ensure!(
            c.max_offset_m.is_finite() && c.max_offset_m > 0.0,
            "controller.max_offset_m must be > 0, got {}",
            c.max_offset_m
        );

        let cam = &self.camera;
        ensure!(
            cam.frame_width > 0 && cam.frame_height > 0,
            "camera frame size must be non-zero"
        );
        ensure!(
            cam.xm_per_pix.is_finite() && cam.xm_per_pix > 0.0,
            "camera.xm_per_pix must be > 0"
        );
        ensure!(
            cam.ym_per_pix.is_finite() && cam.ym_per_pix > 0.0,
            "camera.ym_per_pix must be > 0"
        );

        Ok(())
    }

    /// Bottom-of-frame and mid-frame rows used by the sanity gate.
    pub fn evaluation_ys(&self) -> EvaluationYs {
        let h = self.camera.frame_height as f64;
        EvaluationYs {
            bottom_y: h,
            mid_y: h / 2.0,
        }
    }
}
