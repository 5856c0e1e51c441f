// src/pipeline/session.rs
//
// Frame control loop for one clip.
//
// Per frame:
//   raw (left, right) ─▶ sanity gate ─┬─ accepted ─▶ update(fit) on both trackers
//                                     └─ rejected ─▶ update(None) on both trackers
//   smoothed fits ─▶ geometry (offset, curvature) ─▶ steering ─▶ FrameOutput
//
// The gate decision is joint: a pair that fails any check says the detector
// may have mixed up which pixels belong to which boundary, so neither side
// is trusted on its own.
//
// Frames must be fed strictly in order. Both the EMA and the PID carry
// state from one frame to the next; independent clips need independent
// sessions.

use crate::analysis::{proportional_steering, LaneGeometry};
use crate::control::Pid;
use crate::detection::{sanity, EvaluationYs, LaneLine, LineStatus};
use crate::pipeline::{FrameOutput, SessionMetrics, TrackingStatus};
use crate::types::{Config, FrameInput, PolyFit, SteeringMode};
use anyhow::Result;
use tracing::{debug, info};

pub struct Session {
    config: Config,
    eval_ys: EvaluationYs,
    left: LaneLine,
    right: LaneLine,
    pid: Pid,
    status: TrackingStatus,
    last_timestamp_ms: Option<f64>,
    metrics: SessionMetrics,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            eval_ys: config.evaluation_ys(),
            left: LaneLine::from_config(&config.tracker)?,
            right: LaneLine::from_config(&config.tracker)?,
            pid: Pid::from_config(&config.controller)?,
            status: TrackingStatus::Lost,
            last_timestamp_ms: None,
            metrics: SessionMetrics::new(),
            config: config.clone(),
        })
    }

    pub fn process_frame(&mut self, input: &FrameInput) -> Result<FrameOutput> {
        let verdict = sanity::check(
            input.left.as_ref(),
            input.right.as_ref(),
            self.eval_ys,
            &self.config.sanity,
        );

        let (left_fit, right_fit) = if verdict.is_accepted() {
            (input.left, input.right)
        } else {
            debug!(
                "🚫 Frame {}: pair rejected ({:?})",
                input.frame, verdict
            );
            (None, None)
        };

        let had_left = self.left.status() != LineStatus::Empty;
        let had_right = self.right.status() != LineStatus::Empty;
        self.left.update(left_fit);
        self.right.update(right_fit);
        let (left_now, right_now) = (self.left.status(), self.right.status());
        self.note_track_loss("left", had_left, left_now, input.frame);
        self.note_track_loss("right", had_right, right_now, input.frame);

        let smoothed_left = self.left.get_fit();
        let smoothed_right = self.right.get_fit();
        let geometry = LaneGeometry::measure(
            smoothed_left.as_ref(),
            smoothed_right.as_ref(),
            &self.config.camera,
        );

        let status = TrackingStatus::from_lines(&self.left, &self.right);
        if status == TrackingStatus::Lost && self.status != TrackingStatus::Lost {
            self.pid.reset();
            self.metrics.pid_resets += 1;
            info!(
                "⚠️  Frame {}: lane track lost, steering controller reset",
                input.frame
            );
        } else if status != TrackingStatus::Lost && self.status == TrackingStatus::Lost {
            info!("✓ Frame {}: lane track acquired", input.frame);
        }
        self.status = status;

        let dt = self.resolve_dt(input.timestamp_ms);
        let steering_deg = self.steer(geometry.offset_m, dt)?;

        self.metrics.record_frame(&verdict, status);

        Ok(FrameOutput {
            frame: input.frame,
            timestamp_ms: input.timestamp_ms,
            left_fit: smoothed_left,
            right_fit: smoothed_right,
            offset_m: geometry.offset_m,
            steering_deg,
            curvature_m: geometry.avg_radius_m,
            left_curvature_m: geometry.left_radius_m,
            right_curvature_m: geometry.right_radius_m,
            lane_width_m: geometry.lane_width_m,
            status,
            sanity: verdict,
            dt,
        })
    }

    fn steer(&mut self, offset_m: f64, dt: f64) -> Result<f64> {
        let c = &self.config.controller;
        match c.mode {
            SteeringMode::Pid => self.pid.update(offset_m, dt),
            SteeringMode::Proportional => Ok(proportional_steering(
                offset_m,
                c.max_offset_m,
                c.max_output,
            )
            .clamp(c.min_output, c.max_output)),
        }
    }

    /// Frame period from consecutive timestamps, else the configured one.
    fn resolve_dt(&mut self, timestamp_ms: Option<f64>) -> f64 {
        let fallback = self.config.controller.dt;
        let dt = match (self.last_timestamp_ms, timestamp_ms) {
            (Some(prev), Some(now)) => {
                let delta = (now - prev) / 1000.0;
                if delta.is_finite() && delta > 0.0 {
                    delta
                } else {
                    fallback
                }
            }
            _ => fallback,
        };
        if timestamp_ms.is_some() {
            self.last_timestamp_ms = timestamp_ms;
        }
        dt
    }

    fn note_track_loss(&mut self, side: &str, had_fit: bool, now: LineStatus, frame: u64) {
        if had_fit && now == LineStatus::Empty {
            self.metrics.track_resets += 1;
            info!(
                "📉 Frame {}: {} boundary dropped after {} missed frames",
                frame,
                side,
                self.config.tracker.max_lost + 1
            );
        }
    }

    /// Smoothed (left, right) fits as of the last processed frame.
    pub fn fits(&self) -> (Option<PolyFit>, Option<PolyFit>) {
        (self.left.get_fit(), self.right.get_fit())
    }

    pub fn left(&self) -> &LaneLine {
        &self.left
    }

    pub fn right(&self) -> &LaneLine {
        &self.right
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SanityVerdict;

    fn make_fit(a: f64, b: f64, c: f64) -> PolyFit {
        PolyFit::new(a, b, c).unwrap()
    }

    /// Parallel pair 700 px apart, centered on a 1280 px frame.
    fn centered_pair() -> (PolyFit, PolyFit) {
        (make_fit(0.0, 0.0, 290.0), make_fit(0.0, 0.0, 990.0))
    }

    fn frame(n: u64, left: Option<PolyFit>, right: Option<PolyFit>) -> FrameInput {
        FrameInput::new(n, left, right)
    }

    #[test]
    fn test_accepted_pair_updates_both_trackers() {
        let mut session = Session::new(&Config::default()).unwrap();
        let (l, r) = centered_pair();

        let out = session.process_frame(&frame(0, Some(l), Some(r))).unwrap();

        assert_eq!(out.sanity, SanityVerdict::Accepted);
        assert_eq!(out.left_fit, Some(l));
        assert_eq!(out.right_fit, Some(r));
        assert_eq!(out.offset_m, 0.0);
        assert_eq!(out.status, TrackingStatus::Tracking);
        assert_eq!(out.confidence_label(), "Tracking");
    }

    #[test]
    fn test_one_missing_side_rejects_both() {
        let mut session = Session::new(&Config::default()).unwrap();
        let (l, r) = centered_pair();
        session.process_frame(&frame(0, Some(l), Some(r))).unwrap();

        let out = session.process_frame(&frame(1, Some(l), None)).unwrap();

        assert_eq!(out.sanity, SanityVerdict::MissingFit);
        assert_eq!(session.left().lost_count(), 1);
        assert_eq!(session.right().lost_count(), 1);
        assert_eq!(out.status, TrackingStatus::Coasting);
        assert_eq!(out.confidence_label(), "Coasting");
        // Coasting keeps the last smoothed geometry.
        assert_eq!(out.left_fit, Some(l));
        assert_eq!(out.right_fit, Some(r));
    }

    #[test]
    fn test_implausible_pair_does_not_touch_smoothed_state() {
        let mut session = Session::new(&Config::default()).unwrap();
        let (l, r) = centered_pair();
        session.process_frame(&frame(0, Some(l), Some(r))).unwrap();

        // 1200 px wide: outside the width band.
        let wide_right = make_fit(0.0, 0.0, 1490.0);
        let out = session
            .process_frame(&frame(1, Some(l), Some(wide_right)))
            .unwrap();

        assert!(matches!(out.sanity, SanityVerdict::WidthOutOfBand { .. }));
        assert_eq!(out.right_fit, Some(r));
        assert_eq!(session.metrics().rejected_width, 1);
    }

    #[test]
    fn test_track_loss_resets_trackers_and_pid() {
        let mut config = Config::default();
        config.tracker.max_lost = 3;
        let mut session = Session::new(&config).unwrap();

        // Vehicle 100 px right of center builds up integral history.
        let l = make_fit(0.0, 0.0, 190.0);
        let r = make_fit(0.0, 0.0, 890.0);
        for n in 0..5 {
            session.process_frame(&frame(n, Some(l), Some(r))).unwrap();
        }
        assert!(session.pid().integral() > 0.0);

        for n in 5..8 {
            let out = session.process_frame(&frame(n, None, None)).unwrap();
            assert_eq!(out.status, TrackingStatus::Coasting);
        }
        assert!(session.pid().integral() > 0.0);

        let out = session.process_frame(&frame(8, None, None)).unwrap();
        assert_eq!(out.status, TrackingStatus::Lost);
        assert_eq!(out.left_fit, None);
        assert_eq!(out.right_fit, None);
        assert_eq!(out.offset_m, 0.0);
        assert_eq!(out.curvature_m, 0.0);
        assert_eq!(out.lane_width_m, None);
        assert_eq!(out.steering_deg, 0.0);
        assert_eq!(session.pid().integral(), 0.0);
        assert_eq!(session.metrics().track_resets, 2);
        assert_eq!(session.metrics().pid_resets, 1);
    }

    #[test]
    fn test_reacquired_track_bootstraps_without_stale_history() {
        let mut config = Config::default();
        config.tracker.max_lost = 1;
        let mut session = Session::new(&config).unwrap();

        let (l, r) = centered_pair();
        session.process_frame(&frame(0, Some(l), Some(r))).unwrap();
        session.process_frame(&frame(1, None, None)).unwrap();
        session.process_frame(&frame(2, None, None)).unwrap();
        assert_eq!(session.status(), TrackingStatus::Lost);

        let l2 = make_fit(0.0, 0.0, 240.0);
        let r2 = make_fit(0.0, 0.0, 940.0);
        let out = session.process_frame(&frame(3, Some(l2), Some(r2))).unwrap();
        assert_eq!(out.left_fit, Some(l2));
        assert_eq!(out.right_fit, Some(r2));
        assert_eq!(out.status, TrackingStatus::Tracking);
    }

    #[test]
    fn test_steering_follows_offset_sign() {
        let mut session = Session::new(&Config::default()).unwrap();
        // Lane center left of image center: vehicle right of center.
        let l = make_fit(0.0, 0.0, 190.0);
        let r = make_fit(0.0, 0.0, 890.0);
        let out = session.process_frame(&frame(0, Some(l), Some(r))).unwrap();

        assert!(out.offset_m > 0.0);
        assert!(out.steering_deg > 0.0);
        assert!(out.steering_deg <= 25.0);
    }

    #[test]
    fn test_proportional_mode_is_stateless() {
        let mut config = Config::default();
        config.controller.mode = SteeringMode::Proportional;
        let mut session = Session::new(&config).unwrap();

        let l = make_fit(0.0, 0.0, 190.0);
        let r = make_fit(0.0, 0.0, 890.0);
        let first = session.process_frame(&frame(0, Some(l), Some(r))).unwrap();
        let second = session.process_frame(&frame(1, Some(l), Some(r))).unwrap();

        let expected = proportional_steering(first.offset_m, 1.0, 25.0);
        assert_eq!(first.steering_deg, expected);
        assert_eq!(second.steering_deg, expected);
        assert_eq!(session.pid().integral(), 0.0);
    }

    #[test]
    fn test_dt_from_timestamps() {
        let mut session = Session::new(&Config::default()).unwrap();
        let (l, r) = centered_pair();

        let out = session
            .process_frame(&frame(0, Some(l), Some(r)).with_timestamp(1000.0))
            .unwrap();
        assert_eq!(out.dt, 0.033);

        let out = session
            .process_frame(&frame(1, Some(l), Some(r)).with_timestamp(1050.0))
            .unwrap();
        assert!((out.dt - 0.05).abs() < 1e-12);

        // Non-increasing timestamps fall back to the configured period.
        let out = session
            .process_frame(&frame(2, Some(l), Some(r)).with_timestamp(1050.0))
            .unwrap();
        assert_eq!(out.dt, 0.033);
    }

    #[test]
    fn test_lost_before_first_detection() {
        let mut session = Session::new(&Config::default()).unwrap();
        let out = session.process_frame(&frame(0, None, None)).unwrap();
        assert_eq!(out.status, TrackingStatus::Lost);
        assert_eq!(out.offset_m, 0.0);
        assert_eq!(session.metrics().pid_resets, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.controller.ki = -1.0;
        assert!(Session::new(&config).is_err());
    }
}
