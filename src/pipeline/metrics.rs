// src/pipeline/metrics.rs
//
// Per-session counters. Logged as a summary at the end of every clip.

use crate::detection::SanityVerdict;
use crate::pipeline::TrackingStatus;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub total_frames: u64,
    pub accepted_frames: u64,
    pub rejected_missing: u64,
    pub rejected_width: u64,
    pub rejected_parallel: u64,
    pub tracking_frames: u64,
    pub coasting_frames: u64,
    pub lost_frames: u64,
    pub track_resets: u64,
    pub pid_resets: u64,
    pub started_at: Instant,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            accepted_frames: 0,
            rejected_missing: 0,
            rejected_width: 0,
            rejected_parallel: 0,
            tracking_frames: 0,
            coasting_frames: 0,
            lost_frames: 0,
            track_resets: 0,
            pid_resets: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_frame(&mut self, verdict: &SanityVerdict, status: TrackingStatus) {
        self.total_frames += 1;

        match verdict {
            SanityVerdict::Accepted => self.accepted_frames += 1,
            SanityVerdict::MissingFit => self.rejected_missing += 1,
            SanityVerdict::WidthOutOfBand { .. } => self.rejected_width += 1,
            SanityVerdict::NotParallel { .. } => self.rejected_parallel += 1,
        }

        match status {
            TrackingStatus::Tracking => self.tracking_frames += 1,
            TrackingStatus::Coasting => self.coasting_frames += 1,
            TrackingStatus::Lost => self.lost_frames += 1,
        }
    }

    pub fn rejected_frames(&self) -> u64 {
        self.rejected_missing + self.rejected_width + self.rejected_parallel
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.accepted_frames as f64 / self.total_frames as f64
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.total_frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            accepted_frames: self.accepted_frames,
            rejected_frames: self.rejected_frames(),
            rejected_missing: self.rejected_missing,
            rejected_width: self.rejected_width,
            rejected_parallel: self.rejected_parallel,
            tracking_frames: self.tracking_frames,
            coasting_frames: self.coasting_frames,
            lost_frames: self.lost_frames,
            track_resets: self.track_resets,
            pid_resets: self.pid_resets,
            acceptance_rate: self.acceptance_rate(),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub accepted_frames: u64,
    pub rejected_frames: u64,
    pub rejected_missing: u64,
    pub rejected_width: u64,
    pub rejected_parallel: u64,
    pub tracking_frames: u64,
    pub coasting_frames: u64,
    pub lost_frames: u64,
    pub track_resets: u64,
    pub pid_resets: u64,
    pub acceptance_rate: f64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
