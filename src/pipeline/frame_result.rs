// src/pipeline/frame_result.rs
//
// Hand-off record for one processed frame. Everything an overlay
// renderer needs is here; nothing downstream reads tracker state directly.

use crate::detection::{LaneLine, LineStatus, SanityVerdict};
use crate::types::PolyFit;
use serde::Serialize;

/// Session-level confidence derived from both boundary trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackingStatus {
    /// Both boundaries hold a fit refreshed this frame.
    Tracking,
    /// Both boundaries hold a fit, at least one of them stale.
    Coasting,
    /// At least one boundary has no fit at all.
    Lost,
}

impl TrackingStatus {
    pub fn from_lines(left: &LaneLine, right: &LaneLine) -> Self {
        match (left.status(), right.status()) {
            (LineStatus::Empty, _) | (_, LineStatus::Empty) => Self::Lost,
            (LineStatus::Tracking, LineStatus::Tracking) => Self::Tracking,
            _ => Self::Coasting,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tracking => "Tracking",
            Self::Coasting => "Coasting",
            Self::Lost => "Lost",
        }
    }

    /// Overlay text colour, BGR.
    pub fn color_bgr(&self) -> (u8, u8, u8) {
        match self {
            Self::Tracking => (0, 255, 0),
            Self::Coasting => (0, 255, 255),
            Self::Lost => (0, 0, 255),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<f64>,
    pub left_fit: Option<PolyFit>,
    pub right_fit: Option<PolyFit>,
    pub offset_m: f64,
    pub steering_deg: f64,
    /// Mean of both radii; `null` in JSON for a straight boundary.
    pub curvature_m: f64,
    pub left_curvature_m: f64,
    pub right_curvature_m: f64,
    pub lane_width_m: Option<f64>,
    pub status: TrackingStatus,
    pub sanity: SanityVerdict,
    pub dt: f64,
}

impl FrameOutput {
    pub fn confidence_label(&self) -> &'static str {
        self.status.label()
    }

    /// Text lines for the info overlay, top to bottom.
    pub fn overlay_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Steering Angle: {:.2} deg", self.steering_deg),
            format!("Offset: {:.2} m", self.offset_m),
        ];
        if self.curvature_m.is_finite() && self.curvature_m != 0.0 {
            lines.push(format!("Radius of Curvature: {:.0} m", self.curvature_m));
        }
        lines.push(format!("Status: {}", self.status.label()));
        lines
    }
}
