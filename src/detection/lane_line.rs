// src/detection/lane_line.rs
//
// Temporal state for a single lane boundary.
//
// Each boundary keeps the last accepted raw fit and an exponentially
// smoothed fit. Missed frames are counted; once the count passes
// `max_lost` the boundary drops all history so the next detection
// bootstraps fresh instead of dragging a stale curve towards it.
//
// State machine (driven only by `update`):
//   Empty ──fit──▶ Tracking ──miss──▶ Coasting ──miss (> max_lost)──▶ Empty
//                     ▲                  │
//                     └──────fit─────────┘

use crate::types::{PolyFit, TrackerConfig};
use anyhow::{ensure, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineStatus {
    /// No history since creation or the last reset.
    Empty,
    /// Smoothed fit present and this frame's detection was accepted.
    Tracking,
    /// Smoothed fit present but stale: `0 < lost_count <= max_lost`.
    Coasting,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Tracking => "TRACKING",
            Self::Coasting => "COASTING",
        }
    }
}

/// One lane boundary's smoothing state.
///
/// Transitions are pure: [`LaneLine::updated`] returns the next state and
/// leaves `self` untouched, so a sequence of fits can be replayed exactly.
/// [`LaneLine::update`] is the in-place form used by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneLine {
    alpha: f64,
    max_lost: u32,
    detected: bool,
    lost_count: u32,
    current_fit: Option<PolyFit>,
    best_fit: Option<PolyFit>,
}

impl LaneLine {
    pub fn new(alpha: f64, max_lost: u32) -> Result<Self> {
        ensure!(
            alpha > 0.0 && alpha <= 1.0,
            "lane line alpha must be in (0, 1], got {}",
            alpha
        );
        ensure!(max_lost >= 1, "lane line max_lost must be >= 1");

        Ok(Self {
            alpha,
            max_lost,
            detected: false,
            lost_count: 0,
            current_fit: None,
            best_fit: None,
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        Self::new(config.alpha, config.max_lost)
    }

    /// Next state after observing `new_fit` (or a miss when `None`).
    pub fn updated(&self, new_fit: Option<PolyFit>) -> Self {
        let Some(fit) = new_fit else {
            let lost_count = self.lost_count + 1;
            if lost_count > self.max_lost {
                return self.cleared();
            }
            return Self {
                detected: false,
                lost_count,
                ..self.clone()
            };
        };

        let best_fit = match &self.best_fit {
            // First sample after a reset is taken as-is.
            None => fit,
            Some(best) => best.blend(&fit, self.alpha),
        };

        Self {
            detected: true,
            lost_count: 0,
            current_fit: Some(fit),
            best_fit: Some(best_fit),
            ..self.clone()
        }
    }

    pub fn update(&mut self, new_fit: Option<PolyFit>) {
        *self = self.updated(new_fit);
    }

    /// Smoothed fit when available, otherwise the last raw fit.
    pub fn get_fit(&self) -> Option<PolyFit> {
        self.best_fit.or(self.current_fit)
    }

    pub fn reset(&mut self) {
        *self = self.cleared();
    }

    fn cleared(&self) -> Self {
        Self {
            alpha: self.alpha,
            max_lost: self.max_lost,
            detected: false,
            lost_count: 0,
            current_fit: None,
            best_fit: None,
        }
    }

    pub fn status(&self) -> LineStatus {
        if self.get_fit().is_none() {
            LineStatus::Empty
        } else if self.lost_count == 0 {
            LineStatus::Tracking
        } else {
            LineStatus::Coasting
        }
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn lost_count(&self) -> u32 {
        self.lost_count
    }

    pub fn current_fit(&self) -> Option<PolyFit> {
        self.current_fit
    }

    pub fn best_fit(&self) -> Option<PolyFit> {
        self.best_fit
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn max_lost(&self) -> u32 {
        self.max_lost
    }
}
