// src/lib.rs
//
// Lane keeping from per-frame polynomial lane fits.
//
// Signal flow (one Session per clip):
//   raw fits ─▶ detection::sanity ─▶ detection::LaneLine ×2 ─▶ smoothed fits
//   smoothed fits ─▶ analysis::geometry ─▶ offset / curvature
//   offset ─▶ control::Pid ─▶ steering angle + TrackingStatus
//
// Orchestrated by pipeline::Session.

pub mod analysis;
mod config;
pub mod control;
pub mod detection;
pub mod pipeline;
pub mod trace_io;
pub mod types;

pub use detection::{LaneLine, LineStatus, SanityConfig, SanityVerdict};
pub use pipeline::{FrameOutput, Session, TrackingStatus};
pub use types::{Config, FrameInput, PolyFit};
