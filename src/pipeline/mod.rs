// src/pipeline/mod.rs

pub mod frame_result;
pub mod metrics;
pub mod session;

pub use frame_result::{FrameOutput, TrackingStatus};
pub use metrics::{MetricsSummary, SessionMetrics};
pub use session::Session;
