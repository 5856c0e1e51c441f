// src/detection/mod.rs

pub mod lane_line;
pub mod sanity;

// Re-export public APIs
pub use lane_line::{LaneLine, LineStatus};
pub use sanity::{EvaluationYs, SanityConfig, SanityVerdict};
