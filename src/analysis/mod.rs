// src/analysis/mod.rs
//
// Stateless lane geometry evaluated on smoothed boundary fits.

pub mod geometry;

pub use geometry::{
    average_curvature, curvature_pixels, curvature_real, proportional_steering, vehicle_offset,
    LaneGeometry,
};
