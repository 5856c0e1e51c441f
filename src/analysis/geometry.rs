// src/analysis/geometry.rs
//
// Vehicle offset and radius of curvature from smoothed boundary fits.
//
// Coordinate system:
//   Fits live in the bird's-eye (warped) image: y is the row, increasing
//   downward, and x(y) = a·y² + b·y + c. The vehicle sits at the
//   horizontal center of the frame. Metric results use the per-axis
//   meters-per-pixel scales of the warp.
//
// Curvature:
//   For x(y) = A·y² + B·y + C the radius at y is
//     R = (1 + (2·A·y + B)²)^1.5 / |2·A|
//   Converting pixel coefficients to meters:
//     A_m = A · xm / ym²,  B_m = B · xm / ym,  y_m = y · ym
//   A perfectly straight boundary (A = 0) has no finite radius and is
//   reported as `f64::INFINITY`. An absent boundary reports 0.0.

use crate::types::{CameraConfig, PolyFit};
use serde::Serialize;

/// Lateral offset of the frame center from the lane center, in meters.
///
/// Positive means the vehicle is right of the lane center. Returns 0.0
/// when either boundary is missing.
pub fn vehicle_offset(
    frame_width: f64,
    left: Option<&PolyFit>,
    right: Option<&PolyFit>,
    eval_y: f64,
    xm_per_pix: f64,
) -> f64 {
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return 0.0,
    };

    let lane_center = (left.x_at(eval_y) + right.x_at(eval_y)) / 2.0;
    let image_center = frame_width / 2.0;

    (image_center - lane_center) * xm_per_pix
}

/// Radius of curvature in meters for (left, right) at row `eval_y`.
pub fn curvature_real(
    left: Option<&PolyFit>,
    right: Option<&PolyFit>,
    eval_y: f64,
    xm_per_pix: f64,
    ym_per_pix: f64,
) -> (f64, f64) {
    let radius = |fit: Option<&PolyFit>| {
        fit.map_or(0.0, |f| {
            let a_m = xm_per_pix / (ym_per_pix * ym_per_pix) * f.a();
            let b_m = xm_per_pix / ym_per_pix * f.b();
            radius_of_curvature(a_m, b_m, eval_y * ym_per_pix)
        })
    };
    (radius(left), radius(right))
}

/// Radius of curvature in warped-image pixels for (left, right).
pub fn curvature_pixels(left: Option<&PolyFit>, right: Option<&PolyFit>, eval_y: f64) -> (f64, f64) {
    let radius = |fit: Option<&PolyFit>| fit.map_or(0.0, |f| radius_of_curvature(f.a(), f.b(), eval_y));
    (radius(left), radius(right))
}

fn radius_of_curvature(a: f64, b: f64, y: f64) -> f64 {
    if a == 0.0 {
        return f64::INFINITY;
    }
    let slope = 2.0 * a * y + b;
    (1.0 + slope * slope).powf(1.5) / (2.0 * a).abs()
}

/// Single reported radius: plain mean of both sides.
///
/// Not meaningful when the two sides disagree strongly; callers get the
/// raw per-side values alongside it.
pub fn average_curvature(left_m: f64, right_m: f64) -> f64 {
    (left_m + right_m) / 2.0
}

/// Linear offset-to-angle map clamped at full lock.
pub fn proportional_steering(offset_m: f64, max_offset_m: f64, max_angle_deg: f64) -> f64 {
    let max_angle = max_angle_deg.abs();
    (offset_m / max_offset_m * max_angle).clamp(-max_angle, max_angle)
}

/// Everything the geometry stage derives for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaneGeometry {
    pub offset_m: f64,
    pub left_radius_m: f64,
    pub right_radius_m: f64,
    pub avg_radius_m: f64,
    pub lane_width_m: Option<f64>,
}

impl LaneGeometry {
    /// Measures at the bottom row of the frame, where the vehicle is.
    pub fn measure(left: Option<&PolyFit>, right: Option<&PolyFit>, camera: &CameraConfig) -> Self {
        let eval_y = camera.frame_height as f64;
        let offset_m = vehicle_offset(
            camera.frame_width as f64,
            left,
            right,
            eval_y,
            camera.xm_per_pix,
        );
        let (left_radius_m, right_radius_m) =
            curvature_real(left, right, eval_y, camera.xm_per_pix, camera.ym_per_pix);

        Self {
            offset_m,
            left_radius_m,
            right_radius_m,
            avg_radius_m: average_curvature(left_radius_m, right_radius_m),
            lane_width_m: Self::lane_width_m(left, right, camera),
        }
    }

    /// Lane width in meters implied by the offset scale, or `None` when a side is missing.
    pub fn lane_width_m(
        left: Option<&PolyFit>,
        right: Option<&PolyFit>,
        camera: &CameraConfig,
    ) -> Option<f64> {
        let y = camera.frame_height as f64;
        Some((right?.x_at(y) - left?.x_at(y)) * camera.xm_per_pix)
    }
}
