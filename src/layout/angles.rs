// Angle helpers for the radial layout.
//
// All angles are radians measured from the +x axis, screen coordinates
// (y grows downward), so -PI/2 points "up".

use std::f64::consts::{PI, TAU};

use crate::model::Point;

/// Direction used when no parent gives a hint: straight up from the anchor.
pub const ROOT_ANGLE: f64 = -std::f64::consts::FRAC_PI_2;

/// Wrap any angle into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid maps +PI onto -PI; keep the half-open range on the positive side
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `b` to `a`, always within [-PI, PI].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(a - b)
}

/// Mean of a set of angles via the resultant vector.
///
/// Returns 0 for an empty set. Opposite angles cancel out; the resultant is
/// then zero and `atan2(0, 0)` yields 0 as well.
pub fn circular_mean(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let (sin_sum, cos_sum) = angles
        .iter()
        .fold((0.0f64, 0.0f64), |(s, c), a| (s + a.sin(), c + a.cos()));
    sin_sum.atan2(cos_sum)
}

/// Angle of `p` as seen from `origin`, or `None` when they coincide.
pub fn angle_from(origin: Point, p: Point) -> Option<f64> {
    let dx = p.x - origin.x;
    let dy = p.y - origin.y;
    if dx == 0.0 && dy == 0.0 {
        None
    } else {
        Some(dy.atan2(dx))
    }
}

pub fn polar_to_point(origin: Point, radius: f64, angle: f64) -> Point {
    Point {
        x: origin.x + radius * angle.cos(),
        y: origin.y + radius * angle.sin(),
    }
}
