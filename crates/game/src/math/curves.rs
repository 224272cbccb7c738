use glam::Vec2;

use super::Vec2Ext;

pub fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Spherical interpolation between two directions of equal length.
///
/// Falls back to `lerp` when the directions are parallel or opposite, where
/// the slerp weights become 0/0.
pub fn slerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    let angle = a.unsigned_angle_between(b);
    let sin = angle.sin();
    if angle == 0.0 || sin.abs() < 1e-6 {
        return lerp(a, b, t);
    }
    let wa = ((1.0 - t) * angle).sin() / sin;
    let wb = (t * angle).sin() / sin;
    a * wa + b * wb
}

/// Cubic Hermite spline through `a` and `b` with tangents `va` and `vb`.
pub fn hermite(a: Vec2, b: Vec2, va: Vec2, vb: Vec2, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    a * h00 + va * h10 + b * h01 + vb * h11
}
