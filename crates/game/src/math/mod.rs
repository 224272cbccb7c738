mod curves;
mod poisson;
mod rect;
mod segment;

pub use curves::{hermite, lerp, slerp};
pub use poisson::{PoissonTable, factorial, poisson_cdf};
pub use rect::Rect;
pub use segment::{
    intercept_direction, pos_on_reverse, segments_intersect, time_to_hit, time_to_hit_rect,
};

use glam::Vec2;

/// Aim used whenever a direction degenerates to the zero vector.
pub const DEFAULT_AIM: Vec2 = Vec2::new(0.0, -1.0);

pub trait Vec2Ext {
    fn angle(self) -> f32;
    fn rotated(self, radians: f32) -> Self;
    fn rotate_by(&mut self, radians: f32);
    fn with_magnitude(self, magnitude: f32) -> Self;
    fn set_magnitude(&mut self, magnitude: f32);
    fn unsigned_angle_between(self, other: Self) -> f32;
    fn or_default_aim(self) -> Self;
}

impl Vec2Ext for Vec2 {
    #[inline]
    fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[inline]
    fn rotated(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    #[inline]
    fn rotate_by(&mut self, radians: f32) {
        *self = self.rotated(radians);
    }

    #[inline]
    fn with_magnitude(self, magnitude: f32) -> Self {
        self.normalize_or_zero() * magnitude
    }

    #[inline]
    fn set_magnitude(&mut self, magnitude: f32) {
        *self = self.with_magnitude(magnitude);
    }

    /// In `[0, PI]`. Zero when either side has no length.
    fn unsigned_angle_between(self, other: Self) -> f32 {
        let a = self.length();
        let b = other.length();
        if a == 0.0 || b == 0.0 {
            return 0.0;
        }
        (self.dot(other) / (a * b)).clamp(-1.0, 1.0).acos()
    }

    fn or_default_aim(self) -> Self {
        if self.length_squared() == 0.0 {
            DEFAULT_AIM
        } else {
            self
        }
    }
}

/// Shortest signed rotation taking angle `from` onto angle `to`, in `(-PI, PI]`.
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    let mut ahead = (to - from) % tau;
    if ahead < 0.0 {
        ahead += tau;
    }
    if ahead > std::f32::consts::PI {
        ahead - tau
    } else {
        ahead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec2::ZERO.with_magnitude(5.0), Vec2::ZERO);
        let mut v = Vec2::ZERO;
        v.set_magnitude(1.0);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = Vec2::X.rotated(FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn shortest_arc_picks_short_way() {
        assert!((shortest_arc(0.1, -0.1) + 0.2).abs() < 1e-6);
        assert!((shortest_arc(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-5);
        assert_eq!(shortest_arc(1.0, 1.0), 0.0);
    }

    #[test]
    fn degenerate_aim_falls_back() {
        assert_eq!(Vec2::ZERO.or_default_aim(), DEFAULT_AIM);
        assert_eq!(Vec2::X.or_default_aim(), Vec2::X);
    }
}
