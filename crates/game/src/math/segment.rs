use glam::Vec2;

use super::Rect;

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether segment `a1-a2` touches segment `b1-b2`, endpoints included.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

/// Time until two points moving along one axis meet, if they ever do.
pub fn time_to_hit(a: f32, b: f32, a_speed: f32, b_speed: f32) -> Option<f32> {
    let speed_diff = a_speed - b_speed;
    if speed_diff == 0.0 {
        return (a == b).then_some(0.0);
    }
    let time = (b - a) / speed_diff;
    (time >= 0.0).then_some(time)
}

/// Earliest time a moving point enters a moving rect, if ever.
pub fn time_to_hit_rect(dot: Vec2, dot_velocity: Vec2, rect: &Rect, rect_velocity: Vec2) -> Option<f32> {
    // Window of time during which the point sits inside [lo, hi] on one axis.
    let axis = |p: f32, lo: f32, hi: f32, vp: f32, vr: f32| -> Option<(f32, f32)> {
        let speed = vp - vr;
        if speed == 0.0 {
            return (lo <= p && p <= hi).then_some((0.0, f32::INFINITY));
        }
        let a = (lo - p) / speed;
        let b = (hi - p) / speed;
        let (enter, exit) = if a <= b { (a, b) } else { (b, a) };
        (exit >= 0.0).then_some((enter.max(0.0), exit))
    };

    let (x1, x2) = axis(dot.x, rect.position.x, rect.x2(), dot_velocity.x, rect_velocity.x)?;
    let (y1, y2) = axis(dot.y, rect.position.y, rect.y2(), dot_velocity.y, rect_velocity.y)?;

    if x1 > y2 || y1 > x2 {
        return None;
    }
    Some(x1.max(y1))
}

/// Direction to fire a projectile of `projectile_speed` from `source` so it
/// meets a target at `target` moving with `target_velocity`.
pub fn intercept_direction(
    source: Vec2,
    target: Vec2,
    target_velocity: Vec2,
    projectile_speed: f32,
) -> Option<Vec2> {
    let diff = target - source;
    let a = target_velocity.length_squared() - projectile_speed * projectile_speed;
    let b = 2.0 * diff.dot(target_velocity);
    let c = diff.length_squared();

    let t = if a.abs() < f32::EPSILON {
        if b == 0.0 {
            return None;
        }
        -c / b
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let t1 = (-b - root) / (2.0 * a);
        let t2 = (-b + root) / (2.0 * a);
        match (t1 >= 0.0, t2 >= 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return None,
        }
    };

    if t < 0.0 {
        return None;
    }
    Some(diff + target_velocity * t)
}

/// Where a body ends up after `time` if it starts braking at `accel` and then
/// accelerates back the other way up to `max_speed`.
pub fn pos_on_reverse(start: Vec2, velocity: Vec2, accel: f32, max_speed: f32, time: f32) -> Vec2 {
    let speed = velocity.length();
    if speed == 0.0 {
        return start;
    }
    let dir = velocity / speed;
    let time_to_zero = speed / accel;
    let time_to_max = max_speed / accel;

    if time < time_to_zero {
        return start + dir * (speed / 2.0 * time);
    }

    let mut pos = start + dir * (speed / 2.0 * time_to_zero);
    if time < time_to_zero + time_to_max {
        pos -= dir * (max_speed / 2.0 * (time - time_to_zero));
    } else {
        pos -= dir * (max_speed / 2.0 * time_to_max);
        pos -= dir * (max_speed * (time - time_to_max - time_to_zero));
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_intersection_cases() {
        let a1 = Vec2::new(-1.0, 5.0);
        let a2 = Vec2::new(0.0, 0.0);
        assert!(segments_intersect(a1, a2, Vec2::new(-0.5, 10.0), Vec2::new(-0.5, -10.0)));
        assert!(segments_intersect(a1, a2, Vec2::new(-0.5, 10.0), Vec2::new(-0.5, 2.35)));
        assert!(!segments_intersect(a1, a2, Vec2::new(-0.5, 10.0), Vec2::new(-0.5, 2.6)));
    }

    #[test]
    fn time_to_hit_never_in_past() {
        assert_eq!(time_to_hit(0.0, 10.0, 2.0, 0.0), Some(5.0));
        assert_eq!(time_to_hit(0.0, 10.0, -2.0, 0.0), None);
        assert_eq!(time_to_hit(3.0, 3.0, 1.0, 1.0), Some(0.0));
    }

    #[test]
    fn dot_enters_rect() {
        let rect = Rect::new(Vec2::new(10.0, -5.0), Vec2::splat(10.0));
        let t = time_to_hit_rect(Vec2::ZERO, Vec2::new(1.0, 0.0), &rect, Vec2::ZERO);
        assert_eq!(t, Some(10.0));
        let miss = time_to_hit_rect(Vec2::new(0.0, 50.0), Vec2::new(1.0, 0.0), &rect, Vec2::ZERO);
        assert_eq!(miss, None);
    }

    #[test]
    fn dot_enters_rect_vertically() {
        let rect = Rect::new(Vec2::new(-5.0, 20.0), Vec2::splat(10.0));
        let t = time_to_hit_rect(Vec2::ZERO, Vec2::new(0.0, 2.0), &rect, Vec2::ZERO);
        assert_eq!(t, Some(10.0));
        // Rect chasing the dot upwards more slowly.
        let t = time_to_hit_rect(Vec2::ZERO, Vec2::new(0.0, 2.0), &rect, Vec2::new(0.0, 1.0));
        assert_eq!(t, Some(20.0));
    }

    #[test]
    fn parallel_outside_the_band_never_hits() {
        let rect = Rect::new(Vec2::new(10.0, -5.0), Vec2::splat(10.0));
        assert_eq!(time_to_hit_rect(Vec2::new(0.0, 5.5), Vec2::X, &rect, Vec2::ZERO), None);
        assert_eq!(time_to_hit_rect(Vec2::new(-5.5, 0.0), Vec2::Y, &rect, Vec2::ZERO), None);
        // Moving away from the rect.
        assert_eq!(time_to_hit_rect(Vec2::ZERO, -Vec2::X, &rect, Vec2::ZERO), None);
    }

    #[test]
    fn dot_already_inside_hits_immediately() {
        let rect = Rect::new(Vec2::ZERO, Vec2::splat(10.0));
        assert_eq!(time_to_hit_rect(Vec2::splat(5.0), Vec2::ZERO, &rect, Vec2::ZERO), Some(0.0));
    }

    #[test]
    fn intercept_stationary_target_points_at_it() {
        let dir = intercept_direction(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::ZERO, 1.0).unwrap();
        assert!((dir.normalize() - Vec2::X).length() < 1e-5);
    }
}
