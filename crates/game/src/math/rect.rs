use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub position: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size * 0.5, size)
    }

    #[inline]
    pub fn x2(&self) -> f32 {
        self.position.x + self.size.x
    }

    #[inline]
    pub fn y2(&self) -> f32 {
        self.position.y + self.size.y
    }

    /// Last pixel column the rect touches; a rect ending on a pixel boundary
    /// does not spill into the next one.
    #[inline]
    pub fn discrete_x2(&self) -> f32 {
        self.x2().ceil() - 1.0
    }

    #[inline]
    pub fn discrete_y2(&self) -> f32 {
        self.y2().ceil() - 1.0
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    pub fn at(&self, position: Vec2) -> Self {
        Self {
            position,
            size: self.size,
        }
    }

    /// Inclusive overlap test; touching edges count as a collision.
    pub fn collides_with(&self, other: &Rect) -> bool {
        !(self.position.y > other.y2()
            || other.position.y > self.y2()
            || self.position.x > other.x2()
            || other.position.x > self.x2())
    }

    /// Strict overlap; rects sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.position.x < other.x2()
            && other.position.x < self.x2()
            && self.position.y < other.y2()
            && other.position.y < self.y2()
    }

    pub fn contains(&self, point: Vec2) -> bool {
        !(point.x > self.x2()
            || point.x < self.position.x
            || point.y > self.y2()
            || point.y < self.position.y)
    }
}
