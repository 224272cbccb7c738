use std::collections::BTreeMap;

use glam::{IVec2, Vec2};

use super::entity::{RectEntity, SolidType};
use super::map::{BarrierType, TileSampler};
use crate::math::{Rect, segments_intersect};
use crate::spatial::{EntityId, SpatialHash};

/// Edges closer than this to a rect's leading side count as touching it.
const CONTACT_EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn with(self, v: Vec2, value: f32) -> Vec2 {
        match self {
            Axis::X => Vec2::new(value, v.y),
            Axis::Y => Vec2::new(v.x, value),
        }
    }

    fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn blocked_by(self, barrier: BarrierType) -> bool {
        match self {
            Axis::X => barrier.blocks_left(),
            Axis::Y => barrier.blocks_top(),
        }
    }
}

/// Outcome of moving a rect by one tick's displacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Movement {
    pub position: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
    /// Solid things that stopped the rect, for collision hooks.
    pub things: Vec<EntityId>,
}

pub(super) struct Resolver<'a> {
    pub grid: &'a SpatialHash,
    pub tiles: Option<&'a TileSampler>,
    pub entities: &'a BTreeMap<EntityId, RectEntity>,
}

impl Resolver<'_> {
    fn barrier(&self, coord: IVec2) -> BarrierType {
        self.tiles
            .and_then(|tiles| tiles.barrier(coord))
            .unwrap_or_default()
    }

    /// Moves `rect` by `delta`, testing each axis on its own from the
    /// starting position so a blocked axis does not cancel the other.
    pub fn resolve(&self, id: EntityId, rect: &Rect, delta: Vec2) -> Movement {
        let mut things = Vec::new();
        // Both sweeps start from the old position.
        let (x, blocked_x) = self.sweep(id, rect, Axis::X, delta.x, &mut things);
        let (mut y, mut blocked_y) = self.sweep(id, rect, Axis::Y, delta.y, &mut things);

        // The combined move can still clip a corner neither axis saw alone,
        // so re-run y from where x ended up. Only a new block is taken; an
        // existing y stop is already the nearer one.
        let slid = rect.at(Vec2::new(x, rect.position.y));
        let (corner_y, corner_blocked) = self.sweep(id, &slid, Axis::Y, delta.y, &mut things);
        if corner_blocked && !blocked_y {
            y = corner_y;
            blocked_y = true;
        }

        things.sort_unstable();
        things.dedup();
        Movement {
            position: Vec2::new(x, y),
            blocked_x,
            blocked_y,
            things,
        }
    }

    /// Returns the reachable coordinate along `axis` and whether anything
    /// cut the move short.
    fn sweep(
        &self,
        id: EntityId,
        rect: &Rect,
        axis: Axis,
        delta: f32,
        things: &mut Vec<EntityId>,
    ) -> (f32, bool) {
        let start = axis.of(rect.position);
        if delta == 0.0 {
            return (start, false);
        }
        let mut target = start + delta;
        let mut blocked = false;

        // Keep whichever stop comes first along the direction of travel.

        if let Some(stop) = self.bound_stop(rect, axis, delta) {
            target = closer(delta, target, stop);
            blocked = true;
        }
        if let Some(stop) = self.barrier_stop(rect, axis, delta) {
            target = closer(delta, target, stop);
            blocked = true;
        }
        if let Some((stop, thing)) = self.thing_stop(id, rect, axis, delta) {
            // Only report the thing if it, not a wall, is what stopped us.
            if closer(delta, target, stop) == stop {
                target = stop;
                blocked = true;
                things.push(thing);
            }
        }
        (target, blocked)
    }

    fn bound_stop(&self, rect: &Rect, axis: Axis, delta: f32) -> Option<f32> {
        let bound = match axis {
            Axis::X => self.grid.pixel_width(),
            Axis::Y => self.grid.pixel_height(),
        }?;
        let start = axis.of(rect.position);
        let size = axis.of(rect.size);
        if delta > 0.0 {
            let limit = (bound - size).max(0.0);
            (start + delta > limit).then_some(limit)
        } else {
            (start + delta < 0.0).then_some(0.0)
        }
    }

    /// Nearest blocking grid line between the rect's leading edge and its
    /// destination, expressed as the rect position that touches it.
    fn barrier_stop(&self, rect: &Rect, axis: Axis, delta: f32) -> Option<f32> {
        self.tiles?;
        let length = self.grid.block_length();
        let start = axis.of(rect.position);
        let size = axis.of(rect.size);

        let lo = self.grid.pixel_to_block(rect.position);
        let hi = self
            .grid
            .pixel_to_block(Vec2::new(rect.discrete_x2(), rect.discrete_y2()))
            .max(lo);
        // Rows (or columns) the rect spans across the direction of travel.
        let (cross_lo, cross_hi) = match axis {
            Axis::X => (lo.y, hi.y),
            Axis::Y => (lo.x, hi.x),
        };

        let blocks_line = |line: i32| {
            (cross_lo..=cross_hi).any(|c| {
                let coord = match axis {
                    Axis::X => IVec2::new(line, c),
                    Axis::Y => IVec2::new(c, line),
                };
                axis.blocked_by(self.barrier(coord))
            })
        };

        // Grid lines are scanned from the leading edge outward. A line the
        // edge already rests on counts, hence the epsilon.
        if delta > 0.0 {
            let edge = start + size;
            let first = ((edge - CONTACT_EPS) / length).ceil() as i32;
            let last = ((edge + delta) / length).ceil() as i32 - 1;
            (first..=last)
                .find(|&line| blocks_line(line))
                .map(|line| line as f32 * length - size)
        } else {
            let first = ((start + CONTACT_EPS) / length).floor() as i32;
            let last = ((start + delta) / length).floor() as i32 + 1;
            (last..=first)
                .rev()
                .find(|&line| blocks_line(line))
                .map(|line| line as f32 * length)
        }
    }

    fn thing_stop(&self, id: EntityId, rect: &Rect, axis: Axis, delta: f32) -> Option<(f32, EntityId)> {
        let start = axis.of(rect.position);
        let size = axis.of(rect.size);
        // Everything the rect passes over this tick along `axis`.
        let swept = {
            let moved = rect.at(axis.with(rect.position, start + delta));
            let position = rect.position.min(moved.position);
            let far = Vec2::new(rect.x2().max(moved.x2()), rect.y2().max(moved.y2()));
            Rect::new(position, far - position)
        };
        let cross = axis.other();
        let (cross_lo, cross_hi) = (cross.of(rect.position), cross.of(rect.position + rect.size));

        let mut best: Option<(f32, EntityId)> = None;
        for other in self.grid.rects_colliding_with(&swept) {
            if other == id {
                continue;
            }
            let solid = self
                .entities
                .get(&other)
                .map_or(SolidType::NotSolid, RectEntity::solid);
            if solid == SolidType::NotSolid {
                continue;
            }
            let Some(thing) = self.grid.rect(other) else {
                continue;
            };
            let (thing_lo, thing_hi) = (axis.of(thing.position), axis.of(thing.position + thing.size));
            let (thing_cross_lo, thing_cross_hi) = (cross.of(thing.position), cross.of(thing.position + thing.size));
            // Merely touching side by side does not block.
            if thing_cross_lo >= cross_hi || thing_cross_hi <= cross_lo {
                continue;
            }
            let stop = if delta > 0.0 {
                // Already overlapping or out of reach.
                if thing_lo < start + size - CONTACT_EPS || thing_lo >= start + size + delta {
                    continue;
                }
                thing_lo - size
            } else {
                if thing_hi > start + CONTACT_EPS || thing_hi <= start + delta {
                    continue;
                }
                thing_hi
            };
            if best.is_none_or(|(current, _)| closer(delta, current, stop) == stop) {
                best = Some((stop, other));
            }
        }
        best
    }

    /// Whether a straight bullet path crosses any barrier edge.
    pub fn path_crosses_barrier(&self, from: Vec2, to: Vec2) -> bool {
        if self.tiles.is_none() {
            return false;
        }
        let length = self.grid.block_length();
        let a = self.grid.pixel_to_block(from);
        let b = self.grid.pixel_to_block(to);
        let (lo, hi) = (a.min(b), a.max(b));
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                let barrier = self.barrier(IVec2::new(x, y));
                let corner = Vec2::new(x as f32, y as f32) * length;
                if barrier.blocks_left()
                    && segments_intersect(from, to, corner, corner + Vec2::new(0.0, length))
                {
                    return true;
                }
                if barrier.blocks_top()
                    && segments_intersect(from, to, corner, corner + Vec2::new(length, 0.0))
                {
                    return true;
                }
            }
        }
        false
    }
}

/// Of two stops along a move in direction `delta`, the one reached first.
fn closer(delta: f32, a: f32, b: f32) -> f32 {
    if delta > 0.0 { a.min(b) } else { a.max(b) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::entity::Thing;
    use crate::scene::map::TileGrid;

    const LEN: f32 = 50.0;

    struct Fixture {
        grid: SpatialHash,
        tiles: Option<TileSampler>,
        entities: BTreeMap<EntityId, RectEntity>,
        mover: EntityId,
    }

    impl Fixture {
        fn new(barriers: &[(i32, i32, BarrierType)]) -> Self {
            let mut grid = SpatialHash::new(Some(10), Some(10), LEN).unwrap();
            let mut tiles = TileGrid::new(10, 10);
            for &(x, y, barrier) in barriers {
                tiles.set_barrier(IVec2::new(x, y), barrier);
            }
            let mover = grid.allocate_id();
            grid.register_rect(mover, Rect::new(Vec2::new(10.0, 10.0), Vec2::splat(20.0)))
                .unwrap();
            Self {
                grid,
                tiles: Some(TileSampler::region(tiles)),
                entities: BTreeMap::new(),
                mover,
            }
        }

        fn add_thing(&mut self, rect: Rect, solid: SolidType) -> EntityId {
            let id = self.grid.allocate_id();
            self.grid.register_rect(id, rect).unwrap();
            self.entities.insert(id, RectEntity::Thing(Thing { solid, sprite: None }));
            id
        }

        fn place(&mut self, position: Vec2) -> Rect {
            self.grid.edit_rect(self.mover, position).unwrap();
            *self.grid.rect(self.mover).unwrap()
        }

        fn resolve(&self, delta: Vec2) -> Movement {
            let resolver = Resolver {
                grid: &self.grid,
                tiles: self.tiles.as_ref(),
                entities: &self.entities,
            };
            let rect = *self.grid.rect(self.mover).unwrap();
            resolver.resolve(self.mover, &rect, delta)
        }
    }

    #[test]
    fn free_move_is_unchanged() {
        let f = Fixture::new(&[]);
        let m = f.resolve(Vec2::new(3.0, -2.0));
        assert_eq!(m.position, Vec2::new(13.0, 8.0));
        assert!(!m.blocked_x && !m.blocked_y);
    }

    #[test]
    fn left_barrier_stops_at_boundary() {
        let mut f = Fixture::new(&[(1, 0, BarrierType::Left)]);
        f.place(Vec2::new(25.0, 10.0));
        let m = f.resolve(Vec2::new(10.0, 0.0));
        assert_eq!(m.position.x, 30.0);
        assert!(m.blocked_x);

        // Touching the line, it cannot advance at all.
        f.place(Vec2::new(30.0, 10.0));
        let m = f.resolve(Vec2::new(10.0, 0.0));
        assert_eq!(m.position.x, 30.0);
        assert!(m.blocked_x);
    }

    #[test]
    fn barrier_blocks_moving_left_too() {
        let mut f = Fixture::new(&[(1, 0, BarrierType::LeftTop)]);
        f.place(Vec2::new(55.0, 10.0));
        let m = f.resolve(Vec2::new(-10.0, 0.0));
        assert_eq!(m.position.x, 50.0);
        assert!(m.blocked_x);
    }

    #[test]
    fn top_barrier_leaves_x_free() {
        let mut f = Fixture::new(&[(0, 1, BarrierType::Top)]);
        f.place(Vec2::new(10.0, 25.0));
        let m = f.resolve(Vec2::new(5.0, 10.0));
        assert_eq!(m.position, Vec2::new(15.0, 30.0));
        assert!(!m.blocked_x);
        assert!(m.blocked_y);
    }

    #[test]
    fn map_edge_clamps() {
        let mut f = Fixture::new(&[]);
        f.place(Vec2::new(475.0, 2.0));
        let m = f.resolve(Vec2::new(10.0, -5.0));
        assert_eq!(m.position, Vec2::new(480.0, 0.0));
        assert!(m.blocked_x && m.blocked_y);
    }

    #[test]
    fn solid_thing_stops_and_is_reported() {
        let mut f = Fixture::new(&[]);
        let wall = f.add_thing(Rect::new(Vec2::new(35.0, 0.0), Vec2::new(5.0, 100.0)), SolidType::BlockCharacter);
        f.add_thing(Rect::new(Vec2::new(31.0, 0.0), Vec2::new(2.0, 100.0)), SolidType::NotSolid);
        let m = f.resolve(Vec2::new(10.0, 0.0));
        assert_eq!(m.position.x, 15.0);
        assert!(m.blocked_x);
        assert_eq!(m.things, vec![wall]);
    }

    #[test]
    fn bullet_path_hits_edge() {
        let f = Fixture::new(&[(2, 0, BarrierType::Left)]);
        let resolver = Resolver {
            grid: &f.grid,
            tiles: f.tiles.as_ref(),
            entities: &f.entities,
        };
        assert!(resolver.path_crosses_barrier(Vec2::new(95.0, 20.0), Vec2::new(105.0, 20.0)));
        assert!(!resolver.path_crosses_barrier(Vec2::new(95.0, 60.0), Vec2::new(105.0, 60.0)));
    }
}
