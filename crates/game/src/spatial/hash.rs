use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::ControlFlow;

use glam::{IVec2, Vec2};

use super::block::{Block, BlockCoord, EMPTY_BLOCK};
use super::{EntityId, SpatialError};
use crate::math::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub id: EntityId,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Dot,
    Rect,
}

type BlockRange = Option<(BlockCoord, BlockCoord)>;

const EDGE_SLACK: f32 = 1e-3;

fn cells(min: BlockCoord, max: BlockCoord) -> impl Iterator<Item = BlockCoord> {
    (min.x..=max.x).flat_map(move |x| (min.y..=max.y).map(move |y| IVec2::new(x, y)))
}

fn in_range(range: BlockRange, coord: BlockCoord) -> bool {
    range.is_some_and(|(min, max)| coord.cmpge(min).all() && coord.cmple(max).all())
}

/// Uniform grid index over dots and rects.
///
/// The hash owns the geometry of every registered entity. Block membership is
/// derived from that geometry and is kept equal to the cells each footprint
/// overlaps across every register, edit and unregister.
#[derive(Debug)]
pub struct SpatialHash {
    block_width: Option<u32>,
    block_height: Option<u32>,
    block_length: f32,
    blocks: HashMap<BlockCoord, Block>,
    dots: BTreeMap<EntityId, Vec2>,
    rects: BTreeMap<EntityId, Rect>,
    next_id: u32,
}

impl SpatialHash {
    /// `None` for a width or height makes that axis unbounded.
    pub fn new(
        block_width: Option<u32>,
        block_height: Option<u32>,
        block_length: f32,
    ) -> Result<Self, SpatialError> {
        if !(block_length.is_finite() && block_length > 0.0) {
            return Err(SpatialError::InvalidBlockLength(block_length));
        }
        Ok(Self {
            block_width,
            block_height,
            block_length,
            blocks: HashMap::new(),
            dots: BTreeMap::new(),
            rects: BTreeMap::new(),
            next_id: 1,
        })
    }

    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn block_width(&self) -> Option<u32> {
        self.block_width
    }

    pub fn block_height(&self) -> Option<u32> {
        self.block_height
    }

    pub fn block_length(&self) -> f32 {
        self.block_length
    }

    pub fn pixel_width(&self) -> Option<f32> {
        self.block_width.map(|w| w as f32 * self.block_length)
    }

    pub fn pixel_height(&self) -> Option<f32> {
        self.block_height.map(|h| h as f32 * self.block_length)
    }

    pub fn pixel_to_block(&self, pixel: Vec2) -> BlockCoord {
        (pixel / self.block_length).floor().as_ivec2()
    }

    pub fn is_block_outside(&self, coord: BlockCoord) -> bool {
        let outside = |c: i32, bound: Option<u32>| bound.is_some_and(|b| c < 0 || c >= b as i32);
        outside(coord.x, self.block_width) || outside(coord.y, self.block_height)
    }

    pub fn is_dot_outside(&self, position: Vec2) -> bool {
        let outside = |p: f32, bound: Option<f32>| bound.is_some_and(|b| p < 0.0 || p >= b);
        outside(position.x, self.pixel_width()) || outside(position.y, self.pixel_height())
    }

    /// Edges touching the map border count as inside, within `EDGE_SLACK`.
    pub fn is_rect_outside(&self, rect: &Rect) -> bool {
        let outside = |lo: f32, hi: f32, bound: Option<f32>| {
            bound.is_some_and(|b| lo < -EDGE_SLACK || hi > b + EDGE_SLACK)
        };
        outside(rect.position.x, rect.x2(), self.pixel_width())
            || outside(rect.position.y, rect.y2(), self.pixel_height())
    }

    pub fn block(&self, coord: BlockCoord) -> &Block {
        self.blocks.get(&coord).unwrap_or(&EMPTY_BLOCK)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockCoord, &Block)> {
        self.blocks.iter().map(|(coord, block)| (*coord, block))
    }

    pub fn rect(&self, id: EntityId) -> Option<&Rect> {
        self.rects.get(&id)
    }

    pub fn dot(&self, id: EntityId) -> Option<Vec2> {
        self.dots.get(&id).copied()
    }

    pub fn rects(&self) -> impl Iterator<Item = (EntityId, &Rect)> {
        self.rects.iter().map(|(id, rect)| (*id, rect))
    }

    pub fn dots(&self) -> impl Iterator<Item = Dot> + '_ {
        self.dots
            .iter()
            .map(|(id, position)| Dot { id: *id, position: *position })
    }

    pub fn rect_count(&self) -> usize {
        self.rects.len()
    }

    pub fn dot_count(&self) -> usize {
        self.dots.len()
    }

    fn clamp_range(&self, mut min: BlockCoord, mut max: BlockCoord) -> BlockRange {
        if let Some(w) = self.block_width {
            min.x = min.x.max(0);
            max.x = max.x.min(w as i32 - 1);
        }
        if let Some(h) = self.block_height {
            min.y = min.y.max(0);
            max.y = max.y.min(h as i32 - 1);
        }
        (min.x <= max.x && min.y <= max.y).then_some((min, max))
    }

    fn rect_range(&self, rect: &Rect) -> BlockRange {
        // Far edges use the discrete corner so a rect ending exactly on a
        // block boundary does not claim the next block.
        let min = self.pixel_to_block(rect.position);
        let max = self.pixel_to_block(Vec2::new(rect.discrete_x2(), rect.discrete_y2()));
        self.clamp_range(min, max.max(min))
    }

    fn dot_range(&self, position: Vec2) -> BlockRange {
        let coord = self.pixel_to_block(position);
        (!self.is_block_outside(coord)).then_some((coord, coord))
    }

    fn insert_into(&mut self, range: BlockRange, skip: BlockRange, id: EntityId, kind: Kind) {
        let Some((min, max)) = range else { return };
        for coord in cells(min, max).filter(|c| !in_range(skip, *c)) {
            let block = self.blocks.entry(coord).or_default();
            match kind {
                Kind::Dot => block.dots.insert(id),
                Kind::Rect => block.rects.insert(id),
            };
        }
    }

    fn remove_from(&mut self, range: BlockRange, keep: BlockRange, id: EntityId, kind: Kind) {
        let Some((min, max)) = range else { return };
        for coord in cells(min, max).filter(|c| !in_range(keep, *c)) {
            let Some(block) = self.blocks.get_mut(&coord) else { continue };
            match kind {
                Kind::Dot => block.dots.remove(&id),
                Kind::Rect => block.rects.remove(&id),
            };
            // Empty blocks are dropped so `blocks()` only lists occupied ones.
            if block.is_empty() {
                self.blocks.remove(&coord);
            }
        }
    }

    pub fn register_rect(&mut self, id: EntityId, rect: Rect) -> Result<(), SpatialError> {
        if self.rects.contains_key(&id) {
            return Err(SpatialError::AlreadyRegistered(id));
        }
        if self.is_rect_outside(&rect) {
            return Err(SpatialError::OutOfBounds(id));
        }
        self.insert_into(self.rect_range(&rect), None, id, Kind::Rect);
        self.rects.insert(id, rect);
        Ok(())
    }

    pub fn register_dot(&mut self, id: EntityId, position: Vec2) -> Result<(), SpatialError> {
        if self.dots.contains_key(&id) {
            return Err(SpatialError::AlreadyRegistered(id));
        }
        if self.is_dot_outside(position) {
            return Err(SpatialError::OutOfBounds(id));
        }
        self.insert_into(self.dot_range(position), None, id, Kind::Dot);
        self.dots.insert(id, position);
        Ok(())
    }

    pub fn unregister_rect(&mut self, id: EntityId) -> Result<Rect, SpatialError> {
        let rect = self.rects.remove(&id).ok_or(SpatialError::UnknownEntity(id))?;
        self.remove_from(self.rect_range(&rect), None, id, Kind::Rect);
        Ok(rect)
    }

    pub fn unregister_dot(&mut self, id: EntityId) -> Result<Vec2, SpatialError> {
        let position = self.dots.remove(&id).ok_or(SpatialError::UnknownEntity(id))?;
        self.remove_from(self.dot_range(position), None, id, Kind::Dot);
        Ok(position)
    }

    /// Moves a rect, touching only the blocks that enter or leave its
    /// footprint. Returns whether block membership changed.
    pub fn edit_rect(&mut self, id: EntityId, position: Vec2) -> Result<bool, SpatialError> {
        let old = *self.rects.get(&id).ok_or(SpatialError::UnknownEntity(id))?;
        self.replace_rect(id, old, old.at(position))
    }

    /// Like [`edit_rect`](Self::edit_rect) but may also change the size.
    pub fn reshape_rect(&mut self, id: EntityId, rect: Rect) -> Result<bool, SpatialError> {
        let old = *self.rects.get(&id).ok_or(SpatialError::UnknownEntity(id))?;
        self.replace_rect(id, old, rect)
    }

    fn replace_rect(&mut self, id: EntityId, old: Rect, new: Rect) -> Result<bool, SpatialError> {
        if self.is_rect_outside(&new) {
            return Err(SpatialError::OutOfBounds(id));
        }
        let before = self.rect_range(&old);
        let after = self.rect_range(&new);
        let changed = before != after;
        if changed {
            // Only the symmetric difference of the two footprints is touched.
            self.remove_from(before, after, id, Kind::Rect);
            self.insert_into(after, before, id, Kind::Rect);
        }
        self.rects.insert(id, new);
        Ok(changed)
    }

    pub fn edit_dot(&mut self, id: EntityId, position: Vec2) -> Result<bool, SpatialError> {
        let old = self.dot(id).ok_or(SpatialError::UnknownEntity(id))?;
        if self.is_dot_outside(position) {
            return Err(SpatialError::OutOfBounds(id));
        }
        let before = self.dot_range(old);
        let after = self.dot_range(position);
        let changed = before != after;
        if changed {
            self.remove_from(before, after, id, Kind::Dot);
            self.insert_into(after, before, id, Kind::Dot);
        }
        self.dots.insert(id, position);
        Ok(changed)
    }

    /// Visits every in-bounds block between two block coordinates, inclusive.
    pub fn loop_blocks<F>(&self, min: BlockCoord, max: BlockCoord, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(BlockCoord, &Block) -> ControlFlow<()>,
    {
        let Some((min, max)) = self.clamp_range(min, max) else {
            return ControlFlow::Continue(());
        };
        for coord in cells(min, max) {
            visit(coord, self.block(coord))?;
        }
        ControlFlow::Continue(())
    }

    pub fn loop_pixels<F>(&self, from: Vec2, to: Vec2, visit: F) -> ControlFlow<()>
    where
        F: FnMut(BlockCoord, &Block) -> ControlFlow<()>,
    {
        self.loop_blocks(self.pixel_to_block(from), self.pixel_to_block(to), visit)
    }

    pub fn loop_rect<F>(&self, rect: &Rect, visit: F) -> ControlFlow<()>
    where
        F: FnMut(BlockCoord, &Block) -> ControlFlow<()>,
    {
        self.loop_pixels(
            rect.position,
            Vec2::new(rect.discrete_x2(), rect.discrete_y2()),
            visit,
        )
    }

    pub fn loop_dot<F>(&self, position: Vec2, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(BlockCoord, &Block) -> ControlFlow<()>,
    {
        match self.dot_range(position) {
            Some((coord, _)) => visit(coord, self.block(coord)),
            None => ControlFlow::Continue(()),
        }
    }

    /// Visits each registered rect that geometrically overlaps `rect`, once.
    pub fn loop_rect_collide_with_rect<F>(&self, rect: &Rect, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(EntityId, &Rect) -> ControlFlow<()>,
    {
        let mut seen = BTreeSet::new();
        self.loop_rect(rect, |_, block| {
            for id in block.rects() {
                if !seen.insert(id) {
                    continue;
                }
                match self.rects.get(&id) {
                    Some(other) if rect.collides_with(other) => visit(id, other)?,
                    _ => {}
                }
            }
            ControlFlow::Continue(())
        })
    }

    pub fn loop_dot_collide_with_rect<F>(&self, position: Vec2, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(EntityId, &Rect) -> ControlFlow<()>,
    {
        self.loop_dot(position, |_, block| {
            for id in block.rects() {
                match self.rects.get(&id) {
                    Some(other) if other.contains(position) => visit(id, other)?,
                    _ => {}
                }
            }
            ControlFlow::Continue(())
        })
    }

    pub fn loop_rect_collide_with_dot<F>(&self, rect: &Rect, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(EntityId, Vec2) -> ControlFlow<()>,
    {
        self.loop_rect(rect, |_, block| {
            for id in block.dots() {
                match self.dot(id) {
                    Some(position) if rect.contains(position) => visit(id, position)?,
                    _ => {}
                }
            }
            ControlFlow::Continue(())
        })
    }

    pub fn rects_colliding_with(&self, rect: &Rect) -> Vec<EntityId> {
        let mut found = Vec::new();
        let _ = self.loop_rect_collide_with_rect(rect, |id, _| {
            found.push(id);
            ControlFlow::Continue(())
        });
        found
    }

    pub fn rects_containing(&self, position: Vec2) -> Vec<EntityId> {
        let mut found = Vec::new();
        let _ = self.loop_dot_collide_with_rect(position, |id, _| {
            found.push(id);
            ControlFlow::Continue(())
        });
        found
    }

    pub fn dots_inside(&self, rect: &Rect) -> Vec<EntityId> {
        let mut found = Vec::new();
        let _ = self.loop_rect_collide_with_dot(rect, |id, _| {
            found.push(id);
            ControlFlow::Continue(())
        });
        found
    }
}
