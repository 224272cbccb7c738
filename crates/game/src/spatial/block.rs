use std::collections::BTreeSet;

use glam::IVec2;

use super::EntityId;

pub type BlockCoord = IVec2;

/// Ids of the entities whose footprint overlaps one grid cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub(super) dots: BTreeSet<EntityId>,
    pub(super) rects: BTreeSet<EntityId>,
}

// Returned for every read of a cell that holds nothing.
pub(super) static EMPTY_BLOCK: Block = Block {
    dots: BTreeSet::new(),
    rects: BTreeSet::new(),
};

impl Block {
    pub fn is_empty(&self) -> bool {
        self.dots.is_empty() && self.rects.is_empty()
    }

    pub fn dots(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.dots.iter().copied()
    }

    pub fn rects(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.rects.iter().copied()
    }

    pub fn has_dot(&self, id: EntityId) -> bool {
        self.dots.contains(&id)
    }

    pub fn has_rect(&self, id: EntityId) -> bool {
        self.rects.contains(&id)
    }
}
