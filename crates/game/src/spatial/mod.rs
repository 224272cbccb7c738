mod block;
mod hash;

pub use block::{Block, BlockCoord};
pub use hash::{Dot, SpatialHash};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    #[error("block length must be positive and finite, got {0}")]
    InvalidBlockLength(f32),
    #[error("entity {0} lies outside the grid")]
    OutOfBounds(EntityId),
    #[error("entity {0} is not registered")]
    UnknownEntity(EntityId),
    #[error("entity {0} is already registered")]
    AlreadyRegistered(EntityId),
}
