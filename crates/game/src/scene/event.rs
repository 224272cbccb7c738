use glam::Vec2;

use super::weapon::{ExplosionTypeId, WeaponId};
use crate::spatial::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Expired,
    OutOfBounds,
    Barrier,
    Hit(EntityId),
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    BulletSpawned {
        id: EntityId,
        owner: EntityId,
        weapon: WeaponId,
    },
    BulletRemoved {
        id: EntityId,
        position: Vec2,
        reason: RemovalReason,
    },
    ExplosionSpawned {
        id: EntityId,
        owner: EntityId,
        explosion_type: ExplosionTypeId,
    },
    ExplosionRemoved {
        id: EntityId,
    },
    PrefireChanged {
        id: EntityId,
        prefiring: bool,
    },
    Teleported {
        id: EntityId,
        from: EntityId,
        to: EntityId,
    },
}
