use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::character::{Character, NetworkedCharacter};
use super::weapon::{ExplosionTypeId, WeaponId};
use crate::spatial::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolidType {
    #[default]
    NotSolid,
    /// Stops characters and bullets.
    BlockAll,
    /// Stops characters only.
    BlockCharacter,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thing {
    pub solid: SolidType,
    pub sprite: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Teleporter {
    pub name: String,
    pub link: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub owner: EntityId,
    pub explosion_type: ExplosionTypeId,
    pub lifetime: f32,
    pub detonated: bool,
    /// Mirrors a remote explosion. Never fragments locally.
    pub replicated: bool,
    pub hit: BTreeSet<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub owner: EntityId,
    pub weapon: WeaponId,
    pub velocity: Vec2,
    pub lifetime: f32,
    pub replicated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Character,
    Networked,
    Thing,
    Explosion,
    Teleporter,
}

/// Non-geometric state of every rect in the scene. Geometry lives in the
/// spatial hash under the same id.
#[derive(Debug, Clone)]
pub enum RectEntity {
    Character(Box<Character>),
    Networked(Box<NetworkedCharacter>),
    Thing(Thing),
    Explosion(Explosion),
    Teleporter(Teleporter),
}

impl RectEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            RectEntity::Character(_) => EntityKind::Character,
            RectEntity::Networked(_) => EntityKind::Networked,
            RectEntity::Thing(_) => EntityKind::Thing,
            RectEntity::Explosion(_) => EntityKind::Explosion,
            RectEntity::Teleporter(_) => EntityKind::Teleporter,
        }
    }

    /// Characters switched off are neither simulated nor hittable.
    pub fn is_off(&self) -> bool {
        match self {
            RectEntity::Character(c) => c.off,
            RectEntity::Networked(c) => c.off,
            _ => false,
        }
    }

    pub fn solid(&self) -> SolidType {
        match self {
            RectEntity::Thing(thing) => thing.solid,
            _ => SolidType::NotSolid,
        }
    }
}
