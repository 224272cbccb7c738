use std::ops::ControlFlow;

use glam::{IVec2, Vec2};

use super::entity::{EntityKind, RectEntity};
use super::map::BarrierType;
use super::weapon::WeaponId;
use super::Scene;
use crate::math::{Rect, Vec2Ext};
use crate::spatial::EntityId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Vec2,
    pub size: Vec2,
}

impl Viewport {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, size }
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.center, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub size: Vec2,
    pub aim_angle: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub sprite: Option<u16>,
    pub prefiring: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletView {
    pub id: EntityId,
    pub owner: EntityId,
    pub weapon: WeaponId,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    pub coord: IVec2,
    pub barrier: BarrierType,
    pub floor: Option<u16>,
}

impl Scene {
    /// Rects overlapping the viewport, in id order. Characters that are off
    /// are left out.
    pub fn visible_entities(&self, view: &Viewport) -> Vec<EntityView> {
        let mut ids = self.grid.rects_colliding_with(&view.rect());
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.entity_view(id))
            .collect()
    }

    fn entity_view(&self, id: EntityId) -> Option<EntityView> {
        let entity = self.entities.get(&id)?;
        if entity.is_off() {
            return None;
        }
        let rect = self.grid.rect(id)?;
        let mut view = EntityView {
            id,
            kind: entity.kind(),
            position: rect.position,
            size: rect.size,
            aim_angle: 0.0,
            hp: 0,
            max_hp: 0,
            sprite: None,
            prefiring: false,
        };
        match entity {
            RectEntity::Character(c) => {
                view.aim_angle = c.aim.angle();
                view.hp = c.hp;
                view.max_hp = c.max_hp;
                view.sprite = Some(u16::from(c.sprite));
                view.prefiring = c.firing.is_prefiring();
            }
            RectEntity::Networked(c) => {
                view.aim_angle = c.aim.angle();
                view.hp = c.hp;
                view.max_hp = c.max_hp;
                view.sprite = Some(u16::from(c.sprite));
                view.prefiring = c.prefiring;
            }
            RectEntity::Thing(thing) => view.sprite = thing.sprite,
            RectEntity::Explosion(explosion) => {
                view.sprite = self
                    .armory
                    .explosion(explosion.explosion_type)
                    .and_then(|t| t.sprite);
            }
            RectEntity::Teleporter(_) => {}
        }
        Some(view)
    }

    pub fn visible_bullets(&self, view: &Viewport) -> Vec<BulletView> {
        let mut ids = self.grid.dots_inside(&view.rect());
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| {
                let bullet = self.bullets.get(&id)?;
                Some(BulletView {
                    id,
                    owner: bullet.owner,
                    weapon: bullet.weapon,
                    position: self.grid.dot(id)?,
                    velocity: bullet.velocity,
                })
            })
            .collect()
    }

    /// Every in-bounds cell under the viewport with its barrier and floor.
    pub fn visible_tiles(&self, view: &Viewport) -> Vec<TileView> {
        let mut tiles = Vec::new();
        let _ = self.grid.loop_rect(&view.rect(), |coord, _| {
            let (barrier, floor) = match &self.tiles {
                Some(sampler) => (sampler.barrier(coord).unwrap_or_default(), sampler.sprite(coord)),
                None => (BarrierType::None, None),
            };
            tiles.push(TileView {
                coord,
                barrier,
                floor,
            });
            ControlFlow::Continue(())
        });
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Armory, Character, CharacterConfig, SceneConfig, Thing};

    #[test]
    fn only_overlapping_entities_are_visible() {
        let mut scene = Scene::new(SceneConfig::default(), Armory::new()).unwrap();
        let near = scene
            .spawn_character(
                Character::new("near", 3, CharacterConfig::default(), Vec::new()),
                Vec2::new(100.0, 100.0),
            )
            .unwrap();
        scene
            .spawn_thing(Thing::default(), Rect::new(Vec2::new(400.0, 400.0), Vec2::splat(20.0)))
            .unwrap();

        let view = Viewport::new(Vec2::new(100.0, 100.0), Vec2::splat(100.0));
        let visible = scene.visible_entities(&view);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, near);
        assert_eq!(visible[0].sprite, Some(3));
        assert_eq!(visible[0].max_hp, 1000);

        if let Some(c) = scene.character_mut(near) {
            c.off = true;
        }
        assert!(scene.visible_entities(&view).is_empty());
    }

    #[test]
    fn tiles_are_clamped_to_the_map() {
        let scene = Scene::new(SceneConfig::default(), Armory::new()).unwrap();
        let view = Viewport::new(Vec2::ZERO, Vec2::splat(100.0));
        let tiles = scene.visible_tiles(&view);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].coord, IVec2::ZERO);
        assert_eq!(tiles[0].barrier, BarrierType::None);
    }
}
