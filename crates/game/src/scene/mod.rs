mod character;
mod collision;
mod config;
mod entity;
mod event;
mod firing;
mod hooks;
mod map;
mod update;
mod view;
mod weapon;

pub use character::{Character, CharacterPartial, NetworkedCharacter};
pub use collision::Movement;
pub use config::{CharacterConfig, SceneConfig};
pub use entity::{Bullet, EntityKind, Explosion, RectEntity, SolidType, Teleporter, Thing};
pub use event::{RemovalReason, SceneEvent};
pub use firing::{FiringStage, FiringState};
pub use hooks::{NoHooks, SceneHooks};
pub use map::{BarrierType, MapContent, MapError, MapFile, Marker, TileGrid, TileSampler};
pub use view::{BulletView, EntityView, TileView, Viewport};
pub use weapon::{
    Armory, ArmoryError, BulletShape, ExplosionType, ExplosionTypeId, Fragment, StandardLoadout,
    Weapon, WeaponId, is_valid_size, standard_armory,
};

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;

use crate::math::Rect;
use crate::net::{ControlInput, InterpolationError};
use crate::simulation::InputBuffer;
use crate::spatial::{EntityId, SpatialError, SpatialHash};
use collision::Resolver;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error(transparent)]
    Armory(#[from] ArmoryError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("entity {id} is not a {expected:?}")]
    WrongKind { id: EntityId, expected: EntityKind },
    #[error("{0} is not in the armory")]
    UnknownWeapon(WeaponId),
    #[error("{0} is not in the armory")]
    UnknownExplosionType(ExplosionTypeId),
    #[error("rect size {0} must be positive and finite")]
    InvalidSize(Vec2),
}

/// The simulated world: every entity, the spatial index over them and the
/// rules that advance them one tick at a time.
#[derive(Debug)]
pub struct Scene {
    grid: SpatialHash,
    config: SceneConfig,
    armory: Armory,
    tiles: Option<TileSampler>,
    entities: BTreeMap<EntityId, RectEntity>,
    bullets: BTreeMap<EntityId, Bullet>,
    inputs: InputBuffer,
    events: VecDeque<SceneEvent>,
    elapsed: f32,
    finished: bool,
}

impl Scene {
    pub fn new(config: SceneConfig, armory: Armory) -> Result<Self, SceneError> {
        let grid = SpatialHash::new(config.block_width, config.block_height, config.block_length)?;
        Ok(Self {
            grid,
            inputs: InputBuffer::new(config.input_buffer_size),
            events: VecDeque::new(),
            config,
            armory,
            tiles: None,
            entities: BTreeMap::new(),
            bullets: BTreeMap::new(),
            elapsed: 0.0,
            finished: false,
        })
    }

    /// Sizes the scene to the map, uses its barrier and floor layers, and
    /// spawns its teleporter markers. Returns marker names to entity ids.
    pub fn from_map(
        mut config: SceneConfig,
        armory: Armory,
        map: &MapFile,
    ) -> Result<(Self, BTreeMap<String, EntityId>), SceneError> {
        let content = &map.map_content;
        config.block_width = Some(content.block_width);
        config.block_height = Some(content.block_height);
        let mut scene = Self::new(config, armory)?;
        scene.tiles = Some(TileSampler::region(TileGrid::from_map(map)?));
        let markers = scene.spawn_teleporters(content)?;
        log::info!(
            "loaded map `{}` ({}x{} blocks, {} markers)",
            content.name,
            content.block_width,
            content.block_height,
            markers.len()
        );
        Ok((scene, markers))
    }

    pub fn set_tiles(&mut self, tiles: Option<TileSampler>) {
        self.tiles = tiles;
    }

    pub fn tiles(&self) -> Option<&TileSampler> {
        self.tiles.as_ref()
    }

    pub fn grid(&self) -> &SpatialHash {
        &self.grid
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn armory(&self) -> &Armory {
        &self.armory
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn entity(&self, id: EntityId) -> Option<&RectEntity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &RectEntity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn rect_of(&self, id: EntityId) -> Result<Rect, SceneError> {
        self.grid
            .rect(id)
            .copied()
            .ok_or(SceneError::UnknownEntity(id))
    }

    pub fn character(&self, id: EntityId) -> Option<&Character> {
        match self.entities.get(&id) {
            Some(RectEntity::Character(c)) => Some(&**c),
            _ => None,
        }
    }

    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        match self.entities.get_mut(&id) {
            Some(RectEntity::Character(c)) => Some(&mut **c),
            _ => None,
        }
    }

    pub fn networked(&self, id: EntityId) -> Option<&NetworkedCharacter> {
        match self.entities.get(&id) {
            Some(RectEntity::Networked(c)) => Some(&**c),
            _ => None,
        }
    }

    pub fn networked_mut(&mut self, id: EntityId) -> Option<&mut NetworkedCharacter> {
        match self.entities.get_mut(&id) {
            Some(RectEntity::Networked(c)) => Some(&mut **c),
            _ => None,
        }
    }

    pub fn characters(&self) -> impl Iterator<Item = (EntityId, &Character)> {
        self.entities.iter().filter_map(|(id, entity)| match entity {
            RectEntity::Character(c) => Some((*id, &**c)),
            _ => None,
        })
    }

    pub fn bullet(&self, id: EntityId) -> Option<&Bullet> {
        self.bullets.get(&id)
    }

    pub fn bullets(&self) -> impl Iterator<Item = (EntityId, &Bullet)> {
        self.bullets.iter().map(|(id, bullet)| (*id, bullet))
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            grid: &self.grid,
            tiles: self.tiles.as_ref(),
            entities: &self.entities,
        }
    }

    // Least shift that puts `rect` inside finite bounds. Anything larger
    // than the map is first cut down to it.
    fn clamp_into_bounds(&self, rect: Rect) -> Rect {
        let clamp = |p: f32, size: f32, bound: Option<f32>| match bound {
            Some(b) => {
                let size = size.min(b);
                (p.clamp(0.0, b - size), size)
            }
            None => (p, size),
        };
        let (x, width) = clamp(rect.position.x, rect.size.x, self.grid.pixel_width());
        let (y, height) = clamp(rect.position.y, rect.size.y, self.grid.pixel_height());
        Rect::new(Vec2::new(x, y), Vec2::new(width, height))
    }

    fn register(&mut self, rect: Rect, entity: RectEntity) -> Result<EntityId, SceneError> {
        if !is_valid_size(rect.size) {
            return Err(SceneError::InvalidSize(rect.size));
        }
        let id = self.grid.allocate_id();
        self.grid.register_rect(id, rect)?;
        log::debug!("spawned {:?} {id}", entity.kind());
        self.entities.insert(id, entity);
        Ok(id)
    }

    pub fn spawn_character(
        &mut self,
        character: Character,
        position: Vec2,
    ) -> Result<EntityId, SceneError> {
        let rect = Rect::new(position, character.config.size);
        self.register(rect, RectEntity::Character(Box::new(character)))
    }

    /// Registered at the origin; the first snapshot moves it into place.
    pub fn spawn_networked(
        &mut self,
        character: NetworkedCharacter,
        size: Vec2,
    ) -> Result<EntityId, SceneError> {
        self.register(Rect::new(Vec2::ZERO, size), RectEntity::Networked(Box::new(character)))
    }

    pub fn spawn_thing(&mut self, thing: Thing, rect: Rect) -> Result<EntityId, SceneError> {
        self.register(rect, RectEntity::Thing(thing))
    }

    pub fn spawn_teleporter(&mut self, name: &str, rect: Rect) -> Result<EntityId, SceneError> {
        self.register(
            rect,
            RectEntity::Teleporter(Teleporter {
                name: name.to_string(),
                link: None,
            }),
        )
    }

    pub fn link_teleporter(&mut self, from: EntityId, to: EntityId) -> Result<(), SceneError> {
        if !matches!(self.entities.get(&to), Some(RectEntity::Teleporter(_))) {
            return Err(SceneError::WrongKind {
                id: to,
                expected: EntityKind::Teleporter,
            });
        }
        match self.entities.get_mut(&from) {
            Some(RectEntity::Teleporter(teleporter)) => {
                teleporter.link = Some(to);
                Ok(())
            }
            _ => Err(SceneError::WrongKind {
                id: from,
                expected: EntityKind::Teleporter,
            }),
        }
    }

    /// One block-sized teleporter per marker, joined along marker links.
    pub fn spawn_teleporters(
        &mut self,
        content: &MapContent,
    ) -> Result<BTreeMap<String, EntityId>, SceneError> {
        content.validate()?;
        let length = self.grid.block_length();
        let mut ids = BTreeMap::new();
        for (name, marker) in &content.markers {
            let position = Vec2::new(marker.x as f32, marker.y as f32) * length;
            let id = self.spawn_teleporter(name, Rect::new(position, Vec2::splat(length)))?;
            ids.insert(name.clone(), id);
        }
        for (name, marker) in &content.markers {
            let Some(link) = &marker.link else { continue };
            // Both names were checked by `validate`.
            if let (Some(from), Some(to)) = (ids.get(name), ids.get(link)) {
                self.link_teleporter(*from, *to)?;
            }
        }
        Ok(ids)
    }

    /// Spawns an explosion centred on `center`, pushed inside the map if it
    /// would hang over an edge.
    pub fn spawn_explosion(
        &mut self,
        owner: EntityId,
        explosion_type: ExplosionTypeId,
        center: Vec2,
        replicated: bool,
    ) -> Result<EntityId, SceneError> {
        let template = self
            .armory
            .explosion(explosion_type)
            .ok_or(SceneError::UnknownExplosionType(explosion_type))?;
        let rect = self.clamp_into_bounds(Rect::centered(center, template.size));
        let explosion = Explosion {
            owner,
            explosion_type,
            lifetime: template.lifetime,
            detonated: false,
            replicated,
            hit: BTreeSet::new(),
        };
        let id = self.register(rect, RectEntity::Explosion(explosion))?;
        self.push_event(SceneEvent::ExplosionSpawned {
            id,
            owner,
            explosion_type,
        });
        Ok(id)
    }

    pub fn spawn_bullet(
        &mut self,
        owner: EntityId,
        weapon: WeaponId,
        position: Vec2,
        velocity: Vec2,
        replicated: bool,
    ) -> Result<EntityId, SceneError> {
        let lifetime = self
            .armory
            .weapon(weapon)
            .ok_or(SceneError::UnknownWeapon(weapon))?
            .lifetime;
        let id = self.grid.allocate_id();
        self.grid.register_dot(id, position)?;
        self.bullets.insert(
            id,
            Bullet {
                owner,
                weapon,
                velocity,
                lifetime,
                replicated,
            },
        );
        self.push_event(SceneEvent::BulletSpawned { id, owner, weapon });
        Ok(id)
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Result<RectEntity, SceneError> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        self.grid.unregister_rect(id)?;
        if let RectEntity::Explosion(_) = entity {
            self.push_event(SceneEvent::ExplosionRemoved { id });
        }
        log::debug!("removed {:?} {id}", entity.kind());
        Ok(entity)
    }

    /// Removes a bullet without triggering its weapon's on-hit explosion.
    pub fn remove_bullet(&mut self, id: EntityId) -> Result<Bullet, SceneError> {
        let bullet = self
            .bullets
            .remove(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        let position = self.grid.unregister_dot(id)?;
        self.push_event(SceneEvent::BulletRemoved {
            id,
            position,
            reason: RemovalReason::Removed,
        });
        Ok(bullet)
    }

    /// Removes a bullet and chains into its weapon's on-hit explosion.
    /// Replicated bullets never chain; their explosions arrive separately.
    pub fn destroy_bullet(&mut self, id: EntityId, reason: RemovalReason) -> Result<(), SceneError> {
        let bullet = self
            .bullets
            .remove(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        let position = self.grid.unregister_dot(id)?;
        self.push_event(SceneEvent::BulletRemoved {
            id,
            position,
            reason,
        });
        if bullet.replicated {
            return Ok(());
        }
        let on_hit = self
            .armory
            .weapon(bullet.weapon)
            .ok_or(SceneError::UnknownWeapon(bullet.weapon))?
            .on_hit;
        if let Some(explosion) = on_hit {
            self.spawn_explosion(bullet.owner, explosion, position, false)?;
        }
        Ok(())
    }

    /// Teleports a rect, e.g. to respawn a character. The position is
    /// clamped into the map.
    pub fn place_rect(&mut self, id: EntityId, position: Vec2) -> Result<(), SceneError> {
        let rect = self.clamp_into_bounds(self.rect_of(id)?.at(position));
        self.grid.edit_rect(id, rect.position)?;
        Ok(())
    }

    pub fn queue_input(&mut self, id: EntityId, input: ControlInput) {
        self.inputs.push(id, input);
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    fn push_event(&mut self, event: SceneEvent) {
        if self.events.len() >= self.config.event_capacity.max(1) {
            log::debug!("scene event queue full, dropping oldest event");
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> (Scene, StandardLoadout) {
        let (armory, loadout) = standard_armory().unwrap();
        (Scene::new(SceneConfig::default(), armory).unwrap(), loadout)
    }

    #[test]
    fn explosion_is_pushed_inside_map() {
        let (mut scene, loadout) = scene();
        let owner = EntityId(99);
        let id = scene
            .spawn_explosion(owner, loadout.boom, Vec2::new(5.0, 495.0), false)
            .unwrap();
        let rect = scene.rect_of(id).unwrap();
        assert_eq!(rect.position, Vec2::new(0.0, 440.0));
    }

    #[test]
    fn oversized_explosion_is_cut_to_the_map() {
        let mut armory = Armory::new();
        let huge = armory
            .add_explosion(ExplosionType {
                size: Vec2::splat(2000.0),
                ..ExplosionType::default()
            })
            .unwrap();
        let shell = armory
            .add_weapon(Weapon {
                on_hit: Some(huge),
                ..Weapon::default()
            })
            .unwrap();
        let mut scene = Scene::new(SceneConfig::default(), armory).unwrap();
        let bullet = scene
            .spawn_bullet(EntityId(1), shell, Vec2::new(250.0, 250.0), Vec2::ZERO, false)
            .unwrap();
        scene.destroy_bullet(bullet, RemovalReason::Expired).unwrap();

        let (id, _) = scene
            .entities()
            .find(|(_, e)| e.kind() == EntityKind::Explosion)
            .unwrap();
        let rect = scene.rect_of(id).unwrap();
        assert_eq!(rect.position, Vec2::ZERO);
        assert_eq!(rect.size, Vec2::splat(500.0));
    }

    #[test]
    fn degenerate_rects_are_not_registered() {
        let (mut scene, _) = scene();
        let config = CharacterConfig {
            size: Vec2::new(0.0, 30.0),
            ..CharacterConfig::default()
        };
        assert!(matches!(
            scene.spawn_character(Character::new("flat", 0, config, Vec::new()), Vec2::ZERO),
            Err(SceneError::InvalidSize(_))
        ));
        assert!(matches!(
            scene.spawn_thing(Thing::default(), Rect::new(Vec2::ZERO, Vec2::splat(f32::NAN))),
            Err(SceneError::InvalidSize(_))
        ));
        assert_eq!(scene.entities().count(), 0);
    }

    #[test]
    fn explosive_bullet_chains_on_destroy() {
        let (mut scene, loadout) = scene();
        let shooter = scene
            .spawn_character(
                Character::new("a", 0, CharacterConfig::default(), vec![loadout.launcher]),
                Vec2::new(100.0, 100.0),
            )
            .unwrap();
        let bullet = scene
            .spawn_bullet(shooter, loadout.launcher, Vec2::new(200.0, 200.0), Vec2::ZERO, false)
            .unwrap();
        scene.destroy_bullet(bullet, RemovalReason::Expired).unwrap();
        assert_eq!(scene.bullets().count(), 0);
        let explosions: Vec<_> = scene
            .entities()
            .filter(|(_, e)| e.kind() == EntityKind::Explosion)
            .collect();
        assert_eq!(explosions.len(), 1);
    }

    #[test]
    fn replicated_bullet_does_not_chain() {
        let (mut scene, loadout) = scene();
        let bullet = scene
            .spawn_bullet(EntityId(1), loadout.launcher, Vec2::new(50.0, 50.0), Vec2::ZERO, true)
            .unwrap();
        scene.destroy_bullet(bullet, RemovalReason::Expired).unwrap();
        assert_eq!(scene.entities().count(), 0);
    }

    #[test]
    fn removing_twice_is_an_error() {
        let (mut scene, _) = scene();
        let id = scene
            .spawn_thing(Thing::default(), Rect::new(Vec2::ZERO, Vec2::splat(10.0)))
            .unwrap();
        scene.remove_entity(id).unwrap();
        assert!(matches!(
            scene.remove_entity(id),
            Err(SceneError::UnknownEntity(_))
        ));
    }

    #[test]
    fn teleporters_follow_marker_links() {
        let mut content = MapContent::empty("pads", 10, 10);
        content.markers.insert(
            "a".to_string(),
            Marker {
                x: 1,
                y: 1,
                link: Some("b".to_string()),
            },
        );
        content.markers.insert("b".to_string(), Marker { x: 8, y: 8, link: None });
        let map = MapFile {
            map_content: content,
            sprite_file_names: Vec::new(),
        };
        let (scene, markers) = Scene::from_map(SceneConfig::default(), Armory::new(), &map).unwrap();
        match scene.entity(markers["a"]) {
            Some(RectEntity::Teleporter(t)) => assert_eq!(t.link, Some(markers["b"])),
            other => panic!("expected teleporter, got {other:?}"),
        }
        assert_eq!(
            scene.rect_of(markers["b"]).unwrap().position,
            Vec2::new(400.0, 400.0)
        );
    }
}
