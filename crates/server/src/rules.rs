use std::collections::BTreeMap;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kaze::scene::{RectEntity, Scene, SceneHooks};
use kaze::spatial::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub kills: u32,
    pub deaths: u32,
}

/// Duel rules: hits cost hp, dropping below zero respawns the victim at a
/// random spot and refills the attacker.
#[derive(Debug)]
pub struct DuelRules {
    rng: StdRng,
    spawn_area: f32,
    tallies: BTreeMap<EntityId, Tally>,
    hits: u64,
}

impl DuelRules {
    pub fn new(seed: u64, spawn_area: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spawn_area,
            tallies: BTreeMap::new(),
            hits: 0,
        }
    }

    pub fn tally(&self, id: EntityId) -> Tally {
        self.tallies.get(&id).copied().unwrap_or_default()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn random_position(&mut self, size: Vec2) -> Vec2 {
        let span = (Vec2::splat(self.spawn_area) - size - 1.0).max(Vec2::ZERO);
        Vec2::new(
            self.rng.random_range(0.0..=span.x),
            self.rng.random_range(0.0..=span.y),
        )
    }

    fn damage(&mut self, scene: &mut Scene, victim: EntityId, attacker: EntityId, amount: i32) {
        self.hits += 1;
        let Some(character) = scene.character_mut(victim) else {
            return;
        };
        character.hp -= amount;
        if character.hp >= 0 {
            return;
        }
        character.hp = character.max_hp;
        let size = character.config.size;

        self.tallies.entry(victim).or_default().deaths += 1;
        if attacker != victim {
            self.tallies.entry(attacker).or_default().kills += 1;
            if let Some(owner) = scene.character_mut(attacker) {
                owner.hp = owner.max_hp;
            }
        }

        let position = self.random_position(size);
        if let Err(err) = scene.place_rect(victim, position) {
            log::warn!("could not respawn {victim}: {err}");
        }
        log::info!("{victim} was taken down by {attacker}");
    }
}

impl SceneHooks for DuelRules {
    fn on_character_bullet_hit(&mut self, scene: &mut Scene, character: EntityId, bullet: EntityId) -> bool {
        let Some(bullet) = scene.bullet(bullet) else {
            return false;
        };
        let owner = bullet.owner;
        let damage = scene.armory().weapon(bullet.weapon).map_or(0, |w| w.damage);
        self.damage(scene, character, owner, damage);
        true
    }

    fn on_character_explosion_hit(&mut self, scene: &mut Scene, character: EntityId, explosion: EntityId) {
        let Some(RectEntity::Explosion(explosion)) = scene.entity(explosion) else {
            return;
        };
        let owner = explosion.owner;
        let damage = scene
            .armory()
            .explosion(explosion.explosion_type)
            .map_or(0, |t| t.damage);
        self.damage(scene, character, owner, damage);
    }
}
