use std::f32::consts::TAU;

use glam::Vec2;

use super::collision::Movement;
use super::entity::{EntityKind, RectEntity, SolidType, Teleporter};
use super::event::{RemovalReason, SceneEvent};
use super::hooks::SceneHooks;
use super::weapon::ExplosionTypeId;
use super::{Scene, SceneError};
use crate::math::{Rect, Vec2Ext};
use crate::spatial::{EntityId, SpatialError};

impl Scene {
    /// Advances the scene by `dt` ms. Bullets move first, then every rect,
    /// each over the ids alive when its phase began. Returns `true` once
    /// the scene has been asked to finish.
    pub fn update<H: SceneHooks + ?Sized>(&mut self, hooks: &mut H, dt: f32) -> Result<bool, SceneError> {
        hooks.on_update(self, dt);
        self.apply_inputs();

        let bullets: Vec<EntityId> = self.bullets.keys().copied().collect();
        for id in bullets {
            self.update_bullet(hooks, id, dt)?;
        }

        let rects: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in rects {
            let Some(kind) = self.entities.get(&id).map(RectEntity::kind) else {
                continue;
            };
            match kind {
                EntityKind::Character => self.update_character(hooks, id, dt)?,
                EntityKind::Networked => self.update_networked(id, dt)?,
                EntityKind::Explosion => self.update_explosion(hooks, id, dt)?,
                EntityKind::Thing | EntityKind::Teleporter => {}
            }
        }

        self.elapsed += dt;
        Ok(self.finished)
    }

    fn apply_inputs(&mut self) {
        for pending in self.inputs.drain() {
            match self.character_mut(pending.entity_id) {
                Some(character) => character.controls = pending.input,
                None => log::debug!("dropping input for unknown character {}", pending.entity_id),
            }
        }
    }

    fn update_bullet<H: SceneHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: EntityId,
        dt: f32,
    ) -> Result<(), SceneError> {
        let Some(bullet) = self.bullets.get_mut(&id) else {
            return Ok(());
        };
        bullet.lifetime -= dt;
        let (expired, owner, velocity) = (bullet.lifetime < 0.0, bullet.owner, bullet.velocity);

        let from = self.grid.dot(id).ok_or(SpatialError::UnknownEntity(id))?;
        let to = from + velocity * dt;
        // An expiring bullet bursts where it is, not where it would land.
        if expired {
            return self.destroy_bullet(id, RemovalReason::Expired);
        }
        if self.grid.is_dot_outside(to) {
            return self.destroy_bullet(id, RemovalReason::OutOfBounds);
        }
        if self.resolver().path_crosses_barrier(from, to) {
            return self.destroy_bullet(id, RemovalReason::Barrier);
        }
        self.grid.edit_dot(id, to)?;

        // Hits are tested at the new position only.
        for target in self.grid.rects_containing(to) {
            let Some(entity) = self.entities.get(&target) else {
                continue;
            };
            if entity.is_off() {
                continue;
            }
            let consumed = match entity.kind() {
                EntityKind::Character if target != owner => {
                    hooks.on_character_bullet_hit(self, target, id)
                }
                EntityKind::Networked if target != owner => {
                    hooks.on_net_character_bullet_hit(self, target, id)
                }
                EntityKind::Thing => entity.solid() == SolidType::BlockAll,
                _ => false,
            };
            // A hook may already have removed the bullet.
            if !self.bullets.contains_key(&id) {
                break;
            }
            if consumed {
                self.destroy_bullet(id, RemovalReason::Hit(target))?;
                break;
            }
        }
        Ok(())
    }

    fn update_character<H: SceneHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: EntityId,
        dt: f32,
    ) -> Result<(), SceneError> {
        // Rect before moving; the resolver sweeps from here.
        let rect = self.rect_of(id)?;
        let friction = self.config.friction_accel_mag;
        let Some(character) = self.character_mut(id) else {
            return Ok(());
        };
        if character.off {
            return Ok(());
        }
        character.apply_controls();
        character.rotate_aim(dt);
        character.update_velocity(friction, dt);
        let delta = character.move_delta(dt);
        let wrap = character.config.wrap_map;

        let movement = if wrap {
            Movement {
                position: self.wrapped(&rect, delta),
                ..Movement::default()
            }
        } else {
            self.resolver().resolve(id, &rect, delta)
        };
        self.grid.edit_rect(id, movement.position)?;

        let bounce = self.config.bounce_multiplier;
        if let Some(character) = self.character_mut(id) {
            character.bounce(movement.blocked_x, movement.blocked_y, bounce);
        }
        for thing in movement.things {
            hooks.on_character_thing_collision(self, id, thing);
        }
        // The hook is free to remove the character.
        if self.character(id).is_none() {
            return Ok(());
        }

        self.resolve_teleport(id)?;
        self.update_firing(id, dt)
    }

    /// Moves by `delta` and re-enters from the opposite side of any finite
    /// axis the rect left.
    fn wrapped(&self, rect: &Rect, delta: Vec2) -> Vec2 {
        let wrap = |p: f32, size: f32, bound: Option<f32>| match bound {
            Some(b) if p + size > b => 0.0,
            Some(b) if p < 0.0 => (b - size).max(0.0),
            _ => p,
        };
        let moved = rect.position + delta;
        Vec2::new(
            wrap(moved.x, rect.size.x, self.grid.pixel_width()),
            wrap(moved.y, rect.size.y, self.grid.pixel_height()),
        )
    }

    /// Carries a character that just entered a linked teleporter to the
    /// centre of its destination.
    fn resolve_teleport(&mut self, id: EntityId) -> Result<(), SceneError> {
        let rect = self.rect_of(id)?;
        let touching: Vec<EntityId> = self
            .grid
            .rects_colliding_with(&rect)
            .into_iter()
            .filter(|other| matches!(self.entities.get(other), Some(RectEntity::Teleporter(_))))
            .filter(|other| self.grid.rect(*other).is_some_and(|r| r.overlaps(&rect)))
            .collect();

        let Some(character) = self.character_mut(id) else {
            return Ok(());
        };
        // Still standing on the pad it arrived at; wait until it steps off.
        match character.inside_teleporter {
            Some(current) if touching.contains(&current) => return Ok(()),
            _ => character.inside_teleporter = None,
        }

        let link = touching.iter().find_map(|from| match self.entities.get(from) {
            Some(RectEntity::Teleporter(Teleporter { link: Some(to), .. })) => Some((*from, *to)),
            _ => None,
        });
        let Some((from, to)) = link else {
            return Ok(());
        };

        let target = self.rect_of(to)?;
        let landing = self.clamp_into_bounds(Rect::centered(target.center(), rect.size));
        self.grid.edit_rect(id, landing.position)?;
        if let Some(character) = self.character_mut(id) {
            character.inside_teleporter = Some(to);
        }
        log::debug!("{id} teleported from {from} to {to}");
        self.push_event(SceneEvent::Teleported { id, from, to });
        Ok(())
    }

    fn update_firing(&mut self, id: EntityId, dt: f32) -> Result<(), SceneError> {
        let Some(RectEntity::Character(character)) = self.entities.get_mut(&id) else {
            return Ok(());
        };
        let Some(weapon_id) = character.current_weapon() else {
            return Ok(());
        };
        let weapon = self
            .armory
            .weapon(weapon_id)
            .ok_or(SceneError::UnknownWeapon(weapon_id))?;

        let was_prefiring = character.firing.is_prefiring();
        let (wants_fire, moving) = (character.fire, character.is_moving());
        let shoot = character.firing.step(weapon, wants_fire, moving, dt);
        let prefiring = character.firing.is_prefiring();
        let velocity = character.aim * weapon.speed;

        if prefiring != was_prefiring {
            self.push_event(SceneEvent::PrefireChanged { id, prefiring });
        }
        if shoot {
            let origin = self.rect_of(id)?.center();
            self.spawn_bullet(id, weapon_id, origin, velocity, false)?;
        }
        Ok(())
    }

    fn update_networked(&mut self, id: EntityId, dt: f32) -> Result<(), SceneError> {
        let Some(character) = self.networked_mut(id) else {
            return Ok(());
        };
        if character.off {
            return Ok(());
        }
        let Some(position) = character.advance(dt)? else {
            return Ok(());
        };
        let rect = self.clamp_into_bounds(self.rect_of(id)?.at(position));
        self.grid.edit_rect(id, rect.position)?;
        Ok(())
    }

    fn update_explosion<H: SceneHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        id: EntityId,
        dt: f32,
    ) -> Result<(), SceneError> {
        let Some(RectEntity::Explosion(explosion)) = self.entities.get_mut(&id) else {
            return Ok(());
        };
        let (owner, type_id, replicated) = (explosion.owner, explosion.explosion_type, explosion.replicated);
        let first_tick = !explosion.detonated;
        explosion.detonated = true;

        if first_tick && !replicated {
            self.release_fragments(id, owner, type_id)?;
        }

        let rect = self.rect_of(id)?;
        for target in self.grid.rects_colliding_with(&rect) {
            let kind = match self.entities.get(&target) {
                Some(entity) if !entity.is_off() => entity.kind(),
                _ => continue,
            };
            if !matches!(kind, EntityKind::Character | EntityKind::Networked) {
                continue;
            }
            // Lingering explosions hurt each character once.
            let first_hit = match self.entities.get_mut(&id) {
                Some(RectEntity::Explosion(explosion)) => explosion.hit.insert(target),
                _ => return Ok(()),
            };
            if !first_hit {
                continue;
            }
            if kind == EntityKind::Character {
                hooks.on_character_explosion_hit(self, target, id);
            } else {
                hooks.on_net_character_explosion_hit(self, target, id);
            }
        }

        let expired = match self.entities.get_mut(&id) {
            Some(RectEntity::Explosion(explosion)) => {
                explosion.lifetime -= dt;
                explosion.lifetime <= 0.0
            }
            _ => return Ok(()),
        };
        if expired {
            self.remove_entity(id)?;
        }
        Ok(())
    }

    /// `count` bullets per fragment, evenly spread over a full turn from the
    /// explosion's centre.
    fn release_fragments(
        &mut self,
        id: EntityId,
        owner: EntityId,
        type_id: ExplosionTypeId,
    ) -> Result<(), SceneError> {
        let fragments = self
            .armory
            .explosion(type_id)
            .ok_or(SceneError::UnknownExplosionType(type_id))?
            .fragments
            .clone();
        let center = self.rect_of(id)?.center();
        for fragment in fragments {
            let speed = self
                .armory
                .weapon(fragment.weapon)
                .ok_or(SceneError::UnknownWeapon(fragment.weapon))?
                .speed;
            for i in 0..fragment.count {
                let angle = i as f32 * TAU / fragment.count as f32;
                let velocity = Vec2::X.rotated(angle) * speed;
                self.spawn_bullet(owner, fragment.weapon, center, velocity, false)?;
            }
        }
        Ok(())
    }
}
