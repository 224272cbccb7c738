use super::Scene;
use crate::spatial::EntityId;

/// Gameplay consequences the scene leaves to the embedding application.
///
/// Every method has a no-op default. Hooks receive the whole scene and may
/// mutate it freely; the update loop re-checks that entities still exist
/// after each call.
pub trait SceneHooks {
    /// Runs at the start of every tick, before any input is applied.
    fn on_update(&mut self, _scene: &mut Scene, _dt: f32) {}

    /// Return `true` to consume the bullet.
    fn on_character_bullet_hit(
        &mut self,
        _scene: &mut Scene,
        _character: EntityId,
        _bullet: EntityId,
    ) -> bool {
        false
    }

    /// Return `true` to consume the bullet.
    fn on_net_character_bullet_hit(
        &mut self,
        _scene: &mut Scene,
        _character: EntityId,
        _bullet: EntityId,
    ) -> bool {
        false
    }

    fn on_character_explosion_hit(
        &mut self,
        _scene: &mut Scene,
        _character: EntityId,
        _explosion: EntityId,
    ) {
    }

    fn on_net_character_explosion_hit(
        &mut self,
        _scene: &mut Scene,
        _character: EntityId,
        _explosion: EntityId,
    ) {
    }

    fn on_character_thing_collision(
        &mut self,
        _scene: &mut Scene,
        _character: EntityId,
        _thing: EntityId,
    ) {
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl SceneHooks for NoHooks {}
