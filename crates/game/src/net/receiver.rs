use std::collections::BTreeMap;

use super::ProtocolError;
use super::admin::{AdminMessage, CharacterInit};
use super::protocol::{Message, MessageKind, peek_kind, quick_entity_id};
use crate::scene::{
    CharacterConfig, ExplosionTypeId, NetworkedCharacter, Scene, SceneError, WeaponId,
};
use crate::spatial::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("server character {0} is unknown")]
    UnknownCharacter(u32),
    #[error("unknown weapon id {0}")]
    UnknownWeapon(u8),
    #[error("unknown explosion type id {0}")]
    UnknownExplosionType(u8),
    #[error("{0:?} frames are not expected here")]
    UnexpectedMessage(MessageKind),
}

/// Client side of replication. Mirrors the server's characters as
/// [`NetworkedCharacter`]s and replays spawns into a local scene.
#[derive(Debug, Clone)]
pub struct Receiver {
    template: CharacterConfig,
    characters: BTreeMap<u32, EntityId>,
    player_id: Option<u32>,
    ready: bool,
}

impl Receiver {
    /// `template` supplies size and max hp for every mirrored character.
    pub fn new(template: CharacterConfig) -> Self {
        Self {
            template,
            characters: BTreeMap::new(),
            player_id: None,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    pub fn player_entity(&self) -> Option<EntityId> {
        self.player_id.and_then(|id| self.local_id(id))
    }

    pub fn local_id(&self, server_id: u32) -> Option<EntityId> {
        self.characters.get(&server_id).copied()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn apply_admin_json(
        &mut self,
        scene: &mut Scene,
        text: &str,
    ) -> Result<Option<AdminMessage>, ReceiveError> {
        let message = AdminMessage::from_json(text)?;
        self.apply_admin(scene, message)
    }

    /// Applies a JSON-channel message. Returns the reply owed to the server,
    /// if any.
    pub fn apply_admin(
        &mut self,
        scene: &mut Scene,
        message: AdminMessage,
    ) -> Result<Option<AdminMessage>, ReceiveError> {
        match message {
            AdminMessage::GameState {
                characters,
                player_id,
            } => {
                for character in &characters {
                    self.add_character(scene, character)?;
                }
                self.player_id = Some(player_id);
                self.ready = true;
                log::info!("game state received, {} characters", characters.len());
                Ok(Some(AdminMessage::GameStateDone))
            }
            AdminMessage::AddChar { character } => {
                self.add_character(scene, &character)?;
                Ok(None)
            }
            AdminMessage::DeleteChar { character } => {
                let local = self
                    .characters
                    .remove(&character.id)
                    .ok_or(ReceiveError::UnknownCharacter(character.id))?;
                scene.remove_entity(local)?;
                log::info!("{} left", character.name);
                Ok(None)
            }
            other @ (AdminMessage::JoinGame { .. } | AdminMessage::GameStateDone) => {
                log::warn!("ignoring server-bound admin message {other:?}");
                Ok(None)
            }
        }
    }

    fn add_character(&mut self, scene: &mut Scene, init: &CharacterInit) -> Result<(), ReceiveError> {
        if self.characters.contains_key(&init.id) {
            log::debug!("character {} announced twice", init.id);
            return Ok(());
        }
        let character = NetworkedCharacter::new(
            init.id,
            init.name.clone(),
            init.sprite,
            self.template.max_hp,
            scene.config().interpolation_capacity,
        )
        .map_err(SceneError::from)?;
        let local = scene.spawn_networked(character, self.template.size)?;
        self.characters.insert(init.id, local);
        log::info!("{} joined as {local}", init.name);
        Ok(())
    }

    pub fn apply_frame(&mut self, scene: &mut Scene, frame: &[u8]) -> Result<(), ReceiveError> {
        let kind = peek_kind(frame)?;
        if kind.carries_entity_id() {
            let server_id = quick_entity_id(frame)?;
            if !self.characters.contains_key(&server_id) {
                log::debug!("dropping {kind:?} for unknown character {server_id}");
                return Ok(());
            }
        }

        match Message::decode(frame)? {
            Message::SyncChar(sync) => {
                if let Some(character) = self.networked(scene, sync.entity_id) {
                    character.push_snapshot(
                        sync.position,
                        sync.velocity,
                        sync.aim,
                        f32::from(sync.delta_ms),
                        sync.hp,
                    );
                }
            }
            Message::UnsyncChar { entity_id } => {
                if let Some(character) = self.networked(scene, entity_id) {
                    character.unsync();
                }
            }
            Message::PrefireTrigger {
                entity_id,
                prefiring,
            } => {
                if let Some(character) = self.networked(scene, entity_id) {
                    character.prefiring = prefiring;
                }
            }
            Message::BulletSpawn(spawn) => {
                let weapon = WeaponId(spawn.weapon_id);
                if scene.armory().weapon(weapon).is_none() {
                    return Err(ReceiveError::UnknownWeapon(spawn.weapon_id));
                }
                let Some(owner) = self.local_id(spawn.owner_id) else {
                    log::warn!("bullet from unknown character {}", spawn.owner_id);
                    return Ok(());
                };
                scene.spawn_bullet(owner, weapon, spawn.position, spawn.velocity, true)?;
            }
            Message::ExplosionSpawn(spawn) => {
                let explosion_type = ExplosionTypeId(spawn.explosion_type_id);
                if scene.armory().explosion(explosion_type).is_none() {
                    return Err(ReceiveError::UnknownExplosionType(spawn.explosion_type_id));
                }
                let Some(owner) = self.local_id(spawn.owner_id) else {
                    log::warn!("explosion from unknown character {}", spawn.owner_id);
                    return Ok(());
                };
                scene.spawn_explosion(owner, explosion_type, spawn.position, true)?;
            }
            Message::SyncControls(_) => {
                return Err(ReceiveError::UnexpectedMessage(MessageKind::SyncControls));
            }
        }
        Ok(())
    }

    fn networked<'a>(&self, scene: &'a mut Scene, server_id: u32) -> Option<&'a mut NetworkedCharacter> {
        scene.networked_mut(self.local_id(server_id)?)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::net::{BulletSpawn, SyncChar};
    use crate::scene::{SceneConfig, standard_armory};

    fn scene() -> Scene {
        let (armory, _) = standard_armory().unwrap();
        Scene::new(SceneConfig::default(), armory).unwrap()
    }

    fn init(id: u32, name: &str) -> CharacterInit {
        CharacterInit {
            id,
            sprite: 2,
            name: name.to_string(),
        }
    }

    fn joined(scene: &mut Scene) -> Receiver {
        let mut receiver = Receiver::new(CharacterConfig::default());
        let reply = receiver
            .apply_admin(
                scene,
                AdminMessage::GameState {
                    characters: vec![init(7, "a"), init(9, "b")],
                    player_id: 7,
                },
            )
            .unwrap();
        assert_eq!(reply, Some(AdminMessage::GameStateDone));
        receiver
    }

    #[test]
    fn game_state_mirrors_every_character() {
        let mut scene = scene();
        let receiver = joined(&mut scene);
        assert!(receiver.is_ready());
        assert_eq!(receiver.len(), 2);
        let me = receiver.player_entity().unwrap();
        let mirrored = scene.networked(me).unwrap();
        assert_eq!(mirrored.server_id, 7);
        assert_eq!(mirrored.sprite, 2);
        assert!(mirrored.off);
    }

    #[test]
    fn sync_turns_character_on() {
        let mut scene = scene();
        let mut receiver = joined(&mut scene);
        let frame = Message::SyncChar(SyncChar {
            entity_id: 9,
            delta_ms: 16,
            position: Vec2::new(40.0, 60.0),
            velocity: Vec2::ZERO,
            aim: Vec2::X,
            hp: 500,
        })
        .encode()
        .unwrap();
        receiver.apply_frame(&mut scene, &frame).unwrap();

        let local = receiver.local_id(9).unwrap();
        let character = scene.networked(local).unwrap();
        assert!(!character.off);
        assert_eq!(character.interpolator().len(), 1);

        let unsync = Message::UnsyncChar { entity_id: 9 }.encode().unwrap();
        receiver.apply_frame(&mut scene, &unsync).unwrap();
        assert!(scene.networked(local).unwrap().off);
    }

    #[test]
    fn frames_for_unknown_characters_are_dropped() {
        let mut scene = scene();
        let mut receiver = joined(&mut scene);
        let frame = Message::PrefireTrigger {
            entity_id: 1234,
            prefiring: true,
        }
        .encode()
        .unwrap();
        receiver.apply_frame(&mut scene, &frame).unwrap();
    }

    #[test]
    fn spawned_bullets_are_replicated() {
        let mut scene = scene();
        let mut receiver = joined(&mut scene);
        let frame = Message::BulletSpawn(BulletSpawn {
            position: Vec2::new(100.0, 100.0),
            velocity: Vec2::new(0.5, 0.0),
            weapon_id: 0,
            owner_id: 9,
        })
        .encode()
        .unwrap();
        receiver.apply_frame(&mut scene, &frame).unwrap();

        let (_, bullet) = scene.bullets().next().unwrap();
        assert!(bullet.replicated);
        assert_eq!(bullet.owner, receiver.local_id(9).unwrap());

        let bad = Message::BulletSpawn(BulletSpawn {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            weapon_id: 200,
            owner_id: 9,
        })
        .encode()
        .unwrap();
        assert!(matches!(
            receiver.apply_frame(&mut scene, &bad),
            Err(ReceiveError::UnknownWeapon(200))
        ));
    }

    #[test]
    fn deleting_unknown_character_fails() {
        let mut scene = scene();
        let mut receiver = joined(&mut scene);
        receiver
            .apply_admin(&mut scene, AdminMessage::DeleteChar { character: init(9, "b") })
            .unwrap();
        assert_eq!(receiver.local_id(9), None);
        assert!(matches!(
            receiver.apply_admin(&mut scene, AdminMessage::DeleteChar { character: init(9, "b") }),
            Err(ReceiveError::UnknownCharacter(9))
        ));
    }

    #[test]
    fn controls_are_not_accepted_by_clients() {
        let mut scene = scene();
        let mut receiver = joined(&mut scene);
        let frame = Message::SyncControls(Default::default()).encode().unwrap();
        assert!(matches!(
            receiver.apply_frame(&mut scene, &frame),
            Err(ReceiveError::UnexpectedMessage(MessageKind::SyncControls))
        ));
    }
}
