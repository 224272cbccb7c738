use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::admin::{AdminMessage, CharacterInit};
use super::protocol::{BulletSpawn, ExplosionSpawn, Message, SyncChar};
use super::receiver::ReceiveError;
use crate::scene::{EntityKind, RectEntity, Scene, Viewport};
use crate::spatial::EntityId;

/// What one client has been told so far.
#[derive(Debug, Clone, Default)]
pub struct ClientView {
    visible: BTreeSet<EntityId>,
    prefiring: BTreeSet<EntityId>,
    sent_bullets: BTreeSet<EntityId>,
    sent_explosions: BTreeSet<EntityId>,
}

impl ClientView {
    pub fn visible(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.visible.iter().copied()
    }

    pub fn is_visible(&self, id: EntityId) -> bool {
        self.visible.contains(&id)
    }
}

/// Server side of replication. Each client sees the world through a
/// viewport centred on its own character and receives binary frames for
/// whatever changed inside it.
#[derive(Debug, Clone)]
pub struct Relay {
    viewport_size: Vec2,
    clients: BTreeMap<EntityId, ClientView>,
}

impl Relay {
    pub fn new(viewport_size: Vec2) -> Self {
        Self {
            viewport_size,
            clients: BTreeMap::new(),
        }
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport_size
    }

    pub fn add_client(&mut self, character: EntityId) {
        self.clients.entry(character).or_default();
    }

    pub fn remove_client(&mut self, character: EntityId) -> bool {
        self.clients.remove(&character).is_some()
    }

    pub fn client(&self, character: EntityId) -> Option<&ClientView> {
        self.clients.get(&character)
    }

    pub fn clients(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.clients.keys().copied()
    }

    pub fn roster(scene: &Scene) -> Vec<CharacterInit> {
        scene
            .characters()
            .map(|(id, character)| CharacterInit {
                id: id.0,
                sprite: character.sprite,
                name: character.name.clone(),
            })
            .collect()
    }

    pub fn game_state(scene: &Scene, player: EntityId) -> AdminMessage {
        AdminMessage::GameState {
            characters: Self::roster(scene),
            player_id: player.0,
        }
    }

    /// Decodes a control frame from `client` and queues it for the next tick.
    pub fn receive_controls(
        &self,
        scene: &mut Scene,
        client: EntityId,
        frame: &[u8],
    ) -> Result<(), ReceiveError> {
        match Message::decode(frame)? {
            Message::SyncControls(input) => {
                scene.queue_input(client, input);
                Ok(())
            }
            other => Err(ReceiveError::UnexpectedMessage(other.kind())),
        }
    }

    /// Frames owed to every client after a tick of `dt` milliseconds.
    /// Clients whose character is gone get nothing.
    pub fn collect(
        &mut self,
        scene: &Scene,
        dt: f32,
    ) -> Result<BTreeMap<EntityId, Vec<Vec<u8>>>, ReceiveError> {
        let delta_ms = dt.round().clamp(0.0, f32::from(u16::MAX)) as u16;
        let mut out = BTreeMap::new();
        for (&player, client) in &mut self.clients {
            let Ok(rect) = scene.rect_of(player) else {
                continue;
            };
            let viewport = Viewport::new(rect.center(), self.viewport_size);
            let frames = Self::collect_for(scene, client, &viewport, delta_ms)?;
            out.insert(player, frames);
        }
        Ok(out)
    }

    fn collect_for(
        scene: &Scene,
        client: &mut ClientView,
        viewport: &Viewport,
        delta_ms: u16,
    ) -> Result<Vec<Vec<u8>>, ReceiveError> {
        let mut frames = Vec::new();
        let mut visible = BTreeSet::new();

        for view in scene.visible_entities(viewport) {
            match scene.entity(view.id) {
                Some(RectEntity::Character(character)) => {
                    visible.insert(view.id);
                    frames.push(
                        Message::SyncChar(SyncChar {
                            entity_id: view.id.0,
                            delta_ms,
                            position: view.position,
                            velocity: character.velocity,
                            aim: character.aim,
                            hp: character.hp.clamp(0, i32::from(u16::MAX)) as u16,
                        })
                        .encode()?,
                    );
                    let prefiring = character.firing.is_prefiring();
                    if prefiring != client.prefiring.contains(&view.id) {
                        if prefiring {
                            client.prefiring.insert(view.id);
                        } else {
                            client.prefiring.remove(&view.id);
                        }
                        frames.push(
                            Message::PrefireTrigger {
                                entity_id: view.id.0,
                                prefiring,
                            }
                            .encode()?,
                        );
                    }
                }
                Some(RectEntity::Explosion(explosion)) => {
                    if explosion.replicated || !client.sent_explosions.insert(view.id) {
                        continue;
                    }
                    frames.push(
                        Message::ExplosionSpawn(ExplosionSpawn {
                            position: view.position + view.size / 2.0,
                            explosion_type_id: explosion.explosion_type.0,
                            owner_id: explosion.owner.0,
                        })
                        .encode()?,
                    );
                }
                _ => {}
            }
        }

        for &gone in client.visible.difference(&visible) {
            client.prefiring.remove(&gone);
            frames.push(Message::UnsyncChar { entity_id: gone.0 }.encode()?);
        }
        client.visible = visible;

        for bullet in scene.visible_bullets(viewport) {
            let replicated = scene.bullet(bullet.id).is_some_and(|b| b.replicated);
            if replicated || !client.sent_bullets.insert(bullet.id) {
                continue;
            }
            frames.push(
                Message::BulletSpawn(BulletSpawn {
                    position: bullet.position,
                    velocity: bullet.velocity,
                    weapon_id: bullet.weapon.0,
                    owner_id: bullet.owner.0,
                })
                .encode()?,
            );
        }

        client.sent_bullets.retain(|id| scene.bullet(*id).is_some());
        client
            .sent_explosions
            .retain(|id| scene.entity(*id).is_some_and(|e| e.kind() == EntityKind::Explosion));
        Ok(frames)
    }
}
