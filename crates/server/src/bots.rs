use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kaze::math::Vec2Ext;
use kaze::net::{ControlInput, Direction, Message, ProtocolError};
use kaze::spatial::EntityId;

const DIRECTIONS: [Direction; 3] = [Direction::Negative, Direction::Stationary, Direction::Positive];

#[derive(Debug, Clone)]
pub struct Bot {
    pub entity: EntityId,
    pub name: String,
    weapon_slots: u8,
    hold: f32,
}

/// Drives characters with random intent that changes every few hundred
/// milliseconds, encoded exactly as a client would send it.
#[derive(Debug)]
pub struct BotDriver {
    rng: StdRng,
    bots: Vec<Bot>,
}

impl BotDriver {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bots: Vec::new(),
        }
    }

    pub fn add(&mut self, entity: EntityId, name: impl Into<String>, weapon_slots: u8) {
        self.bots.push(Bot {
            entity,
            name: name.into(),
            weapon_slots: weapon_slots.max(1),
            hold: 0.0,
        });
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    /// Control frames for every bot whose current intent ran out this tick.
    pub fn frames(&mut self, dt: f32) -> Result<Vec<(EntityId, Vec<u8>)>, ProtocolError> {
        let mut frames = Vec::new();
        for bot in &mut self.bots {
            bot.hold -= dt;
            if bot.hold > 0.0 {
                continue;
            }
            bot.hold = self.rng.random_range(200.0..1200.0);
            let input = ControlInput {
                vertical: DIRECTIONS[self.rng.random_range(0..3)],
                horizontal: DIRECTIONS[self.rng.random_range(0..3)],
                fire: self.rng.random_bool(0.6),
                aim: Vec2::X.rotated(self.rng.random_range(0.0..TAU)),
                weapon_index: self.rng.random_range(0..bot.weapon_slots),
            };
            frames.push((bot.entity, Message::SyncControls(input).encode()?));
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_is_held_between_changes() {
        let mut driver = BotDriver::new(1);
        driver.add(EntityId(1), "bot", 2);
        assert_eq!(driver.frames(16.0).unwrap().len(), 1);
        // Shortest hold is 200 ms.
        for _ in 0..12 {
            assert!(driver.frames(16.0).unwrap().is_empty());
        }
    }

    #[test]
    fn frames_decode_as_controls() {
        let mut driver = BotDriver::new(7);
        driver.add(EntityId(4), "bot", 3);
        let (entity, frame) = driver.frames(16.0).unwrap().remove(0);
        assert_eq!(entity, EntityId(4));
        match Message::decode(&frame).unwrap() {
            Message::SyncControls(input) => assert!(input.weapon_index < 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
