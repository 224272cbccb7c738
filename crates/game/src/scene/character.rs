use glam::Vec2;

use super::config::CharacterConfig;
use super::firing::FiringState;
use super::weapon::WeaponId;
use crate::math::{DEFAULT_AIM, Vec2Ext, shortest_arc};
use crate::net::{ControlInput, Direction, InterpolationError, Interpolator, playback_speed};
use crate::spatial::EntityId;

#[derive(Debug, Clone)]
pub struct Character {
    pub name: String,
    pub sprite: u8,
    pub config: CharacterConfig,
    pub hp: i32,
    pub max_hp: i32,

    pub velocity: Vec2,
    pub accel: Vec2,
    pub aim: Vec2,
    pub desired_aim: Vec2,
    pub vertical: Direction,
    pub horizontal: Direction,
    pub fire: bool,
    /// Which way the aim turned during the last tick.
    pub rotate_direction: Direction,

    pub weapons: Vec<WeaponId>,
    weapon_index: usize,
    pub firing: FiringState,

    /// Latest input, applied at the start of the next tick.
    pub controls: ControlInput,
    pub off: bool,
    pub inside_teleporter: Option<EntityId>,
}

impl Character {
    pub fn new(name: impl Into<String>, sprite: u8, config: CharacterConfig, weapons: Vec<WeaponId>) -> Self {
        Self {
            name: name.into(),
            sprite,
            hp: config.max_hp,
            max_hp: config.max_hp,
            config,
            velocity: Vec2::ZERO,
            accel: Vec2::ZERO,
            aim: DEFAULT_AIM,
            desired_aim: DEFAULT_AIM,
            vertical: Direction::Stationary,
            horizontal: Direction::Stationary,
            fire: false,
            rotate_direction: Direction::Stationary,
            weapons,
            weapon_index: 0,
            firing: FiringState::default(),
            controls: ControlInput::default(),
            off: false,
            inside_teleporter: None,
        }
    }

    pub fn weapon_index(&self) -> usize {
        self.weapon_index
    }

    pub fn current_weapon(&self) -> Option<WeaponId> {
        self.weapons.get(self.weapon_index).copied()
    }

    /// Refused for unknown slots and while the firing cycle is still running.
    pub fn switch_weapon(&mut self, index: usize) -> bool {
        if index == self.weapon_index {
            return true;
        }
        if index >= self.weapons.len() || !self.firing.can_switch() {
            return false;
        }
        self.weapon_index = index;
        true
    }

    pub fn is_moving(&self) -> bool {
        self.vertical != Direction::Stationary || self.horizontal != Direction::Stationary
    }

    pub fn apply_controls(&mut self) {
        let controls = self.controls;
        self.vertical = match controls.vertical {
            Direction::Negative if self.config.disable_backpedal => Direction::Stationary,
            other => other,
        };
        self.horizontal = controls.horizontal;
        self.fire = controls.fire;
        self.desired_aim = controls.aim.or_default_aim();
        if !self.switch_weapon(usize::from(controls.weapon_index)) {
            log::trace!("weapon switch to slot {} refused", controls.weapon_index);
        }
    }

    /// Turns the aim toward `desired_aim` by at most `rotate_speed * dt`.
    pub fn rotate_aim(&mut self, dt: f32) {
        let diff = shortest_arc(self.aim.angle(), self.desired_aim.angle());
        let max_turn = self.config.rotate_speed * dt;
        if diff.abs() <= max_turn {
            self.aim.rotate_by(diff);
            self.rotate_direction = Direction::Stationary;
        } else {
            self.aim.rotate_by(max_turn.copysign(diff));
            self.rotate_direction = if diff > 0.0 {
                Direction::Positive
            } else {
                Direction::Negative
            };
        }
    }

    /// Thrust relative to the aim. Horizontal `Positive` strafes left.
    fn thrust(&self) -> Vec2 {
        let forward = self.aim * self.vertical.sign();
        let left = Vec2::new(self.aim.y, -self.aim.x) * self.horizontal.sign();
        (forward + left).with_magnitude(self.config.movement_accel_mag)
    }

    pub fn update_velocity(&mut self, friction_accel_mag: f32, dt: f32) {
        if self.is_moving() {
            self.accel = self.thrust();
        } else {
            self.accel = (-self.velocity).with_magnitude(friction_accel_mag);
            if friction_accel_mag * dt > self.velocity.length() {
                self.velocity = Vec2::ZERO;
                self.accel = Vec2::ZERO;
                return;
            }
        }
        self.velocity += self.accel * dt;
        if self.velocity.length() > self.config.max_speed {
            self.velocity.set_magnitude(self.config.max_speed);
        }
    }

    /// Second order displacement for this tick, capped at `max_speed * dt`.
    pub fn move_delta(&self, dt: f32) -> Vec2 {
        let delta = self.velocity * dt + 0.5 * self.accel * dt * dt;
        let max_dist = self.config.max_speed * dt;
        if delta.length() > max_dist {
            delta.with_magnitude(max_dist)
        } else {
            delta
        }
    }

    pub fn bounce(&mut self, blocked_x: bool, blocked_y: bool, default_multiplier: f32) {
        let multiplier = self
            .config
            .custom_bounce_multiplier
            .unwrap_or(default_multiplier);
        if blocked_x {
            self.velocity.x *= -multiplier;
            if self.config.auto_v_bounce {
                self.vertical = self.vertical.flipped();
            }
        }
        if blocked_y {
            self.velocity.y *= -multiplier;
            if self.config.auto_h_bounce {
                self.horizontal = self.horizontal.flipped();
            }
        }
    }
}

/// Snapshot fields carried through interpolation without blending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterPartial {
    pub hp: u16,
}

/// A character whose motion is replayed from server snapshots.
#[derive(Debug, Clone)]
pub struct NetworkedCharacter {
    pub server_id: u32,
    pub name: String,
    pub sprite: u8,
    pub aim: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub prefiring: bool,
    /// Out of the server's relevance; starts off until the first snapshot.
    pub off: bool,
    interpolator: Interpolator<CharacterPartial>,
    network_t: f32,
}

impl NetworkedCharacter {
    pub fn new(
        server_id: u32,
        name: impl Into<String>,
        sprite: u8,
        max_hp: i32,
        history: usize,
    ) -> Result<Self, InterpolationError> {
        Ok(Self {
            server_id,
            name: name.into(),
            sprite,
            aim: DEFAULT_AIM,
            hp: max_hp,
            max_hp,
            prefiring: false,
            off: true,
            interpolator: Interpolator::new(history)?,
            network_t: 0.0,
        })
    }

    pub fn interpolator(&self) -> &Interpolator<CharacterPartial> {
        &self.interpolator
    }

    pub fn network_t(&self) -> f32 {
        self.network_t
    }

    pub fn push_snapshot(&mut self, position: Vec2, velocity: Vec2, aim: Vec2, delta_ms: f32, hp: u16) {
        self.off = false;
        let shifted = self.interpolator.push(
            position,
            velocity,
            aim,
            delta_ms,
            CharacterPartial { hp },
        );
        self.network_t = (self.network_t - shifted).max(0.0);
    }

    /// Advances playback by `dt` and returns the position to show, or
    /// `None` while nothing has been received.
    pub fn advance(&mut self, dt: f32) -> Result<Option<Vec2>, InterpolationError> {
        if self.interpolator.is_empty() {
            return Ok(None);
        }
        let t = self.network_t + dt * playback_speed(self.interpolator.len());
        let sample = self.interpolator.interpolate(t)?;
        self.network_t = self.interpolator.prune(t);
        self.aim = sample.aim;
        self.hp = i32::from(sample.other.hp);
        Ok(Some(sample.position))
    }

    pub fn unsync(&mut self) {
        self.off = true;
        self.prefiring = false;
        self.interpolator.clear();
        self.network_t = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn character() -> Character {
        Character::new("test", 0, CharacterConfig::default(), vec![WeaponId(0), WeaponId(1)])
    }

    #[test]
    fn rotation_is_rate_limited() {
        let mut c = character();
        c.aim = Vec2::X;
        c.desired_aim = Vec2::Y;
        c.rotate_aim(100.0);
        assert!((c.aim.angle() - 0.35).abs() < 1e-4);
        assert_eq!(c.rotate_direction, Direction::Positive);

        c.rotate_aim(1000.0);
        assert!((c.aim.angle() - FRAC_PI_2).abs() < 1e-4);
        assert_eq!(c.rotate_direction, Direction::Stationary);
    }

    #[test]
    fn positive_strafe_goes_left_of_aim() {
        let mut c = character();
        c.aim = Vec2::new(0.0, -1.0);
        c.horizontal = Direction::Positive;
        c.update_velocity(0.0, 10.0);
        assert!(c.velocity.x < 0.0);
        assert!(c.velocity.y.abs() < 1e-6);
    }

    #[test]
    fn friction_stops_instead_of_reversing() {
        let mut c = character();
        c.velocity = Vec2::new(0.001, 0.0);
        c.update_velocity(0.0002, 16.0);
        assert_eq!(c.velocity, Vec2::ZERO);
        assert_eq!(c.move_delta(16.0), Vec2::ZERO);
    }

    #[test]
    fn speed_is_clamped() {
        let mut c = character();
        c.vertical = Direction::Positive;
        for _ in 0..100 {
            c.update_velocity(0.0002, 16.0);
        }
        assert!((c.velocity.length() - c.config.max_speed).abs() < 1e-6);
        assert!(c.move_delta(16.0).length() <= c.config.max_speed * 16.0 + 1e-5);
    }

    #[test]
    fn backpedal_can_be_disabled() {
        let mut c = character();
        c.config.disable_backpedal = true;
        c.controls.vertical = Direction::Negative;
        c.apply_controls();
        assert_eq!(c.vertical, Direction::Stationary);
    }

    #[test]
    fn bounce_reflects_and_flips_intent() {
        let mut c = character();
        c.config.auto_v_bounce = true;
        c.velocity = Vec2::new(1.0, 1.0);
        c.vertical = Direction::Positive;
        c.bounce(true, false, 0.5);
        assert_eq!(c.velocity, Vec2::new(-0.5, 1.0));
        assert_eq!(c.vertical, Direction::Negative);
    }

    #[test]
    fn switch_refused_mid_cycle() {
        let mut c = character();
        c.firing.hold = 50.0;
        assert!(!c.switch_weapon(1));
        c.firing.hold = 0.0;
        assert!(c.switch_weapon(1));
        assert_eq!(c.current_weapon(), Some(WeaponId(1)));
        assert!(!c.switch_weapon(5));
    }

    #[test]
    fn networked_playback_follows_snapshots() {
        let mut n = NetworkedCharacter::new(7, "remote", 0, 1000, 8).unwrap();
        assert!(n.off);
        assert_eq!(n.advance(16.0).unwrap(), None);

        n.push_snapshot(Vec2::ZERO, Vec2::ZERO, Vec2::X, 0.0, 900);
        n.push_snapshot(Vec2::new(10.0, 0.0), Vec2::ZERO, Vec2::X, 100.0, 800);
        assert!(!n.off);

        let p = n.advance(50.0).unwrap().unwrap();
        assert!(p.x > 0.0 && p.x < 10.0);
        assert_eq!(n.hp, 900);

        let p = n.advance(500.0).unwrap().unwrap();
        assert_eq!(p, Vec2::new(10.0, 0.0));
        assert_eq!(n.hp, 800);

        n.unsync();
        assert!(n.off);
        assert!(n.interpolator().is_empty());
    }
}
