use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ProtocolError;
use crate::math::{DEFAULT_AIM, Vec2Ext};

pub const AIM_DEGREES: u8 = 128;
pub const AIM_SLICE: f32 = TAU / AIM_DEGREES as f32;
pub const MAX_WEAPON_SLOTS: u8 = 8;

/// Movement intent along one axis, relative to the aim.
///
/// Vertical `Positive` thrusts forward along the aim and `Negative` backs
/// away from it; horizontal `Positive` strafes to the aim's left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Negative,
    #[default]
    Stationary,
    Positive,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Negative => -1.0,
            Direction::Stationary => 0.0,
            Direction::Positive => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Negative => Direction::Positive,
            Direction::Stationary => Direction::Stationary,
            Direction::Positive => Direction::Negative,
        }
    }

    fn to_bits(self) -> u16 {
        match self {
            Direction::Negative => 0,
            Direction::Stationary => 1,
            Direction::Positive => 2,
        }
    }

    fn from_bits(bits: u16) -> Result<Self, ProtocolError> {
        match bits {
            0 => Ok(Direction::Negative),
            1 => Ok(Direction::Stationary),
            2 => Ok(Direction::Positive),
            other => Err(ProtocolError::InvalidDirection(other as u8)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub vertical: Direction,
    pub horizontal: Direction,
    pub fire: bool,
    pub aim: Vec2,
    pub weapon_index: u8,
}

impl Default for ControlInput {
    fn default() -> Self {
        Self {
            vertical: Direction::Stationary,
            horizontal: Direction::Stationary,
            fire: false,
            aim: DEFAULT_AIM,
            weapon_index: 0,
        }
    }
}

impl ControlInput {
    pub fn is_moving(&self) -> bool {
        self.vertical != Direction::Stationary || self.horizontal != Direction::Stationary
    }
}

pub fn aim_to_number(aim: Vec2) -> u8 {
    let angle = aim.or_default_aim().angle() + PI;
    // An angle of exactly PI lands on slice 128, which is slice 0 again.
    ((angle / AIM_SLICE).floor() as i32).rem_euclid(i32::from(AIM_DEGREES)) as u8
}

pub fn number_to_aim(n: u8) -> Vec2 {
    Vec2::X.rotated(f32::from(n % AIM_DEGREES) * AIM_SLICE - PI)
}

/// Packs input as `vvhh m aaaaaaa www` (most to least significant).
pub fn pack_controls(input: &ControlInput) -> Result<u16, ProtocolError> {
    if input.weapon_index >= MAX_WEAPON_SLOTS {
        return Err(ProtocolError::WeaponSlotOutOfRange(input.weapon_index));
    }
    let mut packed = input.vertical.to_bits();
    packed = (packed << 2) | input.horizontal.to_bits();
    packed = (packed << 1) | u16::from(input.fire);
    packed = (packed << 7) | u16::from(aim_to_number(input.aim));
    packed = (packed << 3) | u16::from(input.weapon_index);
    Ok(packed)
}

pub fn unpack_controls(mut packed: u16) -> Result<ControlInput, ProtocolError> {
    let weapon_index = (packed & 0b111) as u8;
    packed >>= 3;
    let aim = number_to_aim((packed & 0x7f) as u8);
    packed >>= 7;
    let fire = packed & 1 == 1;
    packed >>= 1;
    let horizontal = Direction::from_bits(packed & 0b11)?;
    packed >>= 2;
    let vertical = Direction::from_bits(packed & 0b11)?;
    Ok(ControlInput {
        vertical,
        horizontal,
        fire,
        aim,
        weapon_index,
    })
}
