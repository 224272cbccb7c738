use glam::Vec2;

use super::ProtocolError;
use super::codec::{ByteReader, ByteWriter};
use super::controls::{ControlInput, aim_to_number, number_to_aim, pack_controls, unpack_controls};

/// Leading tag byte of every binary frame. Values are part of the wire
/// contract and follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    SyncChar = 0,
    SyncControls,
    BulletSpawn,
    ExplosionSpawn,
    UnsyncChar,
    PrefireTrigger,
}

impl MessageKind {
    /// Total frame length including the tag byte.
    pub const fn frame_size(self) -> usize {
        match self {
            MessageKind::SyncChar => 26,
            MessageKind::SyncControls => 3,
            MessageKind::BulletSpawn => 22,
            MessageKind::ExplosionSpawn => 14,
            MessageKind::UnsyncChar => 5,
            MessageKind::PrefireTrigger => 6,
        }
    }

    pub const fn carries_entity_id(self) -> bool {
        matches!(
            self,
            MessageKind::SyncChar | MessageKind::UnsyncChar | MessageKind::PrefireTrigger
        )
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageKind::SyncChar),
            1 => Ok(MessageKind::SyncControls),
            2 => Ok(MessageKind::BulletSpawn),
            3 => Ok(MessageKind::ExplosionSpawn),
            4 => Ok(MessageKind::UnsyncChar),
            5 => Ok(MessageKind::PrefireTrigger),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncChar {
    pub entity_id: u32,
    pub delta_ms: u16,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim: Vec2,
    pub hp: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub weapon_id: u8,
    pub owner_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionSpawn {
    pub position: Vec2,
    pub explosion_type_id: u8,
    pub owner_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    SyncChar(SyncChar),
    SyncControls(ControlInput),
    BulletSpawn(BulletSpawn),
    ExplosionSpawn(ExplosionSpawn),
    UnsyncChar { entity_id: u32 },
    PrefireTrigger { entity_id: u32, prefiring: bool },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::SyncChar(_) => MessageKind::SyncChar,
            Message::SyncControls(_) => MessageKind::SyncControls,
            Message::BulletSpawn(_) => MessageKind::BulletSpawn,
            Message::ExplosionSpawn(_) => MessageKind::ExplosionSpawn,
            Message::UnsyncChar { .. } => MessageKind::UnsyncChar,
            Message::PrefireTrigger { .. } => MessageKind::PrefireTrigger,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let kind = self.kind();
        let mut w = ByteWriter::with_size(kind.frame_size());
        w.put_u8(kind as u8);
        match self {
            Message::SyncChar(sync) => {
                w.put_u32(sync.entity_id);
                w.put_u16(sync.delta_ms);
                put_vec2(&mut w, sync.position);
                put_vec2(&mut w, sync.velocity);
                w.put_u8(aim_to_number(sync.aim));
                w.put_u16(sync.hp);
            }
            Message::SyncControls(input) => w.put_u16(pack_controls(input)?),
            Message::BulletSpawn(spawn) => {
                put_vec2(&mut w, spawn.position);
                put_vec2(&mut w, spawn.velocity);
                w.put_u8(spawn.weapon_id);
                w.put_u32(spawn.owner_id);
            }
            Message::ExplosionSpawn(spawn) => {
                put_vec2(&mut w, spawn.position);
                w.put_u8(spawn.explosion_type_id);
                w.put_u32(spawn.owner_id);
            }
            Message::UnsyncChar { entity_id } => w.put_u32(*entity_id),
            Message::PrefireTrigger {
                entity_id,
                prefiring,
            } => {
                w.put_u32(*entity_id);
                w.put_u8(u8::from(*prefiring));
            }
        }
        w.finish()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let kind = peek_kind(frame)?;
        if frame.len() != kind.frame_size() {
            return Err(ProtocolError::SizeMismatch {
                expected: kind.frame_size(),
                actual: frame.len(),
            });
        }

        let mut r = ByteReader::new(frame);
        r.u8()?;
        let message = match kind {
            MessageKind::SyncChar => Message::SyncChar(SyncChar {
                entity_id: r.u32()?,
                delta_ms: r.u16()?,
                position: read_vec2(&mut r)?,
                velocity: read_vec2(&mut r)?,
                aim: number_to_aim(r.u8()?),
                hp: r.u16()?,
            }),
            MessageKind::SyncControls => Message::SyncControls(unpack_controls(r.u16()?)?),
            MessageKind::BulletSpawn => Message::BulletSpawn(BulletSpawn {
                position: read_vec2(&mut r)?,
                velocity: read_vec2(&mut r)?,
                weapon_id: r.u8()?,
                owner_id: r.u32()?,
            }),
            MessageKind::ExplosionSpawn => Message::ExplosionSpawn(ExplosionSpawn {
                position: read_vec2(&mut r)?,
                explosion_type_id: r.u8()?,
                owner_id: r.u32()?,
            }),
            MessageKind::UnsyncChar => Message::UnsyncChar {
                entity_id: r.u32()?,
            },
            MessageKind::PrefireTrigger => Message::PrefireTrigger {
                entity_id: r.u32()?,
                prefiring: r.u8()? != 0,
            },
        };
        r.finish()?;
        Ok(message)
    }
}

pub fn peek_kind(frame: &[u8]) -> Result<MessageKind, ProtocolError> {
    let tag = *frame.first().ok_or(ProtocolError::Truncated {
        needed: 1,
        available: 0,
    })?;
    MessageKind::try_from(tag)
}

/// Reads the entity id at byte offset 1 without decoding the rest.
pub fn quick_entity_id(frame: &[u8]) -> Result<u32, ProtocolError> {
    let kind = peek_kind(frame)?;
    if !kind.carries_entity_id() {
        return Err(ProtocolError::NoEntityId(kind));
    }
    let mut r = ByteReader::new(frame);
    r.u8()?;
    r.u32()
}

fn put_vec2(w: &mut ByteWriter, v: Vec2) {
    w.put_f32(v.x);
    w.put_f32(v.y);
}

fn read_vec2(r: &mut ByteReader<'_>) -> Result<Vec2, ProtocolError> {
    Ok(Vec2::new(r.f32()?, r.f32()?))
}
