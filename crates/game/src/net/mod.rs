mod admin;
mod codec;
mod controls;
mod interpolation;
mod lag;
mod protocol;
mod receiver;
mod relay;

pub use admin::{AdminMessage, CharacterInit, DEFAULT_NAME, MAX_NAME_LENGTH, sanitize_name};
pub use codec::{ByteReader, ByteWriter};
pub use controls::{
    AIM_DEGREES, AIM_SLICE, ControlInput, Direction, MAX_WEAPON_SLOTS, aim_to_number,
    number_to_aim, pack_controls, unpack_controls,
};
pub use interpolation::{
    InterpolatedSnapshot, InterpolationError, Interpolator, Snapshot, playback_speed,
};
pub use lag::{LagConfig, LagMaker};
pub use protocol::{
    BulletSpawn, ExplosionSpawn, Message, MessageKind, SyncChar, peek_kind, quick_entity_id,
};
pub use receiver::{ReceiveError, Receiver};
pub use relay::{ClientView, Relay};

pub const DEFAULT_TICK_RATE: u32 = 60;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("frame is {actual} bytes, expected exactly {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("frame truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("invalid direction bits {0}")]
    InvalidDirection(u8),
    #[error("weapon slot {0} does not fit in three bits")]
    WeaponSlotOutOfRange(u8),
    #[error("{0:?} frames carry no entity id")]
    NoEntityId(MessageKind),
}
