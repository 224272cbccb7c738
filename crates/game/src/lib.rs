pub mod math;
pub mod net;
pub mod scene;
pub mod simulation;
pub mod spatial;

pub use math::{DEFAULT_AIM, Rect, Vec2Ext};
pub use net::{
    AdminMessage, CharacterInit, ControlInput, DEFAULT_TICK_RATE, Direction, Interpolator,
    LagConfig, LagMaker, Message, MessageKind, ProtocolError, ReceiveError, Receiver, Relay,
};
pub use scene::{
    Armory, Character, CharacterConfig, MapFile, NetworkedCharacter, NoHooks, Scene, SceneConfig,
    SceneError, SceneEvent, SceneHooks, Viewport, standard_armory,
};
pub use simulation::{FixedTimestep, InputBuffer};
pub use spatial::{EntityId, SpatialError, SpatialHash};
