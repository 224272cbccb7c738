mod input;
mod tick;

pub use input::{InputBuffer, PendingInput};
pub use tick::FixedTimestep;
