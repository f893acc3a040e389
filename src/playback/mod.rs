//! Playback interruption engine: the state machine, its events and commands,
//! and the countdown timer seam.

pub mod command;
pub mod machine;
pub mod state;
pub mod timer;

pub use command::{PlayerCommand, PlayerEvent};
pub use machine::PlaybackMachine;
pub use state::{AdState, AdStatus, PlaybackState, PlaybackStatus, PrimaryState};
pub use timer::{AdTimer, CountdownGuard};
