pub use error::Error;

pub mod broadcast;
pub mod controls;
pub mod error;
pub mod media;
pub mod notification;
pub mod player;
#[cfg(feature = "rodio")]
pub mod sink;
pub mod tracklist;

pub use controls::{ControlCommand, Controls};
pub use media::{LoadId, MediaBackend, MediaEvent, MediaEventKind, MediaHandle};
pub use notification::Notification;
pub use player::{PlaybackController, PlaybackState};
pub use tracklist::{PlaybackQueue, RepeatMode};

pub type Result<T, E = Error> = std::result::Result<T, E>;
