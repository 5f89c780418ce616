use std::time::Duration;

use crate::Result;

/// Identifies one `load()`. Events carrying an older id are stale.
pub type LoadId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    Ready,
    Ended,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub load: LoadId,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn ready(load: LoadId) -> Self {
        Self {
            load,
            kind: MediaEventKind::Ready,
        }
    }

    pub fn ended(load: LoadId) -> Self {
        Self {
            load,
            kind: MediaEventKind::Ended,
        }
    }

    pub fn error(load: LoadId, message: impl Into<String>) -> Self {
        Self {
            load,
            kind: MediaEventKind::Error(message.into()),
        }
    }
}

/// One playable stream. Dropping it must release the audio resources.
pub trait MediaHandle {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<()>;
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    fn stop(&mut self);
}

/// Opens handles. The handle reports `Ready`, `Ended` and `Error` for its
/// load id on whatever event channel the backend was built with.
pub trait MediaBackend {
    type Handle: MediaHandle;

    fn open(&mut self, load: LoadId, source: &str) -> Result<Self::Handle>;
}
