use snafu::prelude::*;

#[derive(Snafu, Debug, Clone, PartialEq)]
pub enum Error {
    #[snafu(display("track {track_id} has no playable preview"))]
    MediaUnavailable { track_id: String },
    #[snafu(display("playback failed: {message}"))]
    PlaybackFailed { message: String },
    #[snafu(display("queue index {index} is out of range for {len} tracks"))]
    InvalidQueueIndex { index: usize, len: usize },
}

#[cfg(feature = "rodio")]
impl From<rodio::source::SeekError> for Error {
    fn from(value: rodio::source::SeekError) -> Self {
        Self::PlaybackFailed {
            message: format!("failed to seek: {value}"),
        }
    }
}

#[cfg(feature = "rodio")]
impl From<rodio::StreamError> for Error {
    fn from(value: rodio::StreamError) -> Self {
        Self::PlaybackFailed {
            message: value.to_string(),
        }
    }
}

#[cfg(feature = "rodio")]
impl From<rodio::decoder::DecoderError> for Error {
    fn from(value: rodio::decoder::DecoderError) -> Self {
        Self::PlaybackFailed {
            message: value.to_string(),
        }
    }
}

#[cfg(feature = "rodio")]
impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::PlaybackFailed {
            message: value.to_string(),
        }
    }
}
