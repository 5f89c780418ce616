use spotify_player_client::models::Track;
use std::time::Duration;

use crate::{player::PlaybackState, tracklist::RepeatMode};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status {
        state: PlaybackState,
    },
    CurrentTrack {
        track: Option<Track>,
    },
    Position {
        position: Duration,
        duration: Duration,
    },
    Volume {
        volume: f32,
        muted: bool,
    },
    Queue {
        tracks: Vec<Track>,
        current: Option<usize>,
        shuffle: bool,
        repeat: RepeatMode,
    },
    Error {
        message: String,
    },
}
