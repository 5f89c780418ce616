use spotify_player_client::models::Track;
use std::{sync::Arc, time::Duration};
use tokio::{select, sync::mpsc::UnboundedReceiver};
use tracing::{debug, error, info, instrument};

use crate::{
    Result,
    broadcast::Broadcast,
    controls::ControlCommand,
    error::Error,
    media::{LoadId, MediaBackend, MediaEvent, MediaEventKind, MediaHandle},
    notification::Notification,
    tracklist::{PlaybackQueue, RepeatMode},
};

/// Below this position `previous` moves to the prior track instead of
/// restarting the current one.
const RESTART_THRESHOLD: Duration = Duration::from_millis(3000);

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Owns the queue and at most one media handle.
///
/// `open_current` is the only place a handle is bound and it always releases
/// the previous one first, so two streams never play at once.
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    handle: Option<B::Handle>,
    queue: PlaybackQueue,
    state: PlaybackState,
    load_id: LoadId,
    pause_requested: bool,
    volume: f32,
    muted: bool,
    broadcast: Arc<Broadcast>,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_queue(backend, PlaybackQueue::new())
    }

    pub fn with_queue(backend: B, queue: PlaybackQueue) -> Self {
        Self {
            backend,
            handle: None,
            queue,
            state: PlaybackState::Idle,
            load_id: 0,
            pause_requested: false,
            volume: 1.0,
            muted: false,
            broadcast: Arc::new(Broadcast::new()),
        }
    }

    pub fn broadcast(&self) -> Arc<Broadcast> {
        self.broadcast.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current_track()
    }

    pub fn load_id(&self) -> LoadId {
        self.load_id
    }

    pub fn position(&self) -> Duration {
        self.handle
            .as_ref()
            .map(MediaHandle::position)
            .unwrap_or_default()
    }

    pub fn duration(&self) -> Duration {
        self.current_track()
            .map(Track::duration)
            .unwrap_or_default()
    }

    /// Fraction of the current track played, `None` while the length is unknown.
    pub fn progress(&self) -> Option<f32> {
        let duration = self.duration().as_millis();
        if duration == 0 {
            return None;
        }

        let position = self.position().as_millis().min(duration);
        Some(position as f32 / duration as f32)
    }

    /// The volume the handle is playing at: zero while muted.
    pub fn volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Makes `track` current and starts loading it. A track already in the
    /// queue keeps the queue; any other track replaces it.
    #[instrument(skip_all, fields(track = %track.id))]
    pub fn load(&mut self, track: Track) -> Result<()> {
        self.release();

        match self.queue.position_of(&track) {
            Some(index) => self.queue.select(index)?,
            None => {
                self.queue.replace(vec![track], 0)?;
                self.broadcast_queue();
            }
        }

        self.open_current()
    }

    pub fn set_queue(&mut self, tracks: Vec<Track>, start: usize) -> Result<()> {
        self.queue.replace(tracks, start)?;
        self.broadcast_queue();
        self.open_current()
    }

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::Loading => self.pause_requested = false,
            PlaybackState::Paused => {
                if let Some(handle) = self.handle.as_mut() {
                    handle.play();
                }
                self.set_state(PlaybackState::Playing);
            }
            PlaybackState::Ended => return self.open_current(),
            PlaybackState::Idle => {
                if self.queue.current_track().is_some() {
                    return self.open_current();
                }
            }
        }

        Ok(())
    }

    pub fn pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                if let Some(handle) = self.handle.as_mut() {
                    handle.pause();
                }
                self.set_state(PlaybackState::Paused);
            }
            PlaybackState::Loading => self.pause_requested = true,
            PlaybackState::Paused | PlaybackState::Ended | PlaybackState::Idle => {}
        }
    }

    pub fn play_pause(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => {
                self.pause();
                Ok(())
            }
            PlaybackState::Loading if !self.pause_requested => {
                self.pause();
                Ok(())
            }
            _ => self.play(),
        }
    }

    /// Skips ahead. Unlike a natural end, repeat one moves on like repeat all.
    pub fn next(&mut self) -> Result<()> {
        let wrap = self.queue.repeat() != RepeatMode::Off;
        match self.queue.advance(wrap) {
            Some(_) => self.open_current(),
            None => {
                self.stop();
                Ok(())
            }
        }
    }

    pub fn previous(&mut self) -> Result<()> {
        if self.handle.is_some() && self.position() > RESTART_THRESHOLD {
            return self.seek(Duration::ZERO);
        }

        let wrap = self.queue.repeat() == RepeatMode::All;
        match self.queue.retreat(wrap) {
            Some(_) => self.open_current(),
            None => Ok(()),
        }
    }

    /// Clamped to the track length when it is known. The state is unchanged.
    pub fn seek(&mut self, position: Duration) -> Result<()> {
        let duration = self.duration();
        let position = if duration.is_zero() {
            position
        } else {
            position.min(duration)
        };

        if let Some(handle) = self.handle.as_mut() {
            handle.seek(position)?;
            self.broadcast.send(Notification::Position { position, duration });
        }

        Ok(())
    }

    /// Clamps to `[0, 1]` and unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.muted = false;
        self.apply_volume();
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.apply_volume();
        self.muted
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let shuffle = self.queue.toggle_shuffle();
        self.broadcast_queue();
        shuffle
    }

    pub fn toggle_repeat(&mut self) -> RepeatMode {
        let repeat = self.queue.repeat().cycle();
        self.queue.set_repeat(repeat);
        self.broadcast_queue();
        repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.queue.set_repeat(repeat);
        self.broadcast_queue();
    }

    /// Applies an event from the backend. Events for any load but the
    /// current one are dropped.
    pub fn handle_media_event(&mut self, event: MediaEvent) -> Result<()> {
        if event.load != self.load_id || self.handle.is_none() {
            debug!("ignoring stale media event {event:?}");
            return Ok(());
        }

        match event.kind {
            MediaEventKind::Ready => {
                if self.state != PlaybackState::Loading {
                    return Ok(());
                }

                let paused = self.pause_requested;
                self.pause_requested = false;

                if let Some(handle) = self.handle.as_mut() {
                    if paused {
                        handle.pause();
                    } else {
                        handle.play();
                    }
                }

                self.set_state(if paused {
                    PlaybackState::Paused
                } else {
                    PlaybackState::Playing
                });
                Ok(())
            }
            MediaEventKind::Ended => {
                self.set_state(PlaybackState::Ended);
                self.auto_advance()
            }
            MediaEventKind::Error(message) => {
                self.stop();
                Err(Error::PlaybackFailed { message })
            }
        }
    }

    pub fn handle_command(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Load { track } => self.load(*track),
            ControlCommand::SetQueue { tracks, start } => self.set_queue(tracks, start),
            ControlCommand::Play => self.play(),
            ControlCommand::Pause => {
                self.pause();
                Ok(())
            }
            ControlCommand::PlayPause => self.play_pause(),
            ControlCommand::Next => self.next(),
            ControlCommand::Previous => self.previous(),
            ControlCommand::Seek { position } => self.seek(position),
            ControlCommand::SetVolume { volume } => {
                self.set_volume(volume);
                Ok(())
            }
            ControlCommand::ToggleMute => {
                self.toggle_mute();
                Ok(())
            }
            ControlCommand::ToggleShuffle => {
                self.toggle_shuffle();
                Ok(())
            }
            ControlCommand::ToggleRepeat => {
                self.toggle_repeat();
                Ok(())
            }
            ControlCommand::Quit => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Runs until `Quit` arrives or every `Controls` handle is dropped.
    /// Failures are logged and broadcast, they never end the loop.
    pub async fn player_loop(
        &mut self,
        mut commands: UnboundedReceiver<ControlCommand>,
        mut media_events: UnboundedReceiver<MediaEvent>,
    ) {
        let mut interval = tokio::time::interval(Duration::from_millis(500));

        loop {
            select! {
                _ = interval.tick() => {
                    self.tick();
                }

                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    let quit = matches!(command, ControlCommand::Quit);

                    if let Err(e) = self.handle_command(command) {
                        self.report(e);
                    }
                    if quit {
                        break;
                    }
                }

                Some(event) = media_events.recv() => {
                    if let Err(e) = self.handle_media_event(event) {
                        self.report(e);
                    }
                }
            }
        }

        self.stop();
        info!("player loop finished");
    }

    fn tick(&self) {
        if self.state == PlaybackState::Playing {
            self.broadcast.send(Notification::Position {
                position: self.position(),
                duration: self.duration(),
            });
        }
    }

    fn report(&self, error: Error) {
        error!("{error}");
        self.broadcast.send_error(error.to_string());
    }

    fn auto_advance(&mut self) -> Result<()> {
        match self.queue.repeat() {
            RepeatMode::One => self.open_current(),
            repeat => match self.queue.advance(repeat == RepeatMode::All) {
                Some(_) => self.open_current(),
                None => {
                    debug!("queue exhausted");
                    self.stop();
                    Ok(())
                }
            },
        }
    }

    fn open_current(&mut self) -> Result<()> {
        self.release();
        self.load_id += 1;
        self.pause_requested = false;

        let Some(track) = self.queue.current_track().cloned() else {
            self.set_state(PlaybackState::Idle);
            return Ok(());
        };

        self.broadcast.send(Notification::CurrentTrack {
            track: Some(track.clone()),
        });

        let Some(source) = track.preview_url.as_deref() else {
            self.set_state(PlaybackState::Idle);
            return Err(Error::MediaUnavailable {
                track_id: track.id.to_string(),
            });
        };

        debug!("opening load {} for {}", self.load_id, track.id);
        match self.backend.open(self.load_id, source) {
            Ok(mut handle) => {
                handle.set_volume(self.volume());
                self.handle = Some(handle);
                self.set_state(PlaybackState::Loading);
                Ok(())
            }
            Err(e) => {
                self.set_state(PlaybackState::Idle);
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        self.release();
        self.pause_requested = false;
        self.set_state(PlaybackState::Idle);
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }

    fn apply_volume(&mut self) {
        let volume = self.volume();
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(volume);
        }
        self.broadcast.send(Notification::Volume {
            volume,
            muted: self.muted,
        });
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!("{:?} -> {:?}", self.state, state);
            self.state = state;
            self.broadcast.send(Notification::Status { state });
        }
    }

    fn broadcast_queue(&self) {
        self.broadcast.send(Notification::Queue {
            tracks: self.queue.tracks().to_vec(),
            current: self.queue.current_index(),
            shuffle: self.queue.shuffle(),
            repeat: self.queue.repeat(),
        });
    }
}

impl<B: MediaBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.release();
    }
}
