use spotify_player_client::models::Track;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

#[derive(Debug)]
pub enum ControlCommand {
    Load { track: Box<Track> },
    SetQueue { tracks: Vec<Track>, start: usize },
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
    Seek { position: Duration },
    SetVolume { volume: f32 },
    ToggleMute,
    ToggleShuffle,
    ToggleRepeat,
    Quit,
}

/// Cloneable handle to a running player loop.
#[derive(Debug, Clone)]
pub struct Controls {
    tx: UnboundedSender<ControlCommand>,
}

impl Controls {
    pub fn new(tx: UnboundedSender<ControlCommand>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, UnboundedReceiver<ControlCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn load(&self, track: Track) {
        self.send(ControlCommand::Load {
            track: Box::new(track),
        });
    }

    pub fn set_queue(&self, tracks: Vec<Track>, start: usize) {
        self.send(ControlCommand::SetQueue { tracks, start });
    }

    pub fn play(&self) {
        self.send(ControlCommand::Play);
    }

    pub fn pause(&self) {
        self.send(ControlCommand::Pause);
    }

    pub fn play_pause(&self) {
        self.send(ControlCommand::PlayPause);
    }

    pub fn next(&self) {
        self.send(ControlCommand::Next);
    }

    pub fn previous(&self) {
        self.send(ControlCommand::Previous);
    }

    pub fn seek(&self, position: Duration) {
        self.send(ControlCommand::Seek { position });
    }

    pub fn set_volume(&self, volume: f32) {
        self.send(ControlCommand::SetVolume { volume });
    }

    pub fn toggle_mute(&self) {
        self.send(ControlCommand::ToggleMute);
    }

    pub fn toggle_shuffle(&self) {
        self.send(ControlCommand::ToggleShuffle);
    }

    pub fn toggle_repeat(&self) {
        self.send(ControlCommand::ToggleRepeat);
    }

    pub fn quit(&self) {
        self.send(ControlCommand::Quit);
    }

    fn send(&self, command: ControlCommand) {
        if let Err(e) = self.tx.send(command) {
            warn!("player loop is gone, dropped {:?}", e.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let (controls, mut rx) = Controls::channel();

        controls.play();
        controls.seek(Duration::from_secs(3));
        controls.clone().quit();

        assert!(matches!(rx.try_recv(), Ok(ControlCommand::Play)));
        assert!(matches!(
            rx.try_recv(),
            Ok(ControlCommand::Seek { position }) if position == Duration::from_secs(3)
        ));
        assert!(matches!(rx.try_recv(), Ok(ControlCommand::Quit)));
    }

    #[test]
    fn sending_after_the_loop_ends_is_harmless() {
        let (controls, rx) = Controls::channel();
        drop(rx);

        controls.next();
    }
}
