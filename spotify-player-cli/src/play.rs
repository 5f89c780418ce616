use clap::ValueEnum;
use spotify_player_client::{CatalogClient, models::Track, params::TimeRange};
use spotify_player_controls::{Controls, Notification, PlaybackController, sink::RodioBackend};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::debug;

use crate::cli::Error;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlayKind {
    Track,
    Album,
    Playlist,
    Top,
}

const HELP: &str = "enter: play/pause  n: next  b: previous  s: shuffle  r: repeat  m: mute  v <0-1>: volume  seek <secs>  q: quit";

pub async fn run(
    client: &CatalogClient,
    token: &str,
    market: Option<&str>,
    kind: PlayKind,
    id: Option<&str>,
    shuffle: bool,
    start: usize,
) -> Result<(), Error> {
    let tracks: Vec<Track> = fetch_tracks(client, token, market, kind, id)
        .await?
        .into_iter()
        .filter(Track::is_playable)
        .collect();

    if tracks.is_empty() {
        return Err(Error::PlayerError {
            error: "none of these tracks has a preview".to_string(),
        });
    }

    let (backend, media_events) = RodioBackend::new();
    let mut controller = PlaybackController::new(backend);
    let (controls, commands) = Controls::channel();

    tokio::spawn(print_notifications(controller.broadcast().subscribe()));

    controls.set_queue(tracks, start);
    if shuffle {
        controls.toggle_shuffle();
    }

    println!("{HELP}");
    tokio::spawn(read_commands(controls));

    controller.player_loop(commands, media_events).await;
    Ok(())
}

async fn fetch_tracks(
    client: &CatalogClient,
    token: &str,
    market: Option<&str>,
    kind: PlayKind,
    id: Option<&str>,
) -> Result<Vec<Track>, Error> {
    let id = || {
        id.ok_or_else(|| Error::PlayerError {
            error: format!("an id is required to play a {kind:?}"),
        })
    };

    let tracks = match kind {
        PlayKind::Track => vec![client.track(token, id()?, market).await?],
        PlayKind::Album => client.album(token, id()?, market).await?.tracks.items,
        PlayKind::Playlist => client
            .playlist_items(token, id()?, 100, 0)
            .await?
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .collect(),
        PlayKind::Top => {
            client
                .top_tracks(token, TimeRange::default(), 50, 0)
                .await?
                .items
        }
    };

    Ok(tracks)
}

async fn print_notifications(
    mut notifications: tokio::sync::broadcast::Receiver<Notification>,
) {
    loop {
        match notifications.recv().await {
            Ok(Notification::CurrentTrack { track: Some(track) }) => {
                println!("now playing: {} by {}", track.name, track.artist_names());
            }
            Ok(Notification::Status { state }) => println!("[{state:?}]"),
            Ok(Notification::Volume { volume, muted }) => {
                println!("volume {:.0}%{}", volume * 100.0, if muted { " (muted)" } else { "" });
            }
            Ok(Notification::Queue {
                tracks,
                current,
                shuffle,
                repeat,
            }) => {
                let current = current.map(|i| i + 1).unwrap_or(0);
                println!("track {current}/{}  shuffle {shuffle}  repeat {repeat}", tracks.len());
            }
            Ok(Notification::Error { message }) => eprintln!("error: {message}"),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!("skipped {skipped} notifications"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn read_commands(controls: Controls) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let mut words = line.split_whitespace();

        match words.next() {
            None | Some("p") => controls.play_pause(),
            Some("n") => controls.next(),
            Some("b") => controls.previous(),
            Some("s") => controls.toggle_shuffle(),
            Some("r") => controls.toggle_repeat(),
            Some("m") => controls.toggle_mute(),
            Some("v") => match words.next().and_then(|w| w.parse::<f32>().ok()) {
                Some(volume) => controls.set_volume(volume),
                None => println!("usage: v <0-1>"),
            },
            Some("seek") => match words.next().and_then(|w| w.parse::<u64>().ok()) {
                Some(seconds) => controls.seek(Duration::from_secs(seconds)),
                None => println!("usage: seek <seconds>"),
            },
            Some("q") => break,
            Some(other) => println!("unknown command {other:?}\n{HELP}"),
        }
    }

    controls.quit();
}
