use rand::{Rng, SeedableRng, rngs::StdRng};
use spotify_player_client::models::Track;
use std::collections::HashSet;
use tracing::debug;

use crate::{Result, error::Error};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// off, all, one, off again.
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        })
    }
}

/// Ordered tracks and a pointer into them.
///
/// In shuffle mode every index is visited once per cycle. `history` holds
/// the shuffled indices in the order they became current; a new cycle keeps
/// only the last one.
#[derive(Debug, Clone)]
pub struct PlaybackQueue {
    tracks: Vec<Track>,
    current: Option<usize>,
    shuffle: bool,
    repeat: RepeatMode,
    played: HashSet<usize>,
    history: Vec<usize>,
    rng: StdRng,
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::with_seed(rand::random())
    }
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Default::default()
    }

    /// Shuffle order is fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            shuffle: false,
            repeat: RepeatMode::Off,
            played: HashSet::new(),
            history: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|index| self.tracks.get(index))
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn position_of(&self, track: &Track) -> Option<usize> {
        self.tracks.iter().position(|t| t == track)
    }

    pub(crate) fn replace(&mut self, tracks: Vec<Track>, start: usize) -> Result<()> {
        ensure_index(start, tracks.len())?;

        self.tracks = tracks;
        self.current = None;
        self.played.clear();
        self.history.clear();
        self.visit(start);

        Ok(())
    }

    pub(crate) fn select(&mut self, index: usize) -> Result<()> {
        ensure_index(index, self.tracks.len())?;
        if self.current != Some(index) {
            self.visit(index);
        }
        Ok(())
    }

    pub(crate) fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    pub(crate) fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.played.clear();
        self.history.clear();
        if let Some(current) = self.current {
            self.played.insert(current);
            self.history.push(current);
        }
        self.shuffle
    }

    /// Moves to the next index. With `wrap` unset the queue can run out,
    /// in which case nothing changes and `None` comes back.
    pub(crate) fn advance(&mut self, wrap: bool) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }

        let next = if self.shuffle {
            self.next_shuffled(wrap)?
        } else {
            match self.current {
                None => 0,
                Some(index) if index + 1 < self.tracks.len() => index + 1,
                Some(_) if wrap => 0,
                Some(_) => return None,
            }
        };

        self.visit(next);
        Some(next)
    }

    /// The index `previous` should load. At the start of the queue this is
    /// the last index when `wrap` is set and the first one otherwise.
    pub(crate) fn retreat(&mut self, wrap: bool) -> Option<usize> {
        let current = self.current?;

        let previous = if self.shuffle {
            if self.history.len() > 1 {
                self.history.pop();
            }
            self.history.last().copied().unwrap_or(current)
        } else if current > 0 {
            current - 1
        } else if wrap {
            self.tracks.len() - 1
        } else {
            0
        };

        self.current = Some(previous);
        Some(previous)
    }

    fn next_shuffled(&mut self, wrap: bool) -> Option<usize> {
        let len = self.tracks.len();
        let mut candidates: Vec<usize> = (0..len).filter(|i| !self.played.contains(i)).collect();

        if candidates.is_empty() {
            if !wrap {
                return None;
            }

            debug!("shuffle cycle complete, starting a new one");
            self.played.clear();
            let keep = self.history.len().saturating_sub(1);
            self.history.drain(..keep);
            candidates = (0..len)
                .filter(|&i| len == 1 || Some(i) != self.current)
                .collect();
        }

        let pick = self.rng.random_range(0..candidates.len());
        Some(candidates[pick])
    }

    fn visit(&mut self, index: usize) {
        self.current = Some(index);
        self.played.insert(index);
        if self.shuffle {
            self.history.push(index);
        }
    }
}

fn ensure_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::InvalidQueueIndex { index, len })
    }
}
