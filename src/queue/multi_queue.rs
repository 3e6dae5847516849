// Shuffle-aware playback queue
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::db::models::{QueueEntity, Song, TIME_UNSET};

/// Outcome of checking `queue_pos` against the queue bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosCheck {
    Ok,
    /// The position was out of range; shuffle state was discarded and
    /// playback restarts from the first song.
    Repaired,
}

/// A playlist in progress.
///
/// `queue` always holds the canonical (unshuffled) order. The shuffled view is
/// derived by sorting on each song's `shuffle_index` and is never stored.
/// `queue_pos` indexes the canonical order, even while shuffled.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiQueue {
    pub id: i64,
    pub title: String,
    pub(crate) queue: Vec<Song>,
    pub shuffled: bool,
    pub queue_pos: i32,
    pub last_song_pos: i64,
    /// Order among all stored queues
    pub index: i32,
    /// External list id used to request a continuation of this queue
    pub playlist_id: Option<String>,
}

impl MultiQueue {
    pub fn new(id: i64, title: impl Into<String>, songs: Vec<Song>, index: i32) -> Self {
        let mut queue = Self {
            id,
            title: title.into(),
            queue: songs,
            shuffled: false,
            queue_pos: 0,
            last_song_pos: TIME_UNSET,
            index,
            playlist_id: None,
        };
        queue.reset_shuffle_indexes();
        queue
    }

    /// Rebuild a queue from its stored header. Song ranks are taken as-is.
    pub fn from_entity(entity: QueueEntity, songs: Vec<Song>) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            queue: songs,
            shuffled: entity.shuffled,
            queue_pos: entity.queue_pos,
            last_song_pos: entity.last_song_pos,
            index: entity.index,
            playlist_id: entity.playlist_id,
        }
    }

    pub fn to_entity(&self) -> QueueEntity {
        QueueEntity {
            id: self.id,
            title: self.title.clone(),
            shuffled: self.shuffled,
            queue_pos: self.queue_pos,
            last_song_pos: self.last_song_pos,
            index: self.index,
            playlist_id: self.playlist_id.clone(),
        }
    }

    /// Songs in canonical order
    pub fn songs(&self) -> &[Song] {
        &self.queue
    }

    pub fn song_ids(&self) -> Vec<&str> {
        self.queue.iter().map(|s| s.id.as_str()).collect()
    }

    /// Snapshot of the queue as the user sees it, with shuffle state taken into account
    pub fn current_queue_shuffled(&self) -> Vec<Song> {
        let mut view = self.queue.clone();
        if self.shuffled {
            view.sort_by_key(|s| s.shuffle_index);
        }
        view
    }

    /// Canonical indexes listed in view order
    fn view_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.queue.len()).collect();
        if self.shuffled {
            order.sort_by_key(|&i| self.queue[i].shuffle_index);
        }
        order
    }

    /// Retrieve the song at the current position
    pub fn current_song(&mut self) -> Option<&Song> {
        self.validate_queue_pos();
        self.queue.get(self.queue_pos as usize)
    }

    /// Look a song up by id, preferring the current song when it matches
    pub fn find_song(&mut self, media_id: &str) -> Option<&Song> {
        self.validate_queue_pos();
        let pos = self.queue_pos as usize;
        if self.queue.get(pos).is_some_and(|s| s.id == media_id) {
            return self.queue.get(pos);
        }

        self.queue.iter().find(|s| s.id == media_id)
    }

    /// Index of the current song within the displayed (possibly shuffled) view
    pub fn queue_pos_shuffled(&mut self) -> i32 {
        self.validate_queue_pos();
        if !self.shuffled {
            return self.queue_pos;
        }
        self.queue
            .get(self.queue_pos as usize)
            .map(|s| s.shuffle_index)
            .unwrap_or(self.queue_pos)
    }

    /// Move the current position to `index` of the displayed view.
    ///
    /// When shuffled and no song carries that rank, the position becomes
    /// invalid and is repaired on the next access.
    pub fn set_current_queue_pos(&mut self, index: i32) {
        if self.queue_pos_shuffled() == index {
            return;
        }

        self.queue_pos = if self.shuffled {
            self.queue
                .iter()
                .position(|s| s.shuffle_index == index)
                .map(|p| p as i32)
                .unwrap_or(-1)
        } else {
            index
        };
    }

    /// Enforce `0 <= queue_pos < size` for non-empty queues.
    ///
    /// Repairing resets every rank to its canonical index and clears the
    /// shuffle flag, so the previous shuffle order is lost.
    pub fn validate_queue_pos(&mut self) -> PosCheck {
        if self.queue.is_empty() {
            return PosCheck::Ok;
        }
        if self.queue_pos >= 0 && (self.queue_pos as usize) < self.queue.len() {
            return PosCheck::Ok;
        }

        warn!(
            queue = %self.title,
            queue_pos = self.queue_pos,
            size = self.queue.len(),
            shuffled = self.shuffled,
            "queue position out of range, discarding shuffle state"
        );
        self.reset_shuffle_indexes();
        self.shuffled = false;
        self.queue_pos = 0;
        PosCheck::Repaired
    }

    /// Total duration in seconds. Unknown durations count as their stored value.
    pub fn duration(&self) -> i64 {
        self.queue.iter().map(|s| s.duration as i64).sum()
    }

    pub fn size(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Replace every song at once.
    ///
    /// `queue_pos`, `shuffled` and the ranks are left untouched; the caller is
    /// responsible for making them consistent again.
    pub fn replace_all(&mut self, songs: Vec<Song>) {
        self.queue.clear();
        self.queue.extend(songs);
    }

    fn reset_shuffle_indexes(&mut self) {
        for (i, song) in self.queue.iter_mut().enumerate() {
            song.shuffle_index = i as i32;
        }
    }

    /// Shuffle with the thread-local rng. See [`MultiQueue::shuffle_with`].
    pub fn shuffle(&mut self, preserve_current: bool) -> i32 {
        self.shuffle_with(&mut rand::thread_rng(), preserve_current)
    }

    /// Assign a fresh random permutation of ranks.
    ///
    /// With `preserve_current` the current song takes rank 0 and stays current.
    /// Otherwise the song that drew rank 0 becomes current and the resume
    /// position is dropped. Returns the new canonical `queue_pos`.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R, preserve_current: bool) -> i32 {
        if self.queue.is_empty() {
            return 0;
        }
        self.validate_queue_pos();
        let current = self.queue_pos as usize;

        let mut ranks: Vec<i32> = (0..self.queue.len() as i32).collect();
        ranks.shuffle(rng);
        for (song, rank) in self.queue.iter_mut().zip(ranks) {
            song.shuffle_index = rank;
        }

        let first = self.queue.iter().position(|s| s.shuffle_index == 0).unwrap_or(current);
        if preserve_current {
            if first != current {
                self.queue[first].shuffle_index = self.queue[current].shuffle_index;
                self.queue[current].shuffle_index = 0;
            }
        } else {
            self.queue_pos = first as i32;
            self.last_song_pos = TIME_UNSET;
        }

        self.shuffled = true;
        self.queue_pos
    }

    /// Return to canonical order. The current song stays current.
    pub fn unshuffle(&mut self) -> i32 {
        self.shuffled = false;
        self.reset_shuffle_indexes();
        self.queue_pos
    }

    /// Insert songs at `view_pos` of the displayed view (clamped to the end).
    pub fn insert_songs(&mut self, view_pos: usize, songs: Vec<Song>) {
        if songs.is_empty() {
            return;
        }
        let count = songs.len();
        let pos = view_pos.min(self.queue.len());

        if self.shuffled {
            for song in self.queue.iter_mut() {
                if song.shuffle_index >= pos as i32 {
                    song.shuffle_index += count as i32;
                }
            }
            for (offset, mut song) in songs.into_iter().enumerate() {
                song.shuffle_index = (pos + offset) as i32;
                self.queue.push(song);
            }
        } else {
            let was_empty = self.queue.is_empty();
            self.queue.splice(pos..pos, songs);
            if !was_empty && self.queue_pos >= pos as i32 {
                self.queue_pos += count as i32;
            }
            self.reset_shuffle_indexes();
        }
    }

    /// Add songs after the last one in the displayed view
    pub fn append(&mut self, songs: Vec<Song>) {
        self.insert_songs(self.queue.len(), songs);
    }

    /// Remove the song at `view_index` of the displayed view.
    ///
    /// If the current song is removed, the song that takes its place in the
    /// view becomes current.
    pub fn remove_song(&mut self, view_index: usize) -> Option<Song> {
        if view_index >= self.queue.len() {
            return None;
        }
        self.validate_queue_pos();

        let order = self.view_order();
        let current_view = order
            .iter()
            .position(|&i| i == self.queue_pos as usize)
            .unwrap_or(0);
        let canonical = order[view_index];
        let removed = self.queue.remove(canonical);

        let order: Vec<usize> = order
            .into_iter()
            .filter(|&i| i != canonical)
            .map(|i| if i > canonical { i - 1 } else { i })
            .collect();
        for (rank, &i) in order.iter().enumerate() {
            self.queue[i].shuffle_index = rank as i32;
        }

        if self.queue.is_empty() {
            self.queue_pos = 0;
            return Some(removed);
        }

        let new_view = if view_index < current_view {
            current_view - 1
        } else {
            current_view
        }
        .min(self.queue.len() - 1);
        self.queue_pos = order[new_view] as i32;

        Some(removed)
    }

    /// Move a song within the displayed view. Returns the view position of
    /// the current song afterwards.
    pub fn move_song(&mut self, from: usize, to: usize) -> i32 {
        if from >= self.queue.len() || to >= self.queue.len() {
            return self.queue_pos_shuffled();
        }
        self.validate_queue_pos();
        let current = self.queue_pos as usize;

        let mut order = self.view_order();
        let moved = order.remove(from);
        order.insert(to, moved);

        if self.shuffled {
            for (rank, &i) in order.iter().enumerate() {
                self.queue[i].shuffle_index = rank as i32;
            }
        } else {
            let song = self.queue.remove(from);
            self.queue.insert(to, song);
            self.queue_pos = order.iter().position(|&i| i == current).unwrap_or(0) as i32;
            self.reset_shuffle_indexes();
        }

        self.queue_pos_shuffled()
    }
}
