// Multi-queue manager
// Keeps the stack of stored queues and routes every change to the persister.
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::persistence::{PersistJob, QueuePersister};
use super::MultiQueue;
use crate::db::models::Song;

/// Marks a user-extended copy of a sourced queue (zero-width space keeps it
/// from colliding with a real title ending in " +")
pub const EXTENSION_SUFFIX: &str = " +\u{200B}";

/// How [`QueueBoard::add_queue`] treats a title that already exists
#[derive(Debug, Clone)]
pub struct AddQueueOptions {
    pub shuffled: bool,
    /// Add the songs even when the queue already holds exactly these songs
    pub force_insert: bool,
    /// Replace every song of the existing queue. Overrides the other flags.
    pub replace: bool,
    /// Only add songs that are not yet in the existing queue
    pub delta: bool,
    pub playlist_id: Option<String>,
    /// Song to start from, as an index into the given songs
    pub start_index: usize,
}

impl Default for AddQueueOptions {
    fn default() -> Self {
        Self {
            shuffled: false,
            force_insert: false,
            replace: false,
            delta: true,
            playlist_id: None,
            start_index: 0,
        }
    }
}

/// Ordered set of stored queues; the last one is the most recently used.
pub struct QueueBoard {
    master_queues: Vec<MultiQueue>,
    master_index: Option<usize>,
    max_queues: usize,
    persister: Option<QueuePersister>,
}

impl QueueBoard {
    /// Build a board from restored queues, keeping only the newest `max_queues`
    pub fn new(queues: Vec<MultiQueue>, max_queues: usize, persister: Option<QueuePersister>) -> Self {
        let max_queues = max_queues.max(1);
        let skip = queues.len().saturating_sub(max_queues);
        let master_queues: Vec<MultiQueue> = queues.into_iter().skip(skip).collect();

        let mut board = Self {
            master_index: master_queues.len().checked_sub(1),
            master_queues,
            max_queues,
            persister,
        };
        board.regenerate_indexes();
        board
    }

    pub fn all_queues(&self) -> &[MultiQueue] {
        &self.master_queues
    }

    pub fn master_index(&self) -> Option<usize> {
        self.master_index
    }

    pub fn len(&self) -> usize {
        self.master_queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.master_queues.is_empty()
    }

    pub fn current_queue(&self) -> Option<&MultiQueue> {
        self.master_index.and_then(|i| self.master_queues.get(i))
    }

    pub fn current_queue_mut(&mut self) -> Option<&mut MultiQueue> {
        self.master_index.and_then(|i| self.master_queues.get_mut(i))
    }

    fn persist(&self, job: PersistJob) {
        if let Some(persister) = &self.persister {
            persister.submit(job);
        }
    }

    fn save_songs(&self, index: usize) {
        if let Some(mq) = self.master_queues.get(index) {
            self.persist(PersistJob::SaveSongs(mq.clone()));
        }
    }

    fn save_header(&self, index: usize) {
        if let Some(mq) = self.master_queues.get(index) {
            self.persist(PersistJob::SaveHeader(mq.clone()));
        }
    }

    fn save_all(&self) {
        self.persist(PersistJob::SaveAll(self.master_queues.clone()));
    }

    fn regenerate_indexes(&mut self) {
        for (index, mq) in self.master_queues.iter_mut().enumerate() {
            mq.index = index as i32;
        }
    }

    /// Move the queue at `index` to the top of the board and make it current
    fn bubble_up(&mut self, index: usize) {
        if index >= self.master_queues.len() {
            warn!("bubble up index {index} out of bounds");
            return;
        }

        let mq = self.master_queues.remove(index);
        self.master_queues.push(mq);
        self.master_index = Some(self.master_queues.len() - 1);

        self.regenerate_indexes();
        self.save_all();
    }

    fn generate_queue_id(&self) -> i64 {
        let taken: HashSet<i64> = self.master_queues.iter().map(|q| q.id).collect();
        let mut rng = rand::thread_rng();
        loop {
            let id = rng.gen_range(10_000_000..100_000_000);
            if !taken.contains(&id) {
                return id;
            }
        }
    }

    /// Add songs under `title`, the identity of a queue.
    ///
    /// 1. No queue has this title: a new queue is created, evicting the oldest
    ///    one when the board is full.
    /// 2. `replace`: every song of the existing queue is replaced.
    /// 3. The existing queue holds exactly these songs and `!force_insert`:
    ///    only the position moves to the start song.
    /// 4. `delta`: songs not yet present are appended, then the position moves
    ///    to the start song.
    /// 5. Otherwise all songs go to the end of the extension queue, which is
    ///    the existing queue renamed when no extension exists yet.
    ///
    /// The queue that received the songs becomes current and is returned.
    /// Empty input returns `None`.
    pub fn add_queue(
        &mut self,
        title: &str,
        songs: Vec<Song>,
        options: AddQueueOptions,
    ) -> Option<&MultiQueue> {
        if songs.is_empty() {
            return None;
        }
        debug!(
            "adding {} songs to queue \"{title}\" (force_insert={}, replace={}, delta={}, start_index={})",
            songs.len(),
            options.force_insert,
            options.replace,
            options.delta,
            options.start_index
        );

        let start_id = songs.get(options.start_index).map(|s| s.id.clone());

        let Some(matched) = self.master_queues.iter().position(|q| q.title == title) else {
            if self.master_queues.len() >= self.max_queues {
                self.delete_queue(0);
            }

            let mut mq = MultiQueue::new(
                self.generate_queue_id(),
                title,
                songs,
                self.master_queues.len() as i32,
            );
            mq.queue_pos = options.start_index as i32;
            mq.playlist_id = options.playlist_id;
            if options.shuffled {
                mq.shuffle(false);
            }

            self.master_queues.push(mq);
            let index = self.master_queues.len() - 1;
            self.master_index = Some(index);
            self.save_songs(index);
            return self.master_queues.get(index);
        };

        let extension_title = format!("{title}{EXTENSION_SUFFIX}");
        let extension = self
            .master_queues
            .iter()
            .position(|q| q.title == extension_title);

        let target = {
            let mq = &mut self.master_queues[matched];
            let existing: HashSet<String> = mq.songs().iter().map(|s| s.id.clone()).collect();
            let same_songs =
                songs.len() == mq.size() && songs.iter().all(|s| existing.contains(&s.id));

            if options.replace {
                mq.replace_all(songs);
                mq.unshuffle();
                mq.queue_pos = options.start_index as i32;
                matched
            } else if same_songs && !options.force_insert {
                debug!("queue \"{title}\" already holds these songs, jumping only");
                jump_to(mq, start_id.as_deref());
                matched
            } else if options.delta {
                let mut seen = existing;
                let fresh: Vec<Song> = songs
                    .into_iter()
                    .filter(|s| seen.insert(s.id.clone()))
                    .collect();
                mq.append(fresh);
                jump_to(mq, start_id.as_deref());
                matched
            } else if let Some(extension) = extension {
                self.master_queues[extension].append(songs);
                extension
            } else {
                if !mq.title.ends_with(EXTENSION_SUFFIX) {
                    mq.title = extension_title;
                }
                mq.append(songs);
                matched
            }
        };

        let mq = &mut self.master_queues[target];
        if options.shuffled {
            mq.shuffle(false);
        }
        mq.playlist_id = options.playlist_id;

        self.master_index = Some(target);
        self.save_songs(target);
        self.master_queues.get(target)
    }

    /// Append songs to the end of the current queue
    pub fn enqueue_end(&mut self, songs: Vec<Song>) {
        if let Some(index) = self.master_index {
            self.add_songs_to_queue(index, usize::MAX, songs);
        }
    }

    /// Insert songs into a queue at a position of its displayed view (clamped)
    /// and make it current
    pub fn add_songs_to_queue(&mut self, queue_index: usize, pos: usize, songs: Vec<Song>) {
        let Some(mq) = self.master_queues.get_mut(queue_index) else {
            warn!("cannot add songs, no queue at index {queue_index}");
            return;
        };
        debug!("inserting {} songs at position {pos}", songs.len());
        mq.insert_songs(pos, songs);

        self.master_index = Some(queue_index);
        self.save_songs(queue_index);
    }

    /// Remove a song by its position in the displayed view. A queue left
    /// without songs is deleted.
    pub fn remove_song(&mut self, queue_index: usize, view_index: usize) -> bool {
        let Some(mq) = self.master_queues.get_mut(queue_index) else {
            return false;
        };
        if mq.remove_song(view_index).is_none() {
            return false;
        }

        if mq.is_empty() {
            self.delete_queue(queue_index);
        } else {
            self.save_songs(queue_index);
        }
        true
    }

    pub fn remove_current_queue_song(&mut self, view_index: usize) -> bool {
        match self.master_index {
            Some(index) => self.remove_song(index, view_index),
            None => false,
        }
    }

    /// Remove a queue from the board and from storage. Returns the number of
    /// queues left.
    pub fn delete_queue(&mut self, queue_index: usize) -> usize {
        if queue_index >= self.master_queues.len() {
            warn!("cannot find queue to delete at index {queue_index}");
            return self.master_queues.len();
        }

        let removed = self.master_queues.remove(queue_index);
        self.persist(PersistJob::Delete(removed.id));

        self.master_index = match self.master_index {
            _ if self.master_queues.is_empty() => None,
            Some(current) if current > queue_index => Some(current - 1),
            Some(current) if current == queue_index => Some(current.saturating_sub(1)),
            other => other,
        };

        self.regenerate_indexes();
        self.save_all();
        self.master_queues.len()
    }

    /// Shuffle a queue and bring it to the top. Returns its new canonical position.
    pub fn shuffle(&mut self, queue_index: usize, preserve_current: bool) -> i32 {
        let Some(mq) = self.master_queues.get_mut(queue_index) else {
            return 0;
        };
        let queue_pos = mq.shuffle(preserve_current);

        self.save_songs(queue_index);
        self.bubble_up(queue_index);
        queue_pos
    }

    pub fn shuffle_current(&mut self, preserve_current: bool) -> i32 {
        match self.master_index {
            Some(index) => self.shuffle(index, preserve_current),
            None => 0,
        }
    }

    /// Restore canonical order and bring the queue to the top
    pub fn unshuffle(&mut self, queue_index: usize) -> i32 {
        let Some(mq) = self.master_queues.get_mut(queue_index) else {
            return 0;
        };
        let queue_pos = mq.unshuffle();

        self.save_songs(queue_index);
        self.bubble_up(queue_index);
        queue_pos
    }

    pub fn unshuffle_current(&mut self) -> i32 {
        match self.master_index {
            Some(index) => self.unshuffle(index),
            None => 0,
        }
    }

    /// Reorder the board. The current queue stays current.
    pub fn move_queue(&mut self, from: usize, to: usize) {
        let len = self.master_queues.len();
        if from >= len || to >= len {
            warn!("queue move {from} -> {to} out of bounds");
            return;
        }

        if let Some(current) = self.master_index {
            self.master_index = Some(if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            });
        }

        let mq = self.master_queues.remove(from);
        self.master_queues.insert(to, mq);
        self.regenerate_indexes();
        self.save_all();
    }

    /// Move a song within the current queue's displayed view
    pub fn move_song(&mut self, from: usize, to: usize) -> Option<i32> {
        let index = self.master_index?;
        let mq = self.master_queues.get_mut(index)?;
        let pos = mq.move_song(from, to);

        self.save_songs(index);
        Some(pos)
    }

    pub fn rename_queue(&mut self, queue_index: usize, title: impl Into<String>) {
        if let Some(mq) = self.master_queues.get_mut(queue_index) {
            mq.title = title.into();
            self.save_header(queue_index);
        }
    }

    /// Make a queue current, moving it to the top of the board
    pub fn set_current_queue(&mut self, queue_index: usize) -> Option<&MultiQueue> {
        if queue_index >= self.master_queues.len() {
            return None;
        }
        self.bubble_up(queue_index);
        self.current_queue()
    }

    /// Track a song change of the current queue (index into its displayed view)
    pub fn set_current_queue_pos(&mut self, view_index: i32) {
        let Some(index) = self.master_index else {
            return;
        };
        if let Some(mq) = self.master_queues.get_mut(index) {
            mq.set_current_queue_pos(view_index);
            self.save_header(index);
        }
    }

    /// Remember the playback position inside the current song
    pub fn set_last_song_pos(&mut self, position: i64) {
        let Some(index) = self.master_index else {
            return;
        };
        if let Some(mq) = self.master_queues.get_mut(index) {
            mq.last_song_pos = position;
            self.save_header(index);
        }
    }

    /// Wait for pending writes to reach the database
    pub async fn flush(&mut self) {
        if let Some(persister) = self.persister.as_mut() {
            persister.shutdown().await;
        }
        self.persister = None;
    }
}

fn jump_to(mq: &mut MultiQueue, song_id: Option<&str>) {
    let Some(song_id) = song_id else {
        return;
    };
    if let Some(pos) = mq.songs().iter().position(|s| s.id == song_id) {
        mq.queue_pos = pos as i32;
    }
}
