// Queue sources
// A source produces the first page of a queue and optionally more pages later

pub mod empty;
pub mod local_album;
pub mod remote;

use async_trait::async_trait;

use crate::db::models::Song;
use crate::error::CatalogError;
use crate::queue::{AddQueueOptions, MultiQueue, QueueBoard};

pub use empty::EmptyQueue;
pub use local_album::{AlbumWithSongs, LocalAlbumRadio};
pub use remote::RemoteQueue;

/// First page of a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub title: Option<String>,
    pub items: Vec<Song>,
    /// Index into `items` to start playing from
    pub media_item_index: i32,
    /// Start offset inside that song
    pub position: i64,
}

/// Something that can feed a queue.
///
/// Paging methods take `&mut self`, so one source never has two fetches in
/// flight. Implementations only touch their retained cursor after a fetch
/// completes: dropping an unfinished future loses that page and nothing else.
#[async_trait]
pub trait QueueSource: Send {
    /// Song known before anything is fetched, for an instant start
    fn preload_item(&self) -> Option<&Song> {
        None
    }

    fn playlist_id(&self) -> Option<&str>;

    fn start_shuffled(&self) -> bool {
        false
    }

    /// Fetch the first page. A failure means this queue cannot start.
    async fn initial_status(&mut self) -> Result<Status, CatalogError>;

    fn has_next_page(&self) -> bool;

    /// Fetch the following page. Failures end pagination and yield no songs.
    async fn next_page(&mut self) -> Vec<Song>;
}

/// Load a source's first page into the board as a queue of its own.
///
/// The status is fetched by the caller so that the board does not need to be
/// held across the network call. A positive start offset becomes the queue's
/// resume position.
pub fn load_status<'a>(
    board: &'a mut QueueBoard,
    source: &dyn QueueSource,
    status: Status,
    fallback_title: &str,
) -> Option<&'a MultiQueue> {
    let title = status.title.unwrap_or_else(|| fallback_title.to_string());
    let options = AddQueueOptions {
        shuffled: source.start_shuffled(),
        playlist_id: source.playlist_id().map(str::to_string),
        start_index: status.media_item_index.max(0) as usize,
        ..Default::default()
    };

    board.add_queue(&title, status.items, options)?;
    if status.position > 0 {
        board.set_last_song_pos(status.position);
    }
    board.current_queue()
}
