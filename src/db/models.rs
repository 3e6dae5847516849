// Data models
use serde::{Deserialize, Serialize};

/// Duration value used when a song's length is not known
pub const DURATION_UNKNOWN: i32 = -1;

/// Playback position value meaning "no position recorded"
pub const TIME_UNSET: i64 = i64::MIN + 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
}

impl Artist {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub title: String,
}

/// One playable track, either from the local library or the remote catalog.
///
/// `shuffle_index` is only meaningful while the owning queue is shuffled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    /// Seconds, [`DURATION_UNKNOWN`] when not known
    pub duration: i32,
    pub artists: Vec<Artist>,
    pub album: Option<AlbumRef>,
    pub thumbnail_url: Option<String>,
    pub local_path: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<i32>,
    /// Unix seconds
    pub date_added: Option<i64>,
    /// Unix seconds
    pub date_modified: Option<i64>,
    pub play_count: i64,
    #[serde(default)]
    pub shuffle_index: i32,
}

impl Song {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: DURATION_UNKNOWN,
            artists: Vec::new(),
            album: None,
            thumbnail_url: None,
            local_path: None,
            year: None,
            track_number: None,
            date_added: None,
            date_modified: None,
            play_count: 0,
            shuffle_index: 0,
        }
    }

    /// Artist names joined for display and sorting
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Header row of a stored queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntity {
    pub id: i64,
    pub title: String,
    pub shuffled: bool,
    pub queue_pos: i32,
    pub last_song_pos: i64,
    pub index: i32,
    pub playlist_id: Option<String>,
}

/// One ordered song reference of a stored queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSongMap {
    pub queue_id: i64,
    pub song_id: String,
    pub position: i64,
    pub shuffled_position: i64,
}
