// Remote catalog module
// The catalog answers "what plays next" requests with pages of songs

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::models::Song;
use crate::error::CatalogError;

pub use http::HttpCatalog;

/// Where a remote queue continues from: a seed song, a playlist, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEndpoint {
    pub video_id: Option<String>,
    pub playlist_id: Option<String>,
    pub params: Option<String>,
    pub index: Option<i32>,
}

impl WatchEndpoint {
    pub fn for_video(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Default::default()
        }
    }

    pub fn for_playlist(playlist_id: impl Into<String>) -> Self {
        Self {
            playlist_id: Some(playlist_id.into()),
            ..Default::default()
        }
    }
}

/// One page returned by [`Catalog::next`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextResult {
    pub title: Option<String>,
    pub items: Vec<Song>,
    /// Index of the requested song within `items`, when the catalog knows it
    pub current_index: Option<i32>,
    /// Endpoint to use for the following request. It can differ from the one sent.
    pub endpoint: WatchEndpoint,
    /// Opaque cursor; `None` once the list is exhausted
    pub continuation: Option<String>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn next(
        &self,
        endpoint: &WatchEndpoint,
        continuation: Option<&str>,
    ) -> Result<NextResult, CatalogError>;

    /// Resolve the playlist id that continues an album
    async fn album_playlist_id(&self, browse_id: &str) -> Result<String, CatalogError>;
}
