// Local album radio
// Plays a stored album, then continues with the catalog's radio for it.
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{QueueSource, Status};
use crate::catalog::{Catalog, NextResult, WatchEndpoint};
use crate::db::models::{AlbumRef, Song};
use crate::error::CatalogError;

/// Catalog params asking for an album radio rather than the bare playlist
const ALBUM_RADIO_PARAMS: &str = "wAEB";

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumWithSongs {
    pub album: AlbumRef,
    pub songs: Vec<Song>,
}

pub struct LocalAlbumRadio {
    catalog: Arc<dyn Catalog>,
    album: AlbumWithSongs,
    start_index: i32,
    playlist_id: Option<String>,
    continuation: Option<String>,
    first_time_loaded: bool,
}

impl LocalAlbumRadio {
    pub fn new(catalog: Arc<dyn Catalog>, album: AlbumWithSongs, start_index: i32) -> Self {
        Self {
            catalog,
            album,
            start_index,
            playlist_id: None,
            continuation: None,
            first_time_loaded: false,
        }
    }

    fn endpoint(playlist_id: &str) -> WatchEndpoint {
        WatchEndpoint {
            playlist_id: Some(playlist_id.to_string()),
            params: Some(ALBUM_RADIO_PARAMS.to_string()),
            ..Default::default()
        }
    }

    async fn fetch_first_page(&self) -> Result<(String, NextResult), CatalogError> {
        let playlist_id = self.catalog.album_playlist_id(&self.album.album.id).await?;
        let result = self
            .catalog
            .next(&Self::endpoint(&playlist_id), None)
            .await?;
        Ok((playlist_id, result))
    }
}

#[async_trait]
impl QueueSource for LocalAlbumRadio {
    fn playlist_id(&self) -> Option<&str> {
        self.playlist_id.as_deref()
    }

    /// The album is already known, no request is made
    async fn initial_status(&mut self) -> Result<Status, CatalogError> {
        Ok(Status {
            title: Some(self.album.album.title.clone()),
            items: self.album.songs.clone(),
            media_item_index: self.start_index,
            position: 0,
        })
    }

    fn has_next_page(&self) -> bool {
        !self.first_time_loaded || self.continuation.is_some()
    }

    async fn next_page(&mut self) -> Vec<Song> {
        if !self.first_time_loaded {
            let fetched = self.fetch_first_page().await;
            self.first_time_loaded = true;

            return match fetched {
                Ok((playlist_id, result)) => {
                    self.playlist_id = Some(playlist_id);
                    self.continuation = result.continuation;
                    // The radio starts with the album itself
                    let known = self.album.songs.len();
                    debug!(
                        "album radio returned {} songs, {} already queued",
                        result.items.len(),
                        known
                    );
                    result.items.into_iter().skip(known).collect()
                }
                Err(e) => {
                    warn!("failed to start radio for album {}: {e}", self.album.album.id);
                    self.continuation = None;
                    Vec::new()
                }
            };
        }

        let (Some(playlist_id), Some(continuation)) =
            (self.playlist_id.as_deref(), self.continuation.as_deref())
        else {
            return Vec::new();
        };

        let fetched = self
            .catalog
            .next(&Self::endpoint(playlist_id), Some(continuation))
            .await;
        match fetched {
            Ok(result) => {
                self.continuation = result.continuation;
                result.items
            }
            Err(e) => {
                warn!("failed to load next album radio page, ending queue: {e}");
                self.continuation = None;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{page, songs, FakeCatalog, StalledCatalog};
    use super::*;
    use std::time::Duration;

    fn album(ids: &[&str]) -> AlbumWithSongs {
        AlbumWithSongs {
            album: AlbumRef {
                id: "MPREb_1".to_string(),
                title: "Local Album".to_string(),
            },
            songs: songs(ids),
        }
    }

    #[tokio::test]
    async fn test_initial_status_is_local() {
        let catalog = Arc::new(FakeCatalog::default());
        let mut radio = LocalAlbumRadio::new(catalog.clone(), album(&["a", "b"]), 1);

        let status = radio.initial_status().await.unwrap();
        assert_eq!(status.title.as_deref(), Some("Local Album"));
        assert_eq!(status.items.len(), 2);
        assert_eq!(status.media_item_index, 1);
        assert!(catalog.requests.lock().is_empty());
        assert!(radio.has_next_page());
    }

    #[tokio::test]
    async fn test_first_page_skips_known_songs() {
        let endpoint = LocalAlbumRadio::endpoint("OLAK5uy");
        let catalog = Arc::new(FakeCatalog::with_pages(vec![
            Ok(page(&["a", "b", "c", "x", "y"], Some("c1"), endpoint.clone())),
            Ok(page(&["z"], None, endpoint.clone())),
        ]));
        *catalog.album_playlist.lock() = Some(Ok("OLAK5uy".to_string()));
        let mut radio = LocalAlbumRadio::new(catalog.clone(), album(&["a", "b", "c"]), 0);

        let first: Vec<String> = radio.next_page().await.into_iter().map(|s| s.id).collect();
        assert_eq!(first, vec!["x", "y"]);
        assert_eq!(radio.playlist_id(), Some("OLAK5uy"));
        assert!(radio.has_next_page());

        let second: Vec<String> = radio.next_page().await.into_iter().map(|s| s.id).collect();
        assert_eq!(second, vec!["z"]);
        assert!(!radio.has_next_page());

        let requests = catalog.requests.lock();
        assert_eq!(requests[0], (endpoint.clone(), None));
        assert_eq!(requests[1], (endpoint, Some("c1".to_string())));
    }

    #[tokio::test]
    async fn test_album_lookup_failure_ends_radio() {
        let catalog = Arc::new(FakeCatalog::default());
        let mut radio = LocalAlbumRadio::new(catalog.clone(), album(&["a"]), 0);

        assert!(radio.next_page().await.is_empty());
        assert!(!radio.has_next_page());
        assert!(catalog.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_first_page_can_retry() {
        let mut radio = LocalAlbumRadio::new(Arc::new(StalledCatalog), album(&["a"]), 0);

        let fetch = tokio::time::timeout(Duration::from_millis(20), radio.next_page()).await;
        assert!(fetch.is_err());
        assert!(radio.has_next_page());
        assert!(radio.playlist_id().is_none());
    }
}
