// Remote continuation queue
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{QueueSource, Status};
use crate::catalog::{Catalog, WatchEndpoint};
use crate::db::models::Song;
use crate::error::CatalogError;

/// Queue fed page by page from the catalog's "next" endpoint.
///
/// The endpoint returned with each page replaces the one sent, since the
/// catalog may reseed a radio between pages.
pub struct RemoteQueue {
    catalog: Arc<dyn Catalog>,
    endpoint: WatchEndpoint,
    continuation: Option<String>,
    preload_item: Option<Song>,
    playlist_id: Option<String>,
    start_shuffled: bool,
}

impl RemoteQueue {
    pub fn new(catalog: Arc<dyn Catalog>, endpoint: WatchEndpoint) -> Self {
        Self {
            catalog,
            playlist_id: endpoint.playlist_id.clone(),
            endpoint,
            continuation: None,
            preload_item: None,
            start_shuffled: false,
        }
    }

    /// Radio seeded from a single song, which is shown while the first page loads
    pub fn radio(catalog: Arc<dyn Catalog>, song: Song) -> Self {
        let mut queue = Self::new(catalog, WatchEndpoint::for_video(song.id.clone()));
        queue.preload_item = Some(song);
        queue
    }

    /// Resume from a cursor obtained earlier
    pub fn with_continuation(mut self, continuation: impl Into<String>) -> Self {
        self.continuation = Some(continuation.into());
        self
    }

    pub fn shuffled(mut self, start_shuffled: bool) -> Self {
        self.start_shuffled = start_shuffled;
        self
    }

    pub fn endpoint(&self) -> &WatchEndpoint {
        &self.endpoint
    }

    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }
}

#[async_trait]
impl QueueSource for RemoteQueue {
    fn preload_item(&self) -> Option<&Song> {
        self.preload_item.as_ref()
    }

    fn playlist_id(&self) -> Option<&str> {
        self.playlist_id.as_deref()
    }

    fn start_shuffled(&self) -> bool {
        self.start_shuffled
    }

    async fn initial_status(&mut self) -> Result<Status, CatalogError> {
        let result = self
            .catalog
            .next(&self.endpoint, self.continuation.as_deref())
            .await?;

        self.endpoint = result.endpoint;
        self.continuation = result.continuation;
        Ok(Status {
            title: result.title,
            items: result.items,
            media_item_index: result.current_index.unwrap_or(0),
            position: 0,
        })
    }

    fn has_next_page(&self) -> bool {
        self.continuation.is_some()
    }

    async fn next_page(&mut self) -> Vec<Song> {
        let Some(continuation) = self.continuation.as_deref() else {
            return Vec::new();
        };

        let fetched = self.catalog.next(&self.endpoint, Some(continuation)).await;
        match fetched {
            Ok(result) => {
                debug!("fetched {} more songs", result.items.len());
                self.endpoint = result.endpoint;
                self.continuation = result.continuation;
                result.items
            }
            Err(e) => {
                warn!("failed to load next page, ending queue: {e}");
                self.continuation = None;
                Vec::new()
            }
        }
    }
}
