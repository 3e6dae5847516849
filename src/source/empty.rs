use async_trait::async_trait;

use super::{QueueSource, Status};
use crate::db::models::Song;
use crate::error::CatalogError;

/// Source with nothing to play
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyQueue;

#[async_trait]
impl QueueSource for EmptyQueue {
    fn playlist_id(&self) -> Option<&str> {
        None
    }

    async fn initial_status(&mut self) -> Result<Status, CatalogError> {
        Ok(Status {
            title: None,
            items: Vec::new(),
            media_item_index: -1,
            position: 0,
        })
    }

    fn has_next_page(&self) -> bool {
        false
    }

    async fn next_page(&mut self) -> Vec<Song> {
        Vec::new()
    }
}
