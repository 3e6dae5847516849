// Application state management
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::connection::DatabaseConnection;
use crate::db::models::Song;
use crate::db::operations::DbOperations;
use crate::library::{DirectoryTree, TreeCache};
use crate::queue::{QueueBoard, QueuePersister};
use crate::settings::AppSettings;

pub struct AppState {
    pub db: DatabaseConnection,
    pub board: Arc<Mutex<QueueBoard>>,
    pub tree_cache: Arc<RwLock<TreeCache>>,
    pub settings: AppSettings,
    pub app_dir: PathBuf,
}

impl AppState {
    /// Restore the stored queues and wire up background persistence.
    /// Needs a running tokio runtime when `persistent_queue` is on.
    pub fn new(db: DatabaseConnection, settings: AppSettings, app_dir: PathBuf) -> Result<Self, anyhow::Error> {
        let queue_settings = &settings.queue;
        let (queues, persister) = if queue_settings.persistent_queue {
            let queues = DbOperations::read_queues(&db)?;
            let persister = QueuePersister::spawn(db.clone(), queue_settings.save_delay());
            (queues, Some(persister))
        } else {
            (Vec::new(), None)
        };

        let board = QueueBoard::new(queues, queue_settings.max_queues(), persister);

        Ok(Self {
            db,
            board: Arc::new(Mutex::new(board)),
            tree_cache: Arc::new(RwLock::new(TreeCache::new())),
            settings,
            app_dir,
        })
    }

    /// Apply the folder display settings to a freshly scanned tree and cache it
    pub fn install_tree(&self, tree: DirectoryTree) -> usize {
        let library = &self.settings.library;
        let mut tree = if library.collapse_storage_root {
            tree.android_storage_workaround()
        } else {
            tree
        };
        if library.trim_root {
            tree.trim_root();
        }

        let mut cache = self.tree_cache.write();
        cache.invalidate_all();
        cache.populate(&tree);
        cache.len()
    }

    /// Songs of one cached folder in the configured order
    pub fn folder_songs(&self, path: &str) -> Vec<Song> {
        let library = &self.settings.library;
        let cache = self.tree_cache.read();
        cache
            .get(path)
            .to_sorted_list(library.folder_sort, library.folder_sort_descending)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SongSortType;
    use crate::queue::MultiQueue;

    fn song(path: &str, title: &str) -> Song {
        let mut song = Song::new(path, title);
        song.local_path = Some(path.to_string());
        song
    }

    fn scanned() -> DirectoryTree {
        let mut root = DirectoryTree::new("/");
        for (path, title) in [
            ("/storage/emulated/0/Music/b.mp3", "beta"),
            ("/storage/emulated/0/Music/a.mp3", "alpha"),
        ] {
            root.insert(path, song(path, title));
        }
        root.mark_populated();
        root
    }

    fn settings(persistent: bool) -> AppSettings {
        let mut settings = AppSettings::default();
        settings.queue.persistent_queue = persistent;
        settings.queue.save_delay_ms = 0;
        settings
    }

    #[tokio::test]
    async fn test_restores_stored_queues() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let stored = MultiQueue::new(7, "Stored", vec![song("/a.mp3", "a")], 0);
        DbOperations::save_queue(&db, &stored).unwrap();

        let state = AppState::new(db, settings(true), PathBuf::from(".")).unwrap();
        let mut board = state.board.lock().await;
        assert_eq!(board.len(), 1);
        assert_eq!(board.all_queues()[0].title, "Stored");
        board.flush().await;
    }

    #[tokio::test]
    async fn test_non_persistent_board_starts_empty() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let stored = MultiQueue::new(7, "Stored", vec![song("/a.mp3", "a")], 0);
        DbOperations::save_queue(&db, &stored).unwrap();

        let state = AppState::new(db, settings(false), PathBuf::from(".")).unwrap();
        assert!(state.board.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_install_tree_collapses_storage_and_sorts() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mut settings = settings(false);
        settings.library.folder_sort = SongSortType::Name;
        let state = AppState::new(db, settings, PathBuf::from(".")).unwrap();

        let cached = state.install_tree(scanned());
        assert!(cached > 0);

        let titles: Vec<String> = state
            .folder_songs("/storage/emulated/0/Music")
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["alpha", "beta"]);
        assert!(state.folder_songs("/nowhere").is_empty());
    }

    #[tokio::test]
    async fn test_install_tree_keeps_desktop_roots() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let state = AppState::new(db, settings(false), PathBuf::from(".")).unwrap();

        let mut root = DirectoryTree::new("/");
        for (path, title) in [("/home/alice/Music/x.mp3", "x"), ("/home/alice/y.mp3", "y")] {
            root.insert(path, song(path, title));
        }
        root.mark_populated();
        state.install_tree(root);

        let cache = state.tree_cache.read();
        assert!(!cache.get("/home").is_uninitialized());
        assert!(cache.get("/storage").is_uninitialized());
        drop(cache);
        assert_eq!(state.folder_songs("/home/alice").len(), 1);
    }
}
