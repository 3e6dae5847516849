// Library module
// Folder trees of local songs: scanning, sorting and cached lookups

pub mod directory_tree;
pub mod scanner;
pub mod sort;
pub mod tree_cache;

pub use directory_tree::DirectoryTree;
pub use scanner::{DirectoryScanner, LibraryScanner, ScanProgress, ScanResult};
pub use sort::SongSortType;
pub use tree_cache::TreeCache;
