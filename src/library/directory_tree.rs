// Folder tree of local songs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use super::sort::{sort_songs, SongSortType};
use crate::db::models::Song;

/// Top level folder of removable and emulated storage volumes
pub const STORAGE_ROOT: &str = "/storage/";

static NEXT_UID: AtomicU64 = AtomicU64::new(0);

fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// Canonical form of a folder path: "/" + non-empty segments + "/".
///
/// The root normalizes to "/".
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}/", segments.join("/"))
}

/// File name without directories and extensions
fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

/// One folder level with its songs and child folders.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryTree {
    /// Folder name
    pub current_dir: String,
    /// Full path of the parent folder
    pub parent: String,
    pub subdirs: Vec<DirectoryTree>,
    pub files: Vec<Song>,
    /// Assigned when the folder is created. Clones and shallow copies keep
    /// the uid of the folder they were taken from.
    pub uid: u64,
    /// True until a scan has filled this subtree
    pub is_skeleton: bool,
}

impl DirectoryTree {
    pub fn new(current_dir: impl Into<String>) -> Self {
        Self {
            current_dir: current_dir.into(),
            parent: String::new(),
            subdirs: Vec::new(),
            files: Vec::new(),
            uid: next_uid(),
            is_skeleton: true,
        }
    }

    pub fn with_contents(
        current_dir: impl Into<String>,
        subdirs: Vec<DirectoryTree>,
        files: Vec<Song>,
    ) -> Self {
        let mut tree = Self::new(current_dir);
        tree.subdirs = subdirs;
        tree.files = files;
        tree
    }

    /// Node returned by lookups that find nothing
    pub fn uninitialized() -> &'static DirectoryTree {
        static SENTINEL: OnceLock<DirectoryTree> = OnceLock::new();
        SENTINEL.get_or_init(|| DirectoryTree::new(STORAGE_ROOT))
    }

    /// True only for the sentinel itself, not for copies of it
    pub fn is_uninitialized(&self) -> bool {
        std::ptr::eq(self, Self::uninitialized())
    }

    /// Path handed to children as their `parent`
    fn child_parent(&self) -> String {
        match self.parent.as_str() {
            "" => self.current_dir.clone(),
            "/" => format!("/{}", self.current_dir),
            parent => format!("{parent}/{}", self.current_dir),
        }
    }

    /// Add a song under a `/`-separated path relative to this folder. The last
    /// segment is the file name; missing folders are created on the way.
    pub fn insert(&mut self, path: &str, song: Song) {
        let path = path.trim_start_matches('/');
        let Some((dir, rest)) = path.split_once('/') else {
            self.files.push(song);
            return;
        };

        match self.subdirs.iter_mut().position(|d| d.current_dir == dir) {
            Some(index) => self.subdirs[index].insert(rest, song),
            None => {
                let mut tree = DirectoryTree::new(dir);
                tree.parent = self.child_parent();
                tree.insert(rest, song);
                self.subdirs.push(tree);
            }
        }
    }

    /// Find a song by path. The file name is compared without its extension.
    pub fn get_song(&self, path: &str) -> Option<&Song> {
        let path = path.trim_matches('/');
        match path.split_once('/') {
            None => {
                let wanted = file_stem(path);
                self.files.iter().find(|s| {
                    s.local_path
                        .as_deref()
                        .is_some_and(|local| file_stem(local) == wanted)
                })
            }
            Some((dir, rest)) => self
                .subdirs
                .iter()
                .find(|d| d.current_dir == dir)?
                .get_song(rest),
        }
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a Song>) {
        out.extend(self.files.iter());
        for subdir in &self.subdirs {
            subdir.collect_files(out);
        }
    }

    /// Every song of this subtree, depth first
    pub fn to_list(&self) -> Vec<&Song> {
        let mut songs = Vec::new();
        self.collect_files(&mut songs);
        songs
    }

    /// Songs of this folder only, sorted
    pub fn to_sorted_list(&self, sort_type: SongSortType, descending: bool) -> Vec<&Song> {
        let mut songs: Vec<&Song> = self.files.iter().collect();
        sort_songs(&mut songs, sort_type, descending);
        songs
    }

    /// Songs of the whole subtree, sorted, folder structure ignored
    pub fn to_sorted_list_recursive(&self, sort_type: SongSortType, descending: bool) -> Vec<&Song> {
        let mut songs = self.to_list();
        sort_songs(&mut songs, sort_type, descending);
        songs
    }

    fn collect_subdirs<'a>(&'a self, out: &mut Vec<&'a DirectoryTree>, include_empty: bool) {
        if include_empty || !self.files.is_empty() {
            out.push(self);
        }
        for subdir in &self.subdirs {
            subdir.collect_subdirs(out, include_empty);
        }
    }

    /// Pre-order list of folders holding songs (or every folder with `include_empty`)
    pub fn flattened_subdirs(&self, include_empty: bool) -> Vec<&DirectoryTree> {
        let mut result = Vec::new();
        self.collect_subdirs(&mut result, include_empty);
        result
    }

    /// Find a folder anywhere in this tree by full path, or the
    /// [uninitialized](DirectoryTree::uninitialized) sentinel.
    pub fn get_sub_dir(&self, path: &str) -> &DirectoryTree {
        let wanted = normalize_path(path);
        self.flattened_subdirs(true)
            .into_iter()
            .find(|d| normalize_path(&d.full_path()) == wanted)
            .unwrap_or_else(|| Self::uninitialized())
    }

    /// Collapse a root whose only folder is "storage" into "/storage".
    ///
    /// Any other root, including an already collapsed one, is returned unchanged.
    pub fn android_storage_workaround(self) -> Self {
        let storage_only = self.current_dir == "/"
            && self.files.is_empty()
            && self.subdirs.len() == 1
            && self.subdirs[0].current_dir == "storage";
        if !storage_only {
            return self;
        }

        let mut subdirs = self.subdirs;
        let Some(volume) = subdirs.pop() else {
            return Self::with_contents("/", subdirs, self.files);
        };
        let mut tree = Self::with_contents("/storage", volume.subdirs, volume.files);
        tree.is_skeleton = self.is_skeleton;
        tree
    }

    /// Skip leading folders that contain nothing but one other folder
    pub fn trim_root(&mut self) -> &mut Self {
        while self.subdirs.len() == 1 && self.files.is_empty() {
            let Some(child) = self.subdirs.pop() else {
                break;
            };
            let DirectoryTree {
                current_dir,
                parent,
                subdirs,
                files,
                ..
            } = child;
            self.current_dir = current_dir;
            self.parent = parent;
            self.subdirs = subdirs;
            self.files = files;
        }
        self
    }

    /// Label covering this folder and any chain of single-folder, song-less
    /// folders below it, e.g. "A/B/C" when A and B only wrap the next folder
    pub fn squashed_dir(&self) -> String {
        let mut names = vec![self.current_dir.as_str()];
        let mut pointer = self;
        while pointer.subdirs.len() == 1 && pointer.files.is_empty() {
            pointer = &pointer.subdirs[0];
            names.push(pointer.current_dir.as_str());
        }

        names
            .iter()
            .flat_map(|n| n.split('/'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn full_squashed_dir(&self) -> String {
        normalize_path(&format!("{}/{}", self.parent, self.squashed_dir()))
    }

    pub fn full_path(&self) -> String {
        format!("{}/{}", self.parent, self.current_dir)
    }

    /// Flag this folder and everything below as fully scanned
    pub fn mark_populated(&mut self) {
        self.is_skeleton = false;
        for subdir in self.subdirs.iter_mut() {
            subdir.mark_populated();
        }
    }

    /// Copy of this folder with its songs, whose children are empty skeleton placeholders
    pub fn shallow_copy(&self) -> DirectoryTree {
        DirectoryTree {
            current_dir: self.current_dir.clone(),
            parent: self.parent.clone(),
            subdirs: self
                .subdirs
                .iter()
                .map(|d| DirectoryTree {
                    current_dir: d.current_dir.clone(),
                    parent: d.parent.clone(),
                    subdirs: Vec::new(),
                    files: Vec::new(),
                    uid: d.uid,
                    is_skeleton: true,
                })
                .collect(),
            files: self.files.clone(),
            uid: self.uid,
            is_skeleton: self.is_skeleton,
        }
    }

    pub fn song_count(&self) -> usize {
        self.files.len() + self.subdirs.iter().map(|d| d.song_count()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_song(path: &str) -> Song {
        let stem = file_stem(path);
        let mut song = Song::new(format!("LA{stem}"), stem);
        song.local_path = Some(path.to_string());
        song
    }

    fn tree_of(paths: &[&str]) -> DirectoryTree {
        let mut root = DirectoryTree::new("/");
        for path in paths {
            root.insert(path, local_song(path));
        }
        root
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/Music//Rock"), "/Music/Rock/");
        assert_eq!(normalize_path("Music/Rock/"), "/Music/Rock/");
        assert_eq!(normalize_path("//"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_flattened_subdirs_skip_empty_folders() {
        let root = tree_of(&["/Music/Rock/song1.mp3", "/Music/Pop/song2.mp3"]);

        let dirs = root.flattened_subdirs(false);
        let names: Vec<&str> = dirs.iter().map(|d| d.current_dir.as_str()).collect();
        assert_eq!(names, vec!["Rock", "Pop"]);
        assert!(dirs.iter().all(|d| d.files.len() == 1));

        assert_eq!(root.flattened_subdirs(true).len(), 4);
    }

    #[test]
    fn test_insert_then_to_list_recovers_every_song() {
        let paths = [
            "/c.mp3",
            "/Music/b.flac",
            "/Music/Deep/Deeper/a.ogg",
            "/Music/Deep/z.mp3",
            "/Other/y.mp3",
        ];
        let root = tree_of(&paths);

        let mut ids: Vec<&str> = root.to_list().iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["LAa", "LAb", "LAc", "LAy", "LAz"]);
        assert_eq!(root.song_count(), 5);
    }

    #[test]
    fn test_parent_paths() {
        let root = tree_of(&["/Music/Rock/song1.mp3"]);
        let music = &root.subdirs[0];
        let rock = &music.subdirs[0];

        assert_eq!(music.parent, "/");
        assert_eq!(rock.parent, "/Music");
        assert_eq!(normalize_path(&rock.full_path()), "/Music/Rock/");
        assert_eq!(normalize_path(&root.full_path()), "/");
    }

    #[test]
    fn test_get_song() {
        let root = tree_of(&["/Music/Rock/song1.mp3", "/Music/Pop/song2.mp3"]);

        let found = root.get_song("Music/Rock/song1.flac").map(|s| s.id.as_str());
        assert_eq!(found, Some("LAsong1"));
        assert!(root.get_song("Music/Rock/missing.mp3").is_none());
        assert!(root.get_song("Nowhere/song1.mp3").is_none());
    }

    #[test]
    fn test_get_sub_dir() {
        let root = tree_of(&["/Music/Rock/song1.mp3"]);

        let rock = root.get_sub_dir("/Music/Rock");
        assert_eq!(rock.current_dir, "Rock");
        assert!(!rock.is_uninitialized());

        let missing = root.get_sub_dir("/Music/Jazz/");
        assert!(missing.is_uninitialized());
        assert!(missing.is_skeleton);
    }

    #[test]
    fn test_sorted_lists() {
        let mut root = DirectoryTree::new("/");
        for title in ["b", "a", "c"] {
            root.insert(&format!("/x/{title}.mp3"), Song::new(title, title));
        }
        root.insert("/x/sub/0.mp3", Song::new("0", "0"));
        let folder = &root.subdirs[0];

        let ascending: Vec<&str> = folder
            .to_sorted_list(SongSortType::Name, false)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(ascending, vec!["a", "b", "c"]);

        let descending: Vec<&str> = folder
            .to_sorted_list(SongSortType::Name, true)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(descending, vec!["c", "b", "a"]);

        let recursive: Vec<&str> = root
            .to_sorted_list_recursive(SongSortType::Name, false)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(recursive, vec!["0", "a", "b", "c"]);
    }

    #[test]
    fn test_android_storage_workaround_is_idempotent() {
        let root = tree_of(&[
            "/storage/emulated/0/Music/a.mp3",
            "/storage/1234-ABCD/b.mp3",
        ]);

        let collapsed = root.android_storage_workaround();
        assert_eq!(collapsed.current_dir, "/storage");
        let names: Vec<&str> = collapsed.subdirs.iter().map(|d| d.current_dir.as_str()).collect();
        assert_eq!(names, vec!["emulated", "1234-ABCD"]);

        let again = collapsed.clone().android_storage_workaround();
        assert_eq!(again, collapsed);
        assert_eq!(again.song_count(), 2);
    }

    #[test]
    fn test_android_storage_workaround_keeps_other_roots() {
        let root = tree_of(&["/home/alice/Music/x.mp3", "/home/alice/y.mp3"]);
        let kept = root.clone().android_storage_workaround();

        assert_eq!(kept, root);
        assert_eq!(kept.current_dir, "/");
        assert_eq!(kept.subdirs[0].current_dir, "home");
        assert!(!kept.get_sub_dir("/home/alice").is_uninitialized());
        assert!(kept.get_sub_dir("/storage").is_uninitialized());
    }

    #[test]
    fn test_trim_root() {
        let mut root = tree_of(&["/home/user/Music/a.mp3", "/home/user/Music/Live/b.mp3"]);
        root.trim_root();

        assert_eq!(root.current_dir, "Music");
        assert_eq!(root.files.len(), 1);
        assert_eq!(normalize_path(&root.full_path()), "/home/user/Music/");
        assert_eq!(
            normalize_path(&root.subdirs[0].full_path()),
            "/home/user/Music/Live/"
        );
    }

    #[test]
    fn test_squashed_dir() {
        let root = tree_of(&["/A/B/C/song.mp3", "/A/B/C/D/other.mp3"]);
        let a = &root.subdirs[0];

        assert_eq!(a.squashed_dir(), "A/B/C");
        assert_eq!(a.full_squashed_dir(), "/A/B/C/");
        assert_eq!(root.squashed_dir(), "A/B/C");

        let c = root.get_sub_dir("/A/B/C");
        assert_eq!(c.squashed_dir(), "C");
        assert_eq!(c.full_squashed_dir(), "/A/B/C/");
    }

    #[test]
    fn test_uids_are_unique() {
        let a = DirectoryTree::new("a");
        let b = DirectoryTree::new("b");
        assert!(b.uid > a.uid);
    }

    #[test]
    fn test_only_the_sentinel_is_uninitialized() {
        let sentinel = DirectoryTree::uninitialized();
        assert!(sentinel.is_uninitialized());

        let copy = sentinel.clone();
        assert_eq!(copy.uid, sentinel.uid);
        assert!(!copy.is_uninitialized());
        assert!(!DirectoryTree::new(STORAGE_ROOT).is_uninitialized());
    }

    #[test]
    fn test_mark_populated_and_shallow_copy() {
        let mut root = tree_of(&["/Music/Rock/song1.mp3", "/Music/song0.mp3"]);
        root.mark_populated();
        assert!(root.flattened_subdirs(true).iter().all(|d| !d.is_skeleton));

        let music = root.subdirs[0].shallow_copy();
        assert!(!music.is_skeleton);
        assert_eq!(music.files.len(), 1);
        assert_eq!(music.subdirs.len(), 1);
        assert!(music.subdirs[0].is_skeleton);
        assert!(music.subdirs[0].files.is_empty());
        assert_eq!(music.subdirs[0].uid, root.subdirs[0].subdirs[0].uid);
    }
}
