use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::directory_tree::DirectoryTree;
use crate::db::models::Song;
use crate::metadata::extractor::{to_slash_path, MetadataExtractor};

/// List of supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "wma",
];

/// Result of a library scan
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ScanResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Progress update for a library scan
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

/// Scanner for finding audio files in a directory tree
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan a directory recursively and return all audio file paths
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>, anyhow::Error> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            anyhow::bail!("not a directory: {}", directory.display());
        }

        let mut audio_files = Vec::new();

        for entry in WalkDir::new(directory)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(extension) = path.extension() {
                let ext_str = extension.to_string_lossy().to_lowercase();
                if SUPPORTED_EXTENSIONS.contains(&ext_str.as_str()) {
                    audio_files.push(path.to_path_buf());
                }
            }
        }

        debug!("found {} audio files in {}", audio_files.len(), directory.display());
        Ok(audio_files)
    }
}

/// Builds folder trees out of audio files
pub struct LibraryScanner;

impl LibraryScanner {
    /// Read every file in parallel and insert it into a fresh root tree
    pub fn build_tree<P, F>(paths: &[P], progress_callback: F) -> (DirectoryTree, ScanResult)
    where
        P: AsRef<Path> + Sync,
        F: Fn(ScanProgress) + Sync,
    {
        let total = paths.len();
        let done = AtomicUsize::new(0);

        let extracted: Vec<(PathBuf, Result<Song, anyhow::Error>)> = paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                let song = MetadataExtractor::extract_from_file(&absolute);

                progress_callback(ScanProgress {
                    current: done.fetch_add(1, Ordering::Relaxed) + 1,
                    total,
                    current_file: absolute
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                });
                (absolute, song)
            })
            .collect();

        let mut root = DirectoryTree::new("/");
        let mut result = ScanResult {
            total_files: total,
            ..ScanResult::default()
        };

        // Inserted sequentially in input order so folder order is stable
        for (path, song) in extracted {
            match song {
                Ok(song) => {
                    let slash_path = song
                        .local_path
                        .clone()
                        .unwrap_or_else(|| to_slash_path(&path));
                    root.insert(&slash_path, song);
                    result.successful += 1;
                }
                Err(e) => {
                    warn!("failed to scan {}: {e}", path.display());
                    result.failed += 1;
                    result.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        root.mark_populated();
        (root, result)
    }

    /// Scan every directory and build one tree out of all files found
    pub fn scan_directories<P, F>(directories: &[P], progress_callback: F) -> (DirectoryTree, ScanResult)
    where
        P: AsRef<Path>,
        F: Fn(ScanProgress) + Sync,
    {
        let mut files = Vec::new();
        let mut errors = Vec::new();
        for directory in directories {
            match DirectoryScanner::scan(directory) {
                Ok(found) => files.extend(found),
                Err(e) => {
                    warn!("skipping library path: {e}");
                    errors.push(e.to_string());
                }
            }
        }

        let (tree, mut result) = Self::build_tree(&files, progress_callback);
        result.errors.extend(errors);
        (tree, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Rock/Live")).unwrap();
        fs::create_dir_all(dir.path().join("Jazz")).unwrap();
        fs::write(dir.path().join("Rock/one.mp3"), b"x").unwrap();
        fs::write(dir.path().join("Rock/Live/two.FLAC"), b"x").unwrap();
        fs::write(dir.path().join("Jazz/three.ogg"), b"x").unwrap();
        fs::write(dir.path().join("Jazz/cover.jpg"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        dir
    }

    #[test]
    fn test_scan_filters_extensions() {
        let dir = library();
        let mut files = DirectoryScanner::scan(dir.path()).unwrap();
        files.sort();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["three.ogg", "two.FLAC", "one.mp3"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryScanner::scan(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_build_tree_inserts_every_file() {
        let dir = library();
        let files = DirectoryScanner::scan(dir.path()).unwrap();
        let updates = Mutex::new(Vec::new());

        let (tree, result) = LibraryScanner::build_tree(&files, |p| {
            updates.lock().unwrap().push(p.current);
        });

        assert_eq!(result.total_files, 3);
        assert_eq!(result.successful, 3);
        assert_eq!(result.failed, 0);
        assert_eq!(tree.song_count(), 3);
        assert!(tree.flattened_subdirs(true).iter().all(|d| !d.is_skeleton));

        let mut seen = updates.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);

        let root = to_slash_path(&fs::canonicalize(dir.path()).unwrap());
        let rock = tree.get_sub_dir(&format!("{root}/Rock"));
        assert_eq!(rock.files.len(), 1);
        assert_eq!(rock.files[0].title, "one");
        assert!(tree.get_song(&format!("{root}/Rock/Live/two")).is_some());
    }

    #[test]
    fn test_missing_files_are_counted_as_failures() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![dir.path().join("gone.mp3")];
        let (tree, result) = LibraryScanner::build_tree(&files, |_| {});

        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(tree.song_count(), 0);
    }

    #[test]
    fn test_scan_directories_reports_bad_paths() {
        let dir = library();
        let missing = dir.path().join("missing");
        let (tree, result) =
            LibraryScanner::scan_directories(&[dir.path().to_path_buf(), missing], |_| {});

        assert_eq!(tree.song_count(), 3);
        assert_eq!(result.successful, 3);
        assert_eq!(result.errors.len(), 1);
    }
}
