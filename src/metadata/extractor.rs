// Metadata extractor using lofty, with a file-name fallback for unreadable files
use anyhow::Result;
use lofty::file::TaggedFile;
use lofty::prelude::{Accessor, AudioFile, ItemKey, TaggedFileExt};
use lofty::probe::Probe;
use std::path::Path;
use tracing::warn;

use super::parser::parse_artists;
use crate::db::models::{AlbumRef, Song, DURATION_UNKNOWN};

/// Path with `/` separators on every platform
pub fn to_slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn short_hash(value: &str) -> String {
    blake3::hash(value.as_bytes()).to_hex()[..16].to_string()
}

/// Stable id of a local file, derived from its path
pub fn local_song_id(path: &str) -> String {
    format!("LA{}", short_hash(path))
}

/// Stable id of a local album, derived from its title and artist
fn local_album_id(title: &str, artist: Option<&str>) -> String {
    format!("LB{}", short_hash(&format!("{title}\n{}", artist.unwrap_or_default())))
}

fn file_stem(file_path: &Path) -> String {
    file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn extract_from_file(file_path: &Path) -> Result<Song> {
        // Unreadable tags are fine, a missing file is not
        let fs_meta = std::fs::metadata(file_path)?;
        let date_modified = fs_meta
            .modified()
            .ok()
            .map(|m| chrono::DateTime::<chrono::Utc>::from(m).timestamp());

        let tagged_file = match Self::read_tagged(file_path) {
            Ok(f) => f,
            Err(e) => {
                warn!("failed to read tags of {}: {e}", file_path.display());
                let mut song = Self::create_minimal_song(file_path);
                song.date_modified = date_modified;
                return Ok(song);
            }
        };

        let tag = tagged_file.primary_tag().or(tagged_file.first_tag());
        let properties = tagged_file.properties();

        let title = tag
            .and_then(|t| t.title().map(|s| s.to_string()))
            .unwrap_or_else(|| file_stem(file_path));

        let artists = tag
            .and_then(|t| t.artist().map(|s| parse_artists(&s)))
            .unwrap_or_default();

        let album = tag.and_then(|t| t.album().map(|s| s.to_string())).map(|title| AlbumRef {
            id: local_album_id(&title, artists.first().map(|a| a.name.as_str())),
            title,
        });

        // Malformed year tags fall back to the first four digits of the raw date
        let year = tag.and_then(|t| {
            if let Some(y) = t.year() {
                return Some(y as i32);
            }
            t.get_string(&ItemKey::Year)
                .or_else(|| t.get_string(&ItemKey::RecordingDate))
                .and_then(|raw| raw.chars().take(4).collect::<String>().parse::<i32>().ok())
        });

        let track_number = tag.and_then(|t| t.track()).map(|n| n as i32);

        let seconds = properties.duration().as_secs();
        let duration = if seconds == 0 {
            DURATION_UNKNOWN
        } else {
            i32::try_from(seconds).unwrap_or(i32::MAX)
        };

        let local_path = to_slash_path(file_path);
        let mut song = Song::new(local_song_id(&local_path), title);
        song.duration = duration;
        song.artists = artists;
        song.album = album;
        song.local_path = Some(local_path);
        song.year = year;
        song.track_number = track_number;
        song.date_added = Some(chrono::Utc::now().timestamp());
        song.date_modified = date_modified;
        Ok(song)
    }

    fn read_tagged(file_path: &Path) -> Result<TaggedFile> {
        Ok(Probe::open(file_path)?.guess_file_type()?.read()?)
    }

    /// Song named after the file when no tags can be read
    fn create_minimal_song(file_path: &Path) -> Song {
        let local_path = to_slash_path(file_path);
        let mut song = Song::new(local_song_id(&local_path), file_stem(file_path));
        song.local_path = Some(local_path);
        song.date_added = Some(chrono::Utc::now().timestamp());
        song
    }
}
