// Song sorting for folder views
use serde::{Deserialize, Serialize};

use crate::db::models::Song;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongSortType {
    CreateDate,
    ModifiedDate,
    ReleaseDate,
    #[default]
    Name,
    Artist,
    PlayCount,
    TrackNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Number(i64),
    Text(String),
}

fn sort_key(song: &Song, sort_type: SongSortType) -> SortKey {
    match sort_type {
        SongSortType::CreateDate => SortKey::Number(song.date_added.unwrap_or(-1)),
        SongSortType::ModifiedDate => SortKey::Number(song.date_modified.unwrap_or(-1)),
        SongSortType::ReleaseDate => SortKey::Number(song.year.map(i64::from).unwrap_or(-1)),
        SongSortType::Name => SortKey::Text(song.title.to_lowercase()),
        SongSortType::Artist => SortKey::Text(song.artist_names().to_lowercase()),
        SongSortType::PlayCount => SortKey::Number(song.play_count),
        // Untagged tracks go last
        SongSortType::TrackNumber => {
            SortKey::Number(song.track_number.map(i64::from).unwrap_or(i64::MAX))
        }
    }
}

/// Stable ascending sort, reversed afterwards when `descending`
pub fn sort_songs(songs: &mut [&Song], sort_type: SongSortType, descending: bool) {
    songs.sort_by_cached_key(|s| sort_key(s, sort_type));
    if descending {
        songs.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Artist;

    fn titled(id: &str, title: &str) -> Song {
        Song::new(id, title)
    }

    fn ids(songs: &[&Song]) -> Vec<String> {
        songs.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_name_sort_ignores_case() {
        let songs = [titled("1", "beta"), titled("2", "Alpha"), titled("3", "gamma")];
        let mut refs: Vec<&Song> = songs.iter().collect();
        sort_songs(&mut refs, SongSortType::Name, false);
        assert_eq!(ids(&refs), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let songs = [titled("1", "same"), titled("2", "same"), titled("3", "a")];
        let mut refs: Vec<&Song> = songs.iter().collect();
        sort_songs(&mut refs, SongSortType::Name, false);
        assert_eq!(ids(&refs), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_missing_track_numbers_sort_last() {
        let mut first = titled("1", "x");
        first.track_number = Some(2);
        let untagged = titled("2", "y");
        let mut second = titled("3", "z");
        second.track_number = Some(1);

        let songs = [first, untagged, second];
        let mut refs: Vec<&Song> = songs.iter().collect();
        sort_songs(&mut refs, SongSortType::TrackNumber, false);
        assert_eq!(ids(&refs), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_dates_and_play_count_descending() {
        let mut old = titled("old", "a");
        old.date_added = Some(100);
        old.play_count = 9;
        let mut new = titled("new", "b");
        new.date_added = Some(200);
        new.play_count = 1;
        let unknown = titled("unknown", "c");

        let songs = [old, new, unknown];
        let mut refs: Vec<&Song> = songs.iter().collect();
        sort_songs(&mut refs, SongSortType::CreateDate, true);
        assert_eq!(ids(&refs), vec!["new", "old", "unknown"]);

        sort_songs(&mut refs, SongSortType::PlayCount, true);
        assert_eq!(ids(&refs), vec!["old", "new", "unknown"]);
    }

    #[test]
    fn test_artist_sort() {
        let mut a = titled("1", "x");
        a.artists = vec![Artist::named("Zed")];
        let mut b = titled("2", "y");
        b.artists = vec![Artist::named("abba")];

        let songs = [a, b];
        let mut refs: Vec<&Song> = songs.iter().collect();
        sort_songs(&mut refs, SongSortType::Artist, false);
        assert_eq!(ids(&refs), vec!["2", "1"]);
    }

    #[test]
    fn test_sort_type_serde_names() {
        let json = serde_json::to_string(&SongSortType::ModifiedDate).unwrap();
        assert_eq!(json, "\"modified_date\"");
    }
}
