use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;

use crate::db::connection::DatabaseConnection;
use crate::db::models::{AlbumRef, Artist, QueueEntity, QueueSongMap, Song};
use crate::queue::MultiQueue;

const SONG_COLUMNS: &str = "s.id, s.title, s.duration, s.thumbnail_url, s.album_id, s.album_title,
    s.local_path, s.year, s.track_number, s.date_added, s.date_modified, s.play_count";

const QUEUE_COLUMNS: &str =
    "id, title, shuffled, queue_pos, last_song_pos, queue_index, playlist_id";

/// Database operations for songs and stored queues.
///
/// Every multi-statement write runs in one transaction: it either lands
/// completely or leaves the previous state untouched.
pub struct DbOperations;

impl DbOperations {
    /// Insert or update a song's metadata and replace its artist credits.
    ///
    /// Existing rows are updated in place so map rows of other queues that
    /// reference this song survive.
    pub fn upsert_song(db: &DatabaseConnection, song: &Song) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        Self::upsert_song_tx(&tx, song)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_song_tx(conn: &Connection, song: &Song) -> Result<(), anyhow::Error> {
        let (album_id, album_title) = match &song.album {
            Some(album) => (Some(album.id.as_str()), Some(album.title.as_str())),
            None => (None, None),
        };

        conn.execute(
            "INSERT INTO songs (
                id, title, duration, thumbnail_url, album_id, album_title,
                local_path, year, track_number, date_added, date_modified, play_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                duration = excluded.duration,
                thumbnail_url = excluded.thumbnail_url,
                album_id = excluded.album_id,
                album_title = excluded.album_title,
                local_path = excluded.local_path,
                year = excluded.year,
                track_number = excluded.track_number,
                date_added = COALESCE(songs.date_added, excluded.date_added),
                date_modified = excluded.date_modified,
                play_count = MAX(songs.play_count, excluded.play_count)",
            params![
                song.id,
                song.title,
                song.duration,
                song.thumbnail_url,
                album_id,
                album_title,
                song.local_path,
                song.year,
                song.track_number,
                song.date_added,
                song.date_modified,
                song.play_count,
            ],
        )?;

        conn.execute("DELETE FROM song_artists WHERE song_id = ?1", params![song.id])?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO song_artists (song_id, position, artist_id, name) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, artist) in song.artists.iter().enumerate() {
            stmt.execute(params![song.id, position as i64, artist.id, artist.name])?;
        }

        Ok(())
    }

    fn upsert_header_tx(conn: &Connection, entity: &QueueEntity) -> Result<(), anyhow::Error> {
        conn.execute(
            "INSERT INTO queue (id, title, shuffled, queue_pos, last_song_pos, queue_index, playlist_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                shuffled = excluded.shuffled,
                queue_pos = excluded.queue_pos,
                last_song_pos = excluded.last_song_pos,
                queue_index = excluded.queue_index,
                playlist_id = excluded.playlist_id",
            params![
                entity.id,
                entity.title,
                entity.shuffled,
                entity.queue_pos,
                entity.last_song_pos,
                entity.index,
                entity.playlist_id,
            ],
        )?;
        Ok(())
    }

    fn update_header_tx(conn: &Connection, entity: &QueueEntity) -> Result<usize, anyhow::Error> {
        let updated = conn.execute(
            "UPDATE queue SET
                title = ?2, shuffled = ?3, queue_pos = ?4,
                last_song_pos = ?5, queue_index = ?6, playlist_id = ?7
             WHERE id = ?1",
            params![
                entity.id,
                entity.title,
                entity.shuffled,
                entity.queue_pos,
                entity.last_song_pos,
                entity.index,
                entity.playlist_id,
            ],
        )?;
        Ok(updated)
    }

    fn save_queue_tx(conn: &Connection, mq: &MultiQueue) -> Result<(), anyhow::Error> {
        // An empty queue is "nothing playing", not a slot worth keeping
        if mq.is_empty() {
            return Ok(());
        }

        Self::upsert_header_tx(conn, &mq.to_entity())?;
        conn.execute("DELETE FROM queue_song_map WHERE queue_id = ?1", params![mq.id])?;

        let mut stmt = conn.prepare_cached(
            "INSERT INTO queue_song_map (queue_id, song_id, position, shuffled_position)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, song) in mq.songs().iter().enumerate() {
            Self::upsert_song_tx(conn, song)?;
            stmt.execute(params![mq.id, song.id, position as i64, song.shuffle_index as i64])?;
        }

        Ok(())
    }

    /// Store a queue: upsert the header, then replace every song row.
    /// Empty queues are skipped.
    pub fn save_queue(db: &DatabaseConnection, mq: &MultiQueue) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        Self::save_queue_tx(&tx, mq)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete the stored queue (header and rows) before saving it again
    pub fn rewrite_queue(db: &DatabaseConnection, mq: &MultiQueue) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM queue WHERE id = ?1", params![mq.id])?;
        Self::save_queue_tx(&tx, mq)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace every stored queue with the given ones
    pub fn rewrite_all_queues(
        db: &DatabaseConnection,
        mqs: &[MultiQueue],
    ) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM queue", [])?;
        for mq in mqs {
            Self::save_queue_tx(&tx, mq)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Update header fields only. Returns false when the queue is not stored.
    pub fn update_queue(db: &DatabaseConnection, mq: &MultiQueue) -> Result<bool, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        Ok(Self::update_header_tx(&conn, &mq.to_entity())? > 0)
    }

    /// Bring stored headers in line with the given board order.
    ///
    /// Indexes are regenerated from slice position and stored queues that are
    /// not in `mqs` are deleted.
    pub fn update_all_queues(
        db: &DatabaseConnection,
        mqs: &[MultiQueue],
    ) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let mut conn = conn.lock();

        let tx = conn.transaction()?;

        let keep: HashSet<i64> = mqs.iter().map(|mq| mq.id).collect();
        let stored: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM queue")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            ids
        };
        for id in stored.into_iter().filter(|id| !keep.contains(id)) {
            tx.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
        }

        for (index, mq) in mqs.iter().enumerate() {
            let mut entity = mq.to_entity();
            entity.index = index as i32;
            Self::update_header_tx(&tx, &entity)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn queue_entity_from_row(row: &Row) -> rusqlite::Result<QueueEntity> {
        Ok(QueueEntity {
            id: row.get(0)?,
            title: row.get(1)?,
            shuffled: row.get(2)?,
            queue_pos: row.get(3)?,
            last_song_pos: row.get(4)?,
            index: row.get(5)?,
            playlist_id: row.get(6)?,
        })
    }

    fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
        let album_id: Option<String> = row.get(4)?;
        let album_title: Option<String> = row.get(5)?;

        Ok(Song {
            id: row.get(0)?,
            title: row.get(1)?,
            duration: row.get(2)?,
            artists: Vec::new(),
            album: album_title.map(|title| AlbumRef {
                id: album_id.unwrap_or_default(),
                title,
            }),
            thumbnail_url: row.get(3)?,
            local_path: row.get(6)?,
            year: row.get(7)?,
            track_number: row.get(8)?,
            date_added: row.get(9)?,
            date_modified: row.get(10)?,
            play_count: row.get(11)?,
            shuffle_index: 0,
        })
    }

    fn read_artists(conn: &Connection, song_id: &str) -> Result<Vec<Artist>, anyhow::Error> {
        let mut stmt = conn.prepare_cached(
            "SELECT artist_id, name FROM song_artists WHERE song_id = ?1 ORDER BY position",
        )?;
        let artists = stmt
            .query_map(params![song_id], |row| {
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn read_queue_songs(conn: &Connection, queue_id: i64) -> Result<Vec<Song>, anyhow::Error> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SONG_COLUMNS}, m.shuffled_position
             FROM queue_song_map m
             INNER JOIN songs s ON s.id = m.song_id
             WHERE m.queue_id = ?1
             ORDER BY m.position"
        ))?;

        let mut songs = stmt
            .query_map(params![queue_id], |row| {
                let mut song = Self::song_from_row(row)?;
                song.shuffle_index = row.get::<_, i64>(12)? as i32;
                Ok(song)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for song in songs.iter_mut() {
            song.artists = Self::read_artists(conn, &song.id)?;
        }

        Ok(songs)
    }

    /// All stored queues ordered by their board index. Queues without songs are skipped.
    pub fn read_queues(db: &DatabaseConnection) -> Result<Vec<MultiQueue>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let entities = {
            let mut stmt =
                conn.prepare(&format!("SELECT {QUEUE_COLUMNS} FROM queue ORDER BY queue_index"))?;
            let rows = stmt
                .query_map([], Self::queue_entity_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut queues = Vec::with_capacity(entities.len());
        for entity in entities {
            let songs = Self::read_queue_songs(&conn, entity.id)?;
            if songs.is_empty() {
                continue;
            }
            queues.push(MultiQueue::from_entity(entity, songs));
        }

        Ok(queues)
    }

    /// The most recently used stored queue
    pub fn get_resumption_queue(
        db: &DatabaseConnection,
    ) -> Result<Option<MultiQueue>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let entity = conn
            .query_row(
                &format!("SELECT {QUEUE_COLUMNS} FROM queue ORDER BY queue_index DESC LIMIT 1"),
                [],
                Self::queue_entity_from_row,
            )
            .optional()?;

        let Some(entity) = entity else {
            return Ok(None);
        };
        let songs = Self::read_queue_songs(&conn, entity.id)?;
        if songs.is_empty() {
            return Ok(None);
        }

        Ok(Some(MultiQueue::from_entity(entity, songs)))
    }

    /// Delete a queue. Its song rows go with it.
    pub fn delete_queue(db: &DatabaseConnection, queue_id: i64) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        conn.execute("DELETE FROM queue WHERE id = ?1", params![queue_id])?;
        Ok(())
    }

    pub fn delete_all_queues(db: &DatabaseConnection) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        conn.execute("DELETE FROM queue", [])?;
        Ok(())
    }

    /// Raw song rows of one queue in canonical order
    pub fn get_queue_song_map(
        db: &DatabaseConnection,
        queue_id: i64,
    ) -> Result<Vec<QueueSongMap>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(
            "SELECT queue_id, song_id, position, shuffled_position
             FROM queue_song_map WHERE queue_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![queue_id], |row| {
                Ok(QueueSongMap {
                    queue_id: row.get(0)?,
                    song_id: row.get(1)?,
                    position: row.get(2)?,
                    shuffled_position: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Look a song up by id, artists included
    pub fn get_song(db: &DatabaseConnection, song_id: &str) -> Result<Option<Song>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let song = conn
            .query_row(
                &format!("SELECT {SONG_COLUMNS} FROM songs s WHERE s.id = ?1"),
                params![song_id],
                Self::song_from_row,
            )
            .optional()?;

        match song {
            Some(mut song) => {
                song.artists = Self::read_artists(&conn, &song.id)?;
                Ok(Some(song))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TIME_UNSET;

    fn song(id: &str) -> Song {
        let mut s = Song::new(id, format!("Title {id}"));
        s.duration = 180;
        s.artists = vec![
            Artist::named("First"),
            Artist {
                id: Some("UC123".to_string()),
                name: "Second".to_string(),
            },
        ];
        s.album = Some(AlbumRef {
            id: "MPRE1".to_string(),
            title: "Album".to_string(),
        });
        s
    }

    fn queue(id: i64, title: &str, ids: &[&str], index: i32) -> MultiQueue {
        MultiQueue::new(id, title, ids.iter().map(|i| song(i)).collect(), index)
    }

    #[test]
    fn test_save_and_read_round_trip() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mut mq = queue(11, "Mix", &["a", "b", "c"], 3);
        for (s, rank) in mq.queue.iter_mut().zip([2, 0, 1]) {
            s.shuffle_index = rank;
        }
        mq.shuffled = true;
        mq.queue_pos = 1;
        mq.last_song_pos = 42_000;
        mq.playlist_id = Some("RDAMVMa".to_string());

        DbOperations::save_queue(&db, &mq).unwrap();
        let restored = DbOperations::read_queues(&db).unwrap();

        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0], mq);
        assert_eq!(
            restored[0].current_queue_shuffled(),
            mq.current_queue_shuffled()
        );
    }

    #[test]
    fn test_save_twice_is_idempotent() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mq = queue(5, "Album", &["a", "b", "c"], 0);

        DbOperations::save_queue(&db, &mq).unwrap();
        let first = DbOperations::get_queue_song_map(&db, 5).unwrap();
        DbOperations::save_queue(&db, &mq).unwrap();
        let second = DbOperations::get_queue_song_map(&db, 5).unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        let positions: Vec<i64> = second.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_queue_is_not_saved() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mq = queue(9, "Nothing", &[], 0);

        DbOperations::save_queue(&db, &mq).unwrap();
        assert!(DbOperations::read_queues(&db).unwrap().is_empty());
        assert!(DbOperations::get_resumption_queue(&db).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_rows() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mut mq = queue(1, "Q", &["a", "b", "c"], 0);
        DbOperations::save_queue(&db, &mq).unwrap();

        mq.remove_song(0);
        DbOperations::save_queue(&db, &mq).unwrap();

        let ids: Vec<String> = DbOperations::get_queue_song_map(&db, 1)
            .unwrap()
            .into_iter()
            .map(|r| r.song_id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_rewrite_all_replaces_everything() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        DbOperations::save_queue(&db, &queue(1, "One", &["a"], 0)).unwrap();
        DbOperations::save_queue(&db, &queue(2, "Two", &["b"], 1)).unwrap();

        let replacement = vec![queue(3, "Three", &["c", "d"], 0)];
        DbOperations::rewrite_all_queues(&db, &replacement).unwrap();

        let stored = DbOperations::read_queues(&db).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, 3);
        assert!(DbOperations::get_queue_song_map(&db, 1).unwrap().is_empty());
    }

    #[test]
    fn test_rewrite_queue_resets_header() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mut mq = queue(4, "Before", &["a", "b"], 0);
        DbOperations::save_queue(&db, &mq).unwrap();

        mq.title = "After".to_string();
        mq.queue_pos = 1;
        DbOperations::rewrite_queue(&db, &mq).unwrap();

        let stored = DbOperations::get_resumption_queue(&db).unwrap().unwrap();
        assert_eq!(stored.title, "After");
        assert_eq!(stored.queue_pos, 1);
        assert_eq!(stored.size(), 2);
    }

    #[test]
    fn test_delete_queue_cascades_rows() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        DbOperations::save_queue(&db, &queue(7, "Q", &["a", "b"], 0)).unwrap();

        DbOperations::delete_queue(&db, 7).unwrap();
        assert!(DbOperations::get_queue_song_map(&db, 7).unwrap().is_empty());
        // songs themselves are kept
        assert!(DbOperations::get_song(&db, "a").unwrap().is_some());
    }

    #[test]
    fn test_upsert_song_keeps_other_queue_rows() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        DbOperations::save_queue(&db, &queue(1, "Q", &["a", "b"], 0)).unwrap();

        let mut updated = song("a");
        updated.title = "Renamed".to_string();
        updated.artists = vec![Artist::named("Solo")];
        DbOperations::upsert_song(&db, &updated).unwrap();

        assert_eq!(DbOperations::get_queue_song_map(&db, 1).unwrap().len(), 2);
        let stored = DbOperations::get_song(&db, "a").unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.artists, vec![Artist::named("Solo")]);
    }

    #[test]
    fn test_update_queue_touches_header_only() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let mut mq = queue(2, "Q", &["a", "b", "c"], 0);
        DbOperations::save_queue(&db, &mq).unwrap();

        mq.queue_pos = 2;
        mq.last_song_pos = 1_500;
        mq.remove_song(0);
        assert!(DbOperations::update_queue(&db, &mq).unwrap());

        let stored = DbOperations::get_resumption_queue(&db).unwrap().unwrap();
        assert_eq!(stored.queue_pos, mq.queue_pos);
        assert_eq!(stored.last_song_pos, 1_500);
        assert_eq!(stored.size(), 3);

        assert!(!DbOperations::update_queue(&db, &queue(99, "Missing", &["a"], 0)).unwrap());
    }

    #[test]
    fn test_update_all_queues_reindexes_and_drops_missing() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let a = queue(1, "A", &["a"], 0);
        let b = queue(2, "B", &["b"], 1);
        let c = queue(3, "C", &["c"], 2);
        for mq in [&a, &b, &c] {
            DbOperations::save_queue(&db, mq).unwrap();
        }

        DbOperations::update_all_queues(&db, &[c.clone(), a.clone()]).unwrap();

        let stored = DbOperations::read_queues(&db).unwrap();
        let ids: Vec<i64> = stored.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(stored[0].index, 0);
        assert_eq!(stored[1].index, 1);
    }

    #[test]
    fn test_resumption_queue_is_highest_index() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        DbOperations::save_queue(&db, &queue(1, "Old", &["a"], 0)).unwrap();
        DbOperations::save_queue(&db, &queue(2, "New", &["b"], 1)).unwrap();

        let resumed = DbOperations::get_resumption_queue(&db).unwrap().unwrap();
        assert_eq!(resumed.title, "New");
        assert_eq!(resumed.last_song_pos, TIME_UNSET);

        DbOperations::delete_all_queues(&db).unwrap();
        assert!(DbOperations::get_resumption_queue(&db).unwrap().is_none());
    }
}
