// Database migrations
use anyhow::Result;
use rusqlite::Connection;

use super::models::TIME_UNSET;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // Create songs table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            duration INTEGER NOT NULL DEFAULT -1,
            thumbnail_url TEXT,
            album_id TEXT,
            album_title TEXT,
            local_path TEXT,
            year INTEGER,
            track_number INTEGER,
            date_added INTEGER,
            date_modified INTEGER,
            play_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Ordered artist credits of a song
    conn.execute(
        "CREATE TABLE IF NOT EXISTS song_artists (
            song_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            artist_id TEXT,
            name TEXT NOT NULL,
            PRIMARY KEY (song_id, position),
            FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Create queue table
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS queue (
                id INTEGER PRIMARY KEY NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                shuffled BOOLEAN NOT NULL DEFAULT 0,
                queue_pos INTEGER NOT NULL DEFAULT -1,
                last_song_pos INTEGER NOT NULL DEFAULT {TIME_UNSET},
                queue_index INTEGER NOT NULL DEFAULT 0,
                playlist_id TEXT
            )"
        ),
        [],
    )?;

    // Create queue_song_map junction table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS queue_song_map (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            queue_id INTEGER NOT NULL,
            song_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            shuffled_position INTEGER NOT NULL,
            FOREIGN KEY (queue_id) REFERENCES queue(id) ON DELETE CASCADE,
            FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Create indexes for better query performance
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_queue_song_map_queue ON queue_song_map(queue_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_queue_song_map_song ON queue_song_map(song_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_songs_local_path ON songs(local_path)",
        [],
    )?;

    Ok(())
}
