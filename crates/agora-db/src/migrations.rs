use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Timestamps are stored as RFC 3339 text with millisecond precision so that
/// lexical order matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS threads (
            id                    TEXT PRIMARY KEY,
            participant_a         TEXT NOT NULL REFERENCES users(id),
            participant_b         TEXT NOT NULL REFERENCES users(id),
            last_message_preview  TEXT,
            last_message_at       TEXT,
            created_at            TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(participant_a, participant_b)
        );

        CREATE INDEX IF NOT EXISTS idx_threads_a ON threads(participant_a);
        CREATE INDEX IF NOT EXISTS idx_threads_b ON threads(participant_b);

        CREATE TABLE IF NOT EXISTS messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id       TEXT NOT NULL REFERENCES threads(id),
            sender_id       TEXT NOT NULL REFERENCES users(id),
            recipient_id    TEXT NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(thread_id, id);

        CREATE INDEX IF NOT EXISTS idx_messages_thread_created
            ON messages(thread_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
