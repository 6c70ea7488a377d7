use crate::Database;
use crate::models::{MessageRow, ThreadRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

/// Characters of the newest message kept on the thread row for list views.
pub const PREVIEW_CHARS: usize = 80;

/// Hard cap on rows returned by a since-query.
pub const MAX_SINCE_ROWS: u32 = 200;

const MESSAGE_COLUMNS: &str = "id, thread_id, sender_id, recipient_id, content, created_at";
const THREAD_COLUMNS: &str =
    "id, participant_a, participant_b, last_message_preview, last_message_at, created_at";

impl Database {
    // -- Users --

    /// Insert the user, or refresh the username if the id is already known.
    pub fn upsert_user(&self, id: &str, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET username = excluded.username",
                (id, username),
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, username FROM users WHERE id = ?1", [id], |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            })
            .optional()
        })
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        Ok(self.get_user(id)?.is_some())
    }

    // -- Threads --

    /// Create the thread between `a` and `b`, or return the one that already
    /// exists for that pair. Participants are stored in sorted order so the
    /// pair is unique regardless of who opened the thread.
    pub fn create_thread(&self, id: &str, a: &str, b: &str) -> Result<ThreadRow> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO threads (id, participant_a, participant_b) VALUES (?1, ?2, ?3)",
                (id, first, second),
            )?;
            let sql = format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE participant_a = ?1 AND participant_b = ?2"
            );
            conn.query_row(&sql, (first, second), thread_from_row)
                .map_err(|e| anyhow!("Thread lookup after insert failed: {}", e))
        })
    }

    pub fn get_thread(&self, id: &str) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1");
            conn.query_row(&sql, [id], thread_from_row).optional()
        })
    }

    /// Threads the user takes part in, most recently active first.
    pub fn list_threads_for_user(&self, user_id: &str) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {THREAD_COLUMNS} FROM threads
                 WHERE participant_a = ?1 OR participant_b = ?1
                 ORDER BY COALESCE(last_message_at, created_at) DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], thread_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Append a message and refresh the thread's denormalized preview in one
    /// transaction. Returns the stored row with its assigned id and timestamp.
    pub fn insert_message(
        &self,
        thread_id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (thread_id, sender_id, recipient_id, content) VALUES (?1, ?2, ?3, ?4)",
                (thread_id, sender_id, recipient_id, content),
            )?;
            let id = tx.last_insert_rowid();

            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
            let row = tx.query_row(&sql, [id], message_from_row)?;

            let preview: String = content.chars().take(PREVIEW_CHARS).collect();
            tx.execute(
                "UPDATE threads SET last_message_preview = ?1, last_message_at = ?2 WHERE id = ?3",
                (&preview, &row.created_at, thread_id),
            )?;

            tx.commit()?;
            Ok(row)
        })
    }

    /// One page of a thread, newest first.
    ///
    /// With a cursor only messages whose id is `<= cursor` are returned. One
    /// extra row is read past `limit`; when it exists its id is returned as
    /// the cursor for the next (older) page.
    pub fn get_messages(
        &self,
        thread_id: &str,
        limit: u32,
        cursor: Option<i64>,
    ) -> Result<(Vec<MessageRow>, Option<i64>)> {
        self.with_conn(|conn| query_message_page(conn, thread_id, limit, cursor))
    }

    /// Messages created strictly after `since` (same text format as the
    /// `created_at` column), oldest first.
    pub fn get_messages_since(&self, thread_id: &str, since: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE thread_id = ?1 AND created_at > ?2
                 ORDER BY id ASC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![thread_id, since, MAX_SINCE_ROWS], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_message_page(
    conn: &Connection,
    thread_id: &str,
    limit: u32,
    cursor: Option<i64>,
) -> Result<(Vec<MessageRow>, Option<i64>)> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE thread_id = ?1 AND (?2 IS NULL OR id <= ?2)
         ORDER BY id DESC
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;

    let fetch = i64::from(limit) + 1;
    let mut rows = stmt
        .query_map(rusqlite::params![thread_id, cursor, fetch], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let next_cursor = if rows.len() > limit as usize {
        rows.pop().map(|extra| extra.id)
    } else {
        None
    };

    Ok((rows, next_cursor))
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        id: row.get(0)?,
        participant_a: row.get(1)?,
        participant_b: row.get(2)?,
        last_message_preview: row.get(3)?,
        last_message_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "00000000-0000-0000-0000-00000000000a";
    const BOB: &str = "00000000-0000-0000-0000-00000000000b";

    fn seeded() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        db.upsert_user(ALICE, "alice").unwrap();
        db.upsert_user(BOB, "bob").unwrap();
        let thread = db.create_thread("t-1", ALICE, BOB).unwrap();
        (db, thread.id)
    }

    fn fill(db: &Database, thread_id: &str, count: usize) {
        for i in 1..=count {
            db.insert_message(thread_id, ALICE, BOB, &format!("message {i}")).unwrap();
        }
    }

    fn ids(rows: &[MessageRow]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn create_thread_is_idempotent_per_pair() {
        let (db, first) = seeded();
        let again = db.create_thread("t-2", BOB, ALICE).unwrap();
        assert_eq!(again.id, first);
        assert_eq!(db.list_threads_for_user(ALICE).unwrap().len(), 1);
    }

    #[test]
    fn upsert_user_refreshes_username() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_user(ALICE, "alice").unwrap();
        db.upsert_user(ALICE, "alice2").unwrap();
        assert_eq!(db.get_user(ALICE).unwrap().unwrap().username, "alice2");
        assert!(!db.user_exists(BOB).unwrap());
    }

    #[test]
    fn first_page_is_newest_first_with_next_cursor() {
        let (db, thread_id) = seeded();
        fill(&db, &thread_id, 50);

        let (rows, next) = db.get_messages(&thread_id, 20, None).unwrap();
        assert_eq!(ids(&rows), (31..=50).rev().collect::<Vec<_>>());
        assert_eq!(next, Some(30));
    }

    #[test]
    fn cursor_walks_back_to_the_start() {
        let (db, thread_id) = seeded();
        fill(&db, &thread_id, 50);

        let (rows, next) = db.get_messages(&thread_id, 20, Some(30)).unwrap();
        assert_eq!(ids(&rows), (11..=30).rev().collect::<Vec<_>>());
        assert_eq!(next, Some(10));

        let (rows, next) = db.get_messages(&thread_id, 20, Some(10)).unwrap();
        assert_eq!(ids(&rows), (1..=10).rev().collect::<Vec<_>>());
        assert_eq!(next, None);
    }

    #[test]
    fn full_page_of_exact_size_has_no_cursor() {
        let (db, thread_id) = seeded();
        fill(&db, &thread_id, 50);

        let (rows, next) = db.get_messages(&thread_id, 50, None).unwrap();
        assert_eq!(rows.len(), 50);
        assert_eq!(next, None);
    }

    #[test]
    fn pages_do_not_leak_across_threads() {
        let (db, thread_id) = seeded();
        let carol = "00000000-0000-0000-0000-00000000000c";
        db.upsert_user(carol, "carol").unwrap();
        let other = db.create_thread("t-3", ALICE, carol).unwrap();
        fill(&db, &thread_id, 3);
        db.insert_message(&other.id, carol, ALICE, "elsewhere").unwrap();

        let (rows, _) = db.get_messages(&thread_id, 50, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.thread_id == thread_id));
    }

    #[test]
    fn insert_updates_thread_preview() {
        let (db, thread_id) = seeded();
        let long = "x".repeat(PREVIEW_CHARS + 20);
        let row = db.insert_message(&thread_id, BOB, ALICE, &long).unwrap();

        let thread = db.get_thread(&thread_id).unwrap().unwrap();
        assert_eq!(thread.last_message_preview.unwrap().chars().count(), PREVIEW_CHARS);
        assert_eq!(thread.last_message_at, Some(row.created_at));
    }

    #[test]
    fn since_returns_only_newer_messages() {
        let (db, thread_id) = seeded();
        fill(&db, &thread_id, 3);
        let (rows, _) = db.get_messages(&thread_id, 50, None).unwrap();
        let newest = rows[0].created_at.clone();

        assert!(db.get_messages_since(&thread_id, &newest).unwrap().is_empty());

        let earlier = "1970-01-01T00:00:00.000Z";
        assert_eq!(ids(&db.get_messages_since(&thread_id, earlier).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn insert_into_unknown_thread_fails() {
        let (db, _) = seeded();
        assert!(db.insert_message("missing", ALICE, BOB, "hi").is_err());
    }
}
