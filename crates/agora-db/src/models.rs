/// Database row types — these map directly to SQLite rows.
/// Distinct from agora-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
}

pub struct ThreadRow {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub thread_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub created_at: String,
}
