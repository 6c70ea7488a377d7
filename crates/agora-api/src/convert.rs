//! Row → API model conversion. Rows with unparsable ids or timestamps are
//! logged and filled with defaults rather than failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use agora_db::models::{MessageRow, ThreadRow};
use agora_types::{Message, Thread};

fn uuid_field(raw: &str, field: &str, owner: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", field, raw, owner, e);
        Uuid::default()
    })
}

fn timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on '{}': {}", raw, owner, e);
        DateTime::default()
    })
}

pub fn message(row: MessageRow) -> Message {
    let owner = format!("message {}", row.id);
    Message {
        id: row.id,
        thread_id: uuid_field(&row.thread_id, "thread_id", &owner),
        sender_id: uuid_field(&row.sender_id, "sender_id", &owner),
        recipient_id: uuid_field(&row.recipient_id, "recipient_id", &owner),
        created_at: timestamp(&row.created_at, &owner),
        content: row.content,
    }
}

pub fn thread(row: ThreadRow) -> Thread {
    let owner = format!("thread {}", row.id);
    Thread {
        id: uuid_field(&row.id, "id", &owner),
        participant_a: uuid_field(&row.participant_a, "participant_a", &owner),
        participant_b: uuid_field(&row.participant_b, "participant_b", &owner),
        last_message_at: row.last_message_at.as_deref().map(|ts| timestamp(ts, &owner)),
        created_at: timestamp(&row.created_at, &owner),
        last_message_preview: row.last_message_preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_timestamp_format() {
        let row = MessageRow {
            id: 7,
            thread_id: Uuid::nil().to_string(),
            sender_id: Uuid::nil().to_string(),
            recipient_id: Uuid::nil().to_string(),
            content: "hi".into(),
            created_at: "2026-10-18T09:30:00.250Z".into(),
        };
        let msg = message(row);
        assert_eq!(msg.created_at.timestamp_millis() % 1000, 250);
    }

    #[test]
    fn corrupt_ids_fall_back_to_nil() {
        let row = MessageRow {
            id: 1,
            thread_id: "garbage".into(),
            sender_id: Uuid::nil().to_string(),
            recipient_id: Uuid::nil().to_string(),
            content: String::new(),
            created_at: "not a time".into(),
        };
        let msg = message(row);
        assert_eq!(msg.thread_id, Uuid::nil());
        assert_eq!(msg.created_at, DateTime::<Utc>::default());
    }
}
