use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message identifiers are assigned by the server and strictly increase in
/// creation order, so they double as pagination cursors.
pub type MessageId = i64;

/// A two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The participant that is not `user_id`. `None` when `user_id` is not
    /// part of the thread or both slots hold the same user.
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_a == self.participant_b {
            return None;
        }
        if self.participant_a == user_id {
            Some(self.participant_b)
        } else if self.participant_b == user_id {
            Some(self.participant_a)
        } else {
            None
        }
    }
}

/// Messages are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(a: Uuid, b: Uuid) -> Thread {
        Thread {
            id: Uuid::new_v4(),
            participant_a: a,
            participant_b: b,
            last_message_preview: None,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn other_participant_resolves_from_either_side() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let t = thread(a, b);
        assert_eq!(t.other_participant(a), Some(b));
        assert_eq!(t.other_participant(b), Some(a));
    }

    #[test]
    fn other_participant_rejects_outsiders_and_self_threads() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(thread(a, b).other_participant(Uuid::new_v4()), None);
        assert_eq!(thread(a, a).other_participant(a), None);
    }
}
