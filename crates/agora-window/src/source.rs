use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_types::api::MessagePage;
use agora_types::{Message, MessageId};

use crate::error::SourceError;

/// Backend the window reads from and sends through.
pub trait MessageSource: Send + Sync {
    /// Most recent page when `cursor` is `None`, otherwise the page starting
    /// at `cursor` and going back in time. Messages come newest first.
    fn fetch_messages(
        &self,
        thread_id: Uuid,
        limit: u32,
        cursor: Option<MessageId>,
    ) -> impl Future<Output = Result<MessagePage, SourceError>> + Send;

    /// Messages created after `since`. Only used to decide whether a full
    /// refresh is needed.
    fn fetch_new_since(
        &self,
        thread_id: Uuid,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Message>, SourceError>> + Send;

    fn send_message(
        &self,
        thread_id: Uuid,
        recipient_id: Uuid,
        content: &str,
    ) -> impl Future<Output = Result<Message, SourceError>> + Send;
}
