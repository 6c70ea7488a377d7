use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageId};

/// Page size used when a request does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Upper bound the server clamps every page request to.
pub const MAX_PAGE_SIZE: u32 = 200;
/// Longest message body accepted after trimming, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

// -- JWT Claims --

/// Claims carried by the bearer token. Tokens are minted by the external
/// auth service; this workspace only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Threads --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThreadRequest {
    pub participant_id: Uuid,
}

// -- Messages --

/// One page of a thread, newest message first.
///
/// `next_cursor` is the id of the newest message *not* included in this
/// page; passing it back as `cursor` continues where this page stopped.
/// `None` means the page reached the start of the thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<MessageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub content: String,
}
