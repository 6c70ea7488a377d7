//! In-memory message backend with the same paging rules as the server, plus
//! knobs to hold, fail and count requests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use agora_types::api::MessagePage;
use agora_types::{Message, MessageId, Thread};
use agora_window::{MessageSource, SourceError};

#[derive(Clone, Default)]
pub struct FakeSource {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Mutex<HashMap<Uuid, Vec<Message>>>,
    next_id: Mutex<MessageId>,
    signed_in: Mutex<Uuid>,
    older_gate: Mutex<Option<Arc<Semaphore>>>,
    frozen_clock: AtomicBool,
    fail_fetch: AtomicBool,
    fail_send: AtomicBool,
    initial_calls: AtomicUsize,
    older_calls: AtomicUsize,
    since_calls: AtomicUsize,
    send_calls: AtomicUsize,
}

fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_800_000_000, 0).unwrap_or_default()
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread(&self, a: Uuid, b: Uuid) -> Thread {
        let thread = Thread {
            id: Uuid::new_v4(),
            participant_a: a,
            participant_b: b,
            last_message_preview: None,
            last_message_at: None,
            created_at: epoch(),
        };
        self.inner.messages.lock().unwrap().insert(thread.id, Vec::new());
        thread
    }

    /// User recorded as the sender of messages sent through this source.
    pub fn sign_in(&self, user: Uuid) {
        *self.inner.signed_in.lock().unwrap() = user;
    }

    /// Stamp every later message with the same instant, as if they were all
    /// stored within one millisecond.
    pub fn freeze_clock(&self) {
        self.inner.frozen_clock.store(true, Ordering::SeqCst);
    }

    /// Append a message as if another client had sent it.
    pub fn push(&self, thread: &Thread, from: Uuid, to: Uuid, content: &str) -> Message {
        self.append(thread.id, from, to, Some(content))
    }

    /// Append `count` messages from `from` to `to`. Ids are global across
    /// threads, like the real database.
    pub fn seed(&self, thread: &Thread, from: Uuid, to: Uuid, count: usize) {
        for _ in 0..count {
            self.append(thread.id, from, to, None);
        }
    }

    fn append(&self, thread_id: Uuid, from: Uuid, to: Uuid, content: Option<&str>) -> Message {
        let id = {
            let mut next = self.inner.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let message = Message {
            id,
            thread_id,
            sender_id: from,
            recipient_id: to,
            content: content.map(str::to_string).unwrap_or_else(|| format!("m{id}")),
            created_at: if self.inner.frozen_clock.load(Ordering::SeqCst) {
                epoch()
            } else {
                epoch() + Duration::seconds(id)
            },
        };
        self.inner
            .messages
            .lock()
            .unwrap()
            .entry(thread_id)
            .or_default()
            .push(message.clone());
        message
    }

    /// Hold every backward-page request until [`FakeSource::release_older`].
    pub fn hold_older(&self) {
        *self.inner.older_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_older(&self) {
        if let Some(gate) = self.inner.older_gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.inner.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn initial_calls(&self) -> usize {
        self.inner.initial_calls.load(Ordering::SeqCst)
    }

    pub fn older_calls(&self) -> usize {
        self.inner.older_calls.load(Ordering::SeqCst)
    }

    pub fn since_calls(&self) -> usize {
        self.inner.since_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.inner.send_calls.load(Ordering::SeqCst)
    }

    fn page(&self, thread_id: Uuid, limit: u32, cursor: Option<MessageId>) -> MessagePage {
        let messages = self.inner.messages.lock().unwrap();
        let mut rows: Vec<Message> = messages
            .get(&thread_id)
            .map(|all| {
                all.iter()
                    .rev()
                    .filter(|m| cursor.is_none_or(|c| m.id <= c))
                    .take(limit as usize + 1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let next_cursor = if rows.len() > limit as usize {
            rows.pop().map(|m| m.id)
        } else {
            None
        };
        MessagePage { messages: rows, next_cursor }
    }

    fn unavailable() -> SourceError {
        SourceError::Unavailable("fake backend offline".into())
    }
}

impl MessageSource for FakeSource {
    async fn fetch_messages(
        &self,
        thread_id: Uuid,
        limit: u32,
        cursor: Option<MessageId>,
    ) -> Result<MessagePage, SourceError> {
        if cursor.is_some() {
            self.inner.older_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.inner.older_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        } else {
            self.inner.initial_calls.fetch_add(1, Ordering::SeqCst);
        }
        tokio::task::yield_now().await;

        if self.inner.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.page(thread_id, limit, cursor))
    }

    async fn fetch_new_since(
        &self,
        thread_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, SourceError> {
        self.inner.since_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let messages = self.inner.messages.lock().unwrap();
        Ok(messages
            .get(&thread_id)
            .map(|all| all.iter().filter(|m| m.created_at > since).cloned().collect())
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        thread_id: Uuid,
        recipient_id: Uuid,
        content: &str,
    ) -> Result<Message, SourceError> {
        self.inner.send_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.inner.fail_send.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let sender = *self.inner.signed_in.lock().unwrap();
        Ok(self.append(thread_id, sender, recipient_id, Some(content)))
    }
}
