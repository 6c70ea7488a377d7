use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use agora_types::api::MessagePage;
use agora_types::{Message, MessageId, Thread};

/// Identifies the thread session a request was issued for. A response whose
/// ticket no longer matches the active one belongs to a thread the reader
/// has already left and is dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub thread_id: Uuid,
    generation: u64,
}

/// A backward-page request handed out by [`WindowState::begin_load_older`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OlderRequest {
    pub ticket: Ticket,
    pub cursor: MessageId,
    pub limit: u32,
    /// Set when the request backfills a gap: only ids above it are missing.
    pub floor: Option<MessageId>,
}

/// Messages above `floor` and up to `cursor` that a live refresh jumped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gap {
    cursor: MessageId,
    floor: MessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOlder {
    /// Preconditions failed (no cursor, nothing more, or a load in flight).
    Skipped,
    /// The response arrived after the thread changed.
    Stale,
    /// The server had nothing older.
    Exhausted,
    Prepended { added: usize },
    /// Part of a gap left by a live refresh was filled in.
    Backfilled { added: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveUpdate {
    /// Stale response, or the thread never finished its initial load.
    Discarded,
    /// `retained` messages slid out of the live page and were kept in the
    /// older buffer.
    Replaced { retained: usize },
}

/// Buffers behind a thread's message list.
///
/// Two buffers are kept apart and only merged when rendering: the older
/// buffer grows by backward pagination, the live page is replaced wholesale
/// by every refresh. Either can change while the other's request is in
/// flight without tearing the merged list.
#[derive(Debug, Default)]
pub struct WindowState {
    thread: Option<Thread>,
    generation: u64,
    initialized: bool,
    older: Vec<Message>,
    live: Vec<Message>,
    tail_cursor: Option<MessageId>,
    has_more: bool,
    gaps: Vec<Gap>,
    loading_older: bool,
}

impl WindowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `thread`, dropping everything loaded for the previous one.
    pub fn open(&mut self, thread: Thread) -> Ticket {
        self.generation += 1;
        let ticket = Ticket {
            thread_id: thread.id,
            generation: self.generation,
        };
        self.thread = Some(thread);
        self.clear_buffers();
        ticket
    }

    /// Forget the active thread. Responses still in flight become stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.thread = None;
        self.clear_buffers();
    }

    fn clear_buffers(&mut self) {
        self.initialized = false;
        self.older.clear();
        self.live.clear();
        self.tail_cursor = None;
        self.has_more = false;
        self.gaps.clear();
        self.loading_older = false;
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn ticket(&self) -> Option<Ticket> {
        self.thread.as_ref().map(|t| Ticket {
            thread_id: t.id,
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.ticket().as_ref() == Some(ticket)
    }

    /// Ticket for live refreshes; only available once the first page landed.
    pub fn live_ticket(&self) -> Option<Ticket> {
        self.ticket().filter(|_| self.initialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tail_cursor(&self) -> Option<MessageId> {
        self.tail_cursor
    }

    /// True while older history or a backfill gap is still unloaded.
    pub fn has_more(&self) -> bool {
        self.has_more || self.has_gap()
    }

    pub fn has_gap(&self) -> bool {
        !self.gaps.is_empty()
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn older(&self) -> &[Message] {
        &self.older
    }

    pub fn live(&self) -> &[Message] {
        &self.live
    }

    /// Install the first page of the thread. Returns `false` for a stale ticket.
    pub fn apply_initial(&mut self, ticket: Ticket, page: MessagePage) -> bool {
        if !self.is_current(&ticket) {
            debug!("Discarding stale first page for thread {}", ticket.thread_id);
            return false;
        }
        self.live = accept_page(ticket.thread_id, page.messages);
        self.older.clear();
        self.gaps.clear();
        self.tail_cursor = page.next_cursor;
        self.has_more = page.next_cursor.is_some();
        self.initialized = true;
        true
    }

    /// Check and claim the single backward-load slot. Returns `None` unless
    /// there is something left to load and no other load in flight.
    ///
    /// Gaps left by live refreshes are filled, newest first, before the
    /// walk back from the tail cursor continues.
    pub fn begin_load_older(&mut self, limit: u32) -> Option<OlderRequest> {
        if !self.initialized || self.loading_older {
            return None;
        }
        let ticket = self.ticket()?;
        let (cursor, floor) = match self.gaps.last() {
            Some(gap) => (gap.cursor, Some(gap.floor)),
            None if self.has_more => (self.tail_cursor?, None),
            None => return None,
        };
        self.loading_older = true;
        Some(OlderRequest {
            ticket,
            cursor,
            limit,
            floor,
        })
    }

    /// Release the load slot after a failed request. Cursor and has-more are
    /// left as they were so the same request can be retried.
    pub fn abort_load_older(&mut self, request: &OlderRequest) {
        if self.is_current(&request.ticket) {
            self.loading_older = false;
        }
    }

    pub fn finish_load_older(&mut self, request: &OlderRequest, page: MessagePage) -> LoadOlder {
        if !self.is_current(&request.ticket) {
            debug!(
                "Discarding stale older page for thread {}",
                request.ticket.thread_id
            );
            return LoadOlder::Stale;
        }
        self.loading_older = false;

        if let Some(floor) = request.floor {
            return self.finish_backfill(request, floor, page);
        }

        if page.messages.is_empty() {
            self.has_more = false;
            return LoadOlder::Exhausted;
        }

        let known: HashSet<MessageId> = self.older.iter().map(|m| m.id).collect();
        let mut batch = accept_page(request.ticket.thread_id, page.messages);
        batch.retain(|m| !known.contains(&m.id));

        if let (Some(next), Some(oldest)) = (page.next_cursor, batch.first()) {
            if next >= oldest.id {
                warn!(
                    "Cursor {} from thread {} does not precede loaded message {}; history may have gaps",
                    next, request.ticket.thread_id, oldest.id
                );
            }
        }

        let added = batch.len();
        batch.append(&mut self.older);
        self.older = batch;
        keep_sorted(&mut self.older);

        // The server's cursor is authoritative, even when it is not the
        // smallest id seen.
        self.tail_cursor = page.next_cursor;
        if page.next_cursor.is_none() {
            self.has_more = false;
        }

        LoadOlder::Prepended { added }
    }

    fn finish_backfill(&mut self, request: &OlderRequest, floor: MessageId, page: MessagePage) -> LoadOlder {
        let Some(pos) = self
            .gaps
            .iter()
            .position(|g| g.cursor == request.cursor && g.floor == floor)
        else {
            return LoadOlder::Stale;
        };
        self.gaps.remove(pos);

        let known: HashSet<MessageId> = self.older.iter().chain(self.live.iter()).map(|m| m.id).collect();
        let mut batch = accept_page(request.ticket.thread_id, page.messages);
        let exhausted = batch.is_empty();
        batch.retain(|m| m.id > floor && !known.contains(&m.id));

        let added = batch.len();
        if added > 0 {
            // Backfilled ids can land anywhere in the older buffer.
            self.older.extend(batch);
            self.older.sort_by_key(|m| m.id);
        }

        match page.next_cursor {
            Some(next) if !exhausted && next > floor => {
                if next < request.cursor {
                    self.gaps.insert(pos, Gap { cursor: next, floor });
                } else {
                    warn!(
                        "Cursor {} from thread {} does not move below {}; giving up on gap above {}",
                        next, request.ticket.thread_id, request.cursor, floor
                    );
                }
            }
            _ => debug!(
                "Gap above {} in thread {} filled",
                floor, request.ticket.thread_id
            ),
        }
        LoadOlder::Backfilled { added }
    }

    /// Replace the live page with a fresh most-recent page.
    ///
    /// Messages of the previous live page that are older than everything in
    /// the new one are moved to the older buffer, so a message that was shown
    /// once never disappears from the list. When more messages arrived than
    /// one page holds, the ids in between are recorded as a gap for
    /// [`WindowState::begin_load_older`] to fill.
    pub fn replace_live(&mut self, ticket: Ticket, page: MessagePage) -> LiveUpdate {
        if !self.initialized || !self.is_current(&ticket) {
            debug!("Discarding live page for thread {}", ticket.thread_id);
            return LiveUpdate::Discarded;
        }

        if let (Some(next), Some((newest, _))) = (page.next_cursor, self.newest_loaded()) {
            if next > newest {
                debug!(
                    "Live page for thread {} skipped messages {}..={}",
                    ticket.thread_id,
                    newest + 1,
                    next
                );
                self.gaps.push(Gap {
                    cursor: next,
                    floor: newest,
                });
            }
        }

        let fresh = accept_page(ticket.thread_id, page.messages);
        let floor = fresh.first().map(|m| m.id);
        let in_older: HashSet<MessageId> = self.older.iter().map(|m| m.id).collect();

        let previous = std::mem::replace(&mut self.live, fresh);
        let retained: Vec<Message> = previous
            .into_iter()
            .filter(|m| floor.is_none_or(|f| m.id < f) && !in_older.contains(&m.id))
            .collect();

        let count = retained.len();
        if count > 0 {
            self.older.extend(retained);
            keep_sorted(&mut self.older);
        }
        LiveUpdate::Replaced { retained: count }
    }

    /// The list to render: the older buffer followed by the live messages it
    /// does not already contain.
    pub fn merged_view(&self) -> Vec<Message> {
        let seen: HashSet<MessageId> = self.older.iter().map(|m| m.id).collect();
        self.older
            .iter()
            .chain(self.live.iter().filter(|m| !seen.contains(&m.id)))
            .cloned()
            .collect()
    }

    /// Id and creation time of the newest loaded message.
    pub fn newest_loaded(&self) -> Option<(MessageId, DateTime<Utc>)> {
        self.live
            .iter()
            .chain(self.older.iter())
            .max_by_key(|m| m.id)
            .map(|m| (m.id, m.created_at))
    }
}

/// Server pages arrive newest first; keep them oldest first, without
/// duplicates and without messages from other threads.
fn accept_page(thread_id: Uuid, mut messages: Vec<Message>) -> Vec<Message> {
    let before = messages.len();
    messages.retain(|m| m.thread_id == thread_id);
    if messages.len() != before {
        warn!(
            "Dropped {} messages not belonging to thread {}",
            before - messages.len(),
            thread_id
        );
    }
    messages.sort_by_key(|m| m.id);
    messages.dedup_by_key(|m| m.id);
    messages
}

fn keep_sorted(buffer: &mut [Message]) {
    if !buffer.is_sorted_by_key(|m| m.id) {
        warn!("Older buffer out of order after merge; re-sorting");
        buffer.sort_by_key(|m| m.id);
    }
}
