use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::TimeDelta;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use agora_types::api::MessagePage;
use agora_types::{Message, MessageId, Thread};

use crate::composer::Composer;
use crate::config::WindowConfig;
use crate::error::{ConfigError, SendError, SourceError};
use crate::scroll::{ScrollAnchor, ScrollMetrics};
use crate::source::MessageSource;
use crate::state::{LiveUpdate, LoadOlder, Ticket, WindowState};
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Loaded,
    /// Another thread was opened before the first page arrived.
    Stale,
}

/// Message list of the active thread, kept in sync with a [`MessageSource`]
/// and rendered into a [`Viewport`].
///
/// Locks are never held across `.await`. When both are needed the viewport
/// is locked before the state.
pub struct ThreadWindow<S, V> {
    source: S,
    viewport: Mutex<V>,
    state: Mutex<WindowState>,
    composer: Mutex<Composer>,
    current_user: Uuid,
    config: WindowConfig,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: MessageSource, V: Viewport> ThreadWindow<S, V> {
    pub fn new(
        source: S,
        viewport: V,
        current_user: Uuid,
        config: WindowConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            viewport: Mutex::new(viewport),
            state: Mutex::new(WindowState::new()),
            composer: Mutex::new(Composer::default()),
            current_user,
            config,
        })
    }

    fn state(&self) -> MutexGuard<'_, WindowState> {
        lock(&self.state)
    }

    fn viewport(&self) -> MutexGuard<'_, V> {
        lock(&self.viewport)
    }

    fn composer(&self) -> MutexGuard<'_, Composer> {
        lock(&self.composer)
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    // -- Inspection --

    pub fn merged_view(&self) -> Vec<Message> {
        self.state().merged_view()
    }

    pub fn active_thread(&self) -> Option<Thread> {
        self.state().thread().cloned()
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more()
    }

    pub fn tail_cursor(&self) -> Option<MessageId> {
        self.state().tail_cursor()
    }

    pub fn is_loading_older(&self) -> bool {
        self.state().is_loading_older()
    }

    pub fn scroll_metrics(&self) -> ScrollMetrics {
        self.viewport().metrics()
    }

    /// Run `f` against the viewport, e.g. to apply a user scroll.
    pub fn with_viewport<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.viewport())
    }

    // -- Thread lifecycle --

    /// Make `thread` the active thread and load its most recent page.
    ///
    /// On failure the window stays empty; opening the thread again retries.
    pub async fn open_thread(&self, thread: Thread) -> Result<OpenOutcome, SourceError> {
        let ticket = self.state().open(thread);
        self.viewport().render(&[]);
        info!("Opening thread {}", ticket.thread_id);

        let page = self
            .source
            .fetch_messages(ticket.thread_id, self.config.initial_page_size, None)
            .await
            .inspect_err(|e| warn!("Initial load of thread {} failed: {}", ticket.thread_id, e))?;

        let mut viewport = self.viewport();
        let mut state = self.state();
        if !state.apply_initial(ticket, page) {
            return Ok(OpenOutcome::Stale);
        }
        let merged = state.merged_view();
        drop(state);

        viewport.render(&merged);
        viewport.scroll_to_bottom();
        debug!(
            "Thread {} opened with {} messages",
            ticket.thread_id,
            merged.len()
        );
        Ok(OpenOutcome::Loaded)
    }

    /// Drop the active thread, e.g. when the view goes away.
    pub fn close(&self) {
        let mut viewport = self.viewport();
        self.state().close();
        viewport.render(&[]);
    }

    // -- Backward pagination --

    /// Fetch the page before the tail cursor and prepend it, keeping the
    /// content under the reader's eyes in place. A gap left by a live
    /// refresh is filled first.
    pub async fn load_older(&self) -> Result<LoadOlder, SourceError> {
        let Some(request) = self.state().begin_load_older(self.config.older_page_size) else {
            return Ok(LoadOlder::Skipped);
        };
        debug!(
            "Loading {} messages of thread {} from cursor {} (floor {:?})",
            request.limit, request.ticket.thread_id, request.cursor, request.floor
        );

        let result = self
            .source
            .fetch_messages(request.ticket.thread_id, request.limit, Some(request.cursor))
            .await;

        let mut viewport = self.viewport();
        let anchor = ScrollAnchor::capture(viewport.metrics());
        let mut state = self.state();

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                state.abort_load_older(&request);
                warn!(
                    "Loading older messages of thread {} failed: {}",
                    request.ticket.thread_id, e
                );
                return Err(e);
            }
        };

        let outcome = state.finish_load_older(&request, page);
        if let LoadOlder::Prepended { added } | LoadOlder::Backfilled { added } = outcome {
            if added > 0 {
                let merged = state.merged_view();
                drop(state);

                viewport.render(&merged);
                let offset = anchor.restored_offset(viewport.metrics());
                viewport.set_scroll_top(offset);
            }
        }
        Ok(outcome)
    }

    // -- Live updates --

    /// Replace the live page with the latest messages. Follows the bottom of
    /// the list only if the reader was already there.
    pub async fn refresh_live(&self) -> Result<LiveUpdate, SourceError> {
        self.refetch_live(false).await
    }

    async fn refetch_live(&self, force_bottom: bool) -> Result<LiveUpdate, SourceError> {
        let Some(ticket) = self.state().live_ticket() else {
            return Ok(LiveUpdate::Discarded);
        };

        let page = self
            .source
            .fetch_messages(ticket.thread_id, self.config.initial_page_size, None)
            .await?;

        let (update, gap) = self.apply_live(ticket, page, force_bottom);
        if gap {
            self.backfill().await;
        }
        Ok(update)
    }

    fn apply_live(&self, ticket: Ticket, page: MessagePage, force_bottom: bool) -> (LiveUpdate, bool) {
        let mut viewport = self.viewport();
        let follow = force_bottom || viewport.metrics().is_near_bottom(self.config.bottom_threshold);
        let mut state = self.state();

        let update = state.replace_live(ticket, page);
        if let LiveUpdate::Replaced { .. } = update {
            let merged = state.merged_view();
            let gap = state.has_gap();
            drop(state);

            viewport.render(&merged);
            if follow {
                viewport.scroll_to_bottom();
            }
            return (update, gap);
        }
        (update, false)
    }

    /// Fill gaps left by live refreshes until none remain, a request fails,
    /// or another backward load holds the slot.
    async fn backfill(&self) {
        while self.state().has_gap() {
            match self.load_older().await {
                Ok(LoadOlder::Backfilled { .. }) => {}
                Ok(_) => break,
                Err(e) => {
                    debug!("Backfill failed: {}", e);
                    break;
                }
            }
        }
    }

    /// One poll tick: ask whether anything arrived after the newest loaded
    /// message and refresh the live page if so. Gaps a failed backfill left
    /// behind are retried. Failures wait for the next tick.
    pub async fn poll(&self) {
        let (ticket, newest, gap) = {
            let state = self.state();
            match state.live_ticket() {
                Some(ticket) => (ticket, state.newest_loaded(), state.has_gap()),
                None => return,
            }
        };

        // Timestamps only carry milliseconds, so ask from one tick earlier
        // and decide by id.
        let changed = match newest {
            None => true,
            Some((newest_id, at)) => {
                let since = at - TimeDelta::milliseconds(1);
                match self.source.fetch_new_since(ticket.thread_id, since).await {
                    Ok(new) => new.iter().any(|m| m.id > newest_id),
                    Err(e) => {
                        debug!("Poll of thread {} failed: {}", ticket.thread_id, e);
                        return;
                    }
                }
            }
        };

        if changed {
            if let Err(e) = self.refresh_live().await {
                debug!("Live refresh of thread {} failed: {}", ticket.thread_id, e);
            }
        } else if gap {
            self.backfill().await;
        }
    }

    /// Poll on `config.poll_interval` until `shutdown_rx` fires or its
    /// sender is dropped.
    pub fn spawn_poller(self: &Arc<Self>, mut shutdown_rx: oneshot::Receiver<()>) -> JoinHandle<()>
    where
        S: 'static,
        V: 'static,
    {
        let window = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the thread was just loaded.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => window.poll().await,
                    _ = &mut shutdown_rx => break,
                }
            }
            debug!("Live poller stopped");
        })
    }

    // -- Sending --

    pub fn set_draft(&self, text: impl Into<String>) {
        self.composer().set_draft(text);
    }

    pub fn draft(&self) -> String {
        self.composer().draft().to_string()
    }

    pub fn send_error(&self) -> Option<String> {
        self.composer().error().map(str::to_string)
    }

    /// Send the current draft to the other participant.
    ///
    /// On success the draft is cleared, the live page is refetched right away
    /// and the list scrolls to the bottom. On failure the error is shown on
    /// the composer and the draft is kept.
    pub async fn send_message(&self) -> Result<Message, SendError> {
        let result = self.try_send().await;
        if let Err(e) = &result {
            self.composer().failed(e);
        }
        result
    }

    async fn try_send(&self) -> Result<Message, SendError> {
        let snapshot = self.draft();
        let content = self.composer().prepared()?;

        let (thread_id, recipient_id) = {
            let state = self.state();
            let thread = state.thread().ok_or(SendError::NoActiveThread)?;
            if !state.is_initialized() {
                return Err(SendError::ThreadNotLoaded);
            }
            let recipient = thread
                .other_participant(self.current_user)
                .ok_or(SendError::UnresolvedRecipient)?;
            (thread.id, recipient)
        };

        let message = self
            .source
            .send_message(thread_id, recipient_id, &content)
            .await
            .map_err(SendError::Rejected)?;

        self.composer().sent(&snapshot);
        debug!("Sent message {} to thread {}", message.id, thread_id);

        if let Err(e) = self.refetch_live(true).await {
            debug!("Refetch after send to thread {} failed: {}", thread_id, e);
        }
        Ok(message)
    }
}
