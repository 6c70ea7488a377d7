use agora_types::{Message, MessageId};

use crate::scroll::ScrollMetrics;

/// The scrollable surface the window renders into.
///
/// `render` must lay content out synchronously: metrics read right after it
/// returns describe the new content. Like a browser scroll container,
/// rendering keeps the numeric scroll offset unchanged, so content inserted
/// above the visible area pushes the visible rows down until the window
/// re-anchors.
pub trait Viewport: Send {
    fn metrics(&self) -> ScrollMetrics;

    fn render(&mut self, messages: &[Message]);

    fn set_scroll_top(&mut self, offset: f64);

    fn scroll_to_bottom(&mut self) {
        let bottom = self.metrics().bottom_offset();
        self.set_scroll_top(bottom);
    }
}

/// Layout model with one fixed-height row per message.
#[derive(Debug, Clone)]
pub struct RowViewport {
    row_height: f64,
    client_height: f64,
    scroll_top: f64,
    rows: Vec<MessageId>,
}

impl RowViewport {
    pub fn new(row_height: f64, client_height: f64) -> Self {
        Self {
            row_height,
            client_height,
            scroll_top: 0.0,
            rows: Vec::new(),
        }
    }

    /// Ids in render order.
    pub fn rows(&self) -> &[MessageId] {
        &self.rows
    }

    /// Id of the row at the top edge of the visible area.
    pub fn first_visible(&self) -> Option<MessageId> {
        if self.row_height <= 0.0 {
            return self.rows.first().copied();
        }
        let index = (self.scroll_top / self.row_height).floor() as usize;
        self.rows.get(index).copied()
    }

    /// Scroll relative to the current position, as a user would.
    pub fn scroll_by(&mut self, delta: f64) {
        self.set_scroll_top(self.scroll_top + delta);
    }

    fn content_height(&self) -> f64 {
        self.rows.len() as f64 * self.row_height
    }

    fn clamp(&self, offset: f64) -> f64 {
        let max = (self.content_height() - self.client_height).max(0.0);
        offset.clamp(0.0, max)
    }
}

impl Viewport for RowViewport {
    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_height: self.content_height(),
            scroll_top: self.scroll_top,
            client_height: self.client_height,
        }
    }

    fn render(&mut self, messages: &[Message]) {
        self.rows = messages.iter().map(|m| m.id).collect();
        self.scroll_top = self.clamp(self.scroll_top);
    }

    fn set_scroll_top(&mut self, offset: f64) {
        self.scroll_top = self.clamp(offset);
    }
}
