/// Scroll geometry of the message list, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Total height of the rendered content.
    pub scroll_height: f64,
    /// Offset of the visible area from the top of the content.
    pub scroll_top: f64,
    /// Height of the visible area.
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }

    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.distance_from_bottom() <= threshold
    }

    /// Offset that shows the last line of content.
    pub fn bottom_offset(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

/// Position recorded before content is prepended above the visible area.
///
/// After the new content is laid out, [`ScrollAnchor::restored_offset`]
/// yields the offset that keeps the previously visible content in place:
/// `new_height - old_height + old_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    height: f64,
    offset: f64,
}

impl ScrollAnchor {
    pub fn capture(metrics: ScrollMetrics) -> Self {
        Self {
            height: metrics.scroll_height,
            offset: metrics.scroll_top,
        }
    }

    pub fn restored_offset(&self, after: ScrollMetrics) -> f64 {
        after.scroll_height - self.height + self.offset
    }
}
