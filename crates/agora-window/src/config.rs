use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_INITIAL_PAGE_SIZE: u32 = 50;
/// Backward pages are smaller than the first page so that scrolling up
/// stays responsive.
pub const DEFAULT_OLDER_PAGE_SIZE: u32 = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Distance from the bottom, in pixels, that still counts as "at the bottom".
pub const DEFAULT_BOTTOM_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Size of the most-recent page, used on open and on every live refresh.
    pub initial_page_size: u32,
    pub older_page_size: u32,
    pub poll_interval: Duration,
    pub bottom_threshold: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            initial_page_size: DEFAULT_INITIAL_PAGE_SIZE,
            older_page_size: DEFAULT_OLDER_PAGE_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            bottom_threshold: DEFAULT_BOTTOM_THRESHOLD,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_page_size == 0 || self.older_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.bottom_threshold.is_nan() || self.bottom_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.bottom_threshold));
        }
        Ok(())
    }
}
