//! Client-side message window for a two-party thread.
//!
//! The window merges three sources into one ordered, duplicate-free list:
//! the most recent page (refreshed by polling), older pages fetched on demand
//! when the reader scrolls to the top, and messages the current user just
//! sent (picked up by an immediate refetch).
//!
//! - [`WindowState`] holds all buffers and performs every transition
//!   synchronously, so the merge rules can be tested without any I/O.
//! - [`ThreadWindow`] drives the state against a [`MessageSource`] and a
//!   [`Viewport`], handles scroll anchoring and runs the live poller.
//! - [`HttpMessageSource`] talks to the `agora-api` REST service.

pub mod composer;
pub mod config;
pub mod error;
pub mod http;
pub mod scroll;
pub mod source;
pub mod state;
pub mod viewport;
pub mod window;

pub use composer::Composer;
pub use config::WindowConfig;
pub use error::{ConfigError, SendError, SourceError};
pub use http::HttpMessageSource;
pub use scroll::{ScrollAnchor, ScrollMetrics};
pub use source::MessageSource;
pub use state::{LiveUpdate, LoadOlder, OlderRequest, Ticket, WindowState};
pub use viewport::{RowViewport, Viewport};
pub use window::{OpenOutcome, ThreadWindow};
