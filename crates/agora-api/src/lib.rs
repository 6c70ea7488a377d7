pub mod convert;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod threads;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
