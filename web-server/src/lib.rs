// web-server/src/lib.rs
pub mod api;
pub mod auth;
pub mod chain;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod payment;
pub mod session_janitor;
pub mod state;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;

pub use error::ServiceError;
pub use state::AppState;
