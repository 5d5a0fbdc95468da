//! HTTP server

pub mod http;

pub use self::http::{handle_request, run, AppState};
