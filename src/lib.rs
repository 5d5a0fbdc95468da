//! ENCV - permissioned data capture for a two-strand research project
//!
//! Participants in the education strand keep journals and answer
//! questionnaires; participants in the health strand record conversations
//! and watch videos. Admins manage accounts and export everything.
//!
//! Every dashboard operation is decided by the permission evaluator in
//! [`auth::permissions`], given an explicit [`identity::Principal`].

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod export;
pub mod identity;
pub mod records;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{EncvError, Result};
