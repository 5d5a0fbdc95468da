//! Authentication and authorization
//!
//! Provides:
//! - Password hashing with Argon2
//! - JWT session tokens for signed-in users
//! - The permission evaluator that gates every dashboard operation
//! - Sign-in and per-request principal resolution

pub mod jwt;
pub mod password;
pub mod permissions;
pub mod session;

pub use jwt::{bearer_token, SessionClaims, SessionTokens};
pub use password::{hash_password, verify_password};
pub use permissions::{
    evaluate, evaluate_action, filter_by_kind, filter_visible, within_edit_window,
    ActionPermission, PermissionKind, QueryPermission, Resource, EDIT_WINDOW_DAYS,
};
pub use session::{resolve_principal, sign_in};
