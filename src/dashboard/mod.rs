//! Permissioned dashboard over users and strand records

pub mod models;
pub mod policy;
pub mod service;

pub use models::{DashboardModel, UserDirectory, UserForm};
pub use policy::{has_permission, Action, ModelPolicy, Rule};
pub use service::{Dashboard, ListPage, ListQuery, ModelEntry, LIST_PER_PAGE};
