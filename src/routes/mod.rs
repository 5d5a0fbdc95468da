//! HTTP routes for ENCV

pub mod auth_routes;
pub mod dashboard;
pub mod download;
pub mod health;
pub mod response;

pub use auth_routes::handle_auth_request;
pub use dashboard::handle_dashboard_request;
pub use download::handle_download_request;
pub use health::health_check;
