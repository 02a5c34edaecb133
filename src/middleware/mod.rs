mod auth;
mod error_handler;
pub mod maintenance;

pub use auth::AuthSession;
pub use error_handler::log_errors;
pub use maintenance::maintenance_gate;
