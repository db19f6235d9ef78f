//! HTTP API handlers for cca-au

pub mod auth;
pub mod health;
pub mod users;

pub use auth::{introspect, logout, refresh, register, request_otp, verify_otp};
pub use health::{get_build_info, health_routes};
pub use users::get_user;
