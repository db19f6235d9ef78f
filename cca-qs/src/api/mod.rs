//! HTTP API handlers for cca-qs

pub mod health;
pub mod questions;
pub mod sse;
pub mod tests;

pub use health::{get_build_info, health_routes};
pub use questions::{get_question, get_questions};
pub use sse::event_stream;
pub use tests::{get_test, list_tests};
