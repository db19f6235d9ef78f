//! HTTP API handlers for cca-ct

pub mod contacts;
pub mod health;
pub mod sse;

pub use contacts::{get_contact, list_contacts, submit_contact};
pub use health::{get_build_info, health_routes};
pub use sse::event_stream;
