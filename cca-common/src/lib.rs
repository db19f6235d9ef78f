//! # CCA Common Library
//!
//! Shared code for all Career Compass Assessment microservices:
//! - Database schema, seed catalog and models
//! - Assessment catalog (the fixed set of required tests)
//! - API authentication and middleware
//! - Cache-aside providers (Redis, in-process, no-op)
//! - Event bus and SSE helpers
//! - Configuration loading and logging setup

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod logging;
pub mod pagination;
pub mod shutdown;
pub mod sse;
pub mod time;
pub mod validation;

pub use catalog::TestKind;
pub use error::{Error, Result};
