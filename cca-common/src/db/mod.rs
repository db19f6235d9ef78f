//! Database schema, settings and catalog seed

pub mod catalog;
pub mod init;
pub mod models;
pub mod seed;
pub mod settings;

pub use init::*;
pub use models::*;
pub use settings::*;
