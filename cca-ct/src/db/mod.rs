//! Database access for cca-ct

pub mod contacts;
