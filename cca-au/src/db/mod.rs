//! Auth service queries

pub mod otps;
pub mod tokens;
pub mod users;
