//! Shared HTTP API functionality
//!
//! Authentication, the auth middleware and common response types used by
//! all four CCA services (cca-au, cca-qs, cca-re, cca-ct).

pub mod auth;
pub mod error;
pub mod middleware;
pub mod types;

pub use auth::{
    calculate_hash, initialize_shared_secret, load_shared_secret, sign_body, validate_hash,
    validate_timestamp, ApiAuthError, TimestampWindow,
};
pub use error::{ApiError, ApiResult};
pub use middleware::{api_auth_middleware, ApiAuthState, AuthError};
pub use types::ErrorBody;
