//! Random secrets and their stored digests
//!
//! OTP codes and tokens are handed to the client once; the database only
//! ever sees their SHA-256 digest.

use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

/// Number of digits in an email one-time code
pub const OTP_DIGITS: usize = 6;

/// Random bytes behind each opaque token
const TOKEN_BYTES: usize = 32;

/// Uniform 6-digit code, zero padded
pub fn generate_otp_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", code, width = OTP_DIGITS)
}

/// Opaque bearer token: 32 random bytes, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// OTP digest is bound to the email so equal codes for different
/// addresses never collide
pub fn hash_otp(email: &str, code: &str) -> String {
    sha256_hex(&format!("{}:{}", email, code))
}

pub fn hash_token(token: &str) -> String {
    sha256_hex(token)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
