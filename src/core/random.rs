use base64::Engine;
use rand::distributions::{Alphanumeric, DistString};
use rand::{Rng, RngCore, rngs::OsRng};

/// Generates a cryptographically secure random string (32 bytes -> Base64).
#[must_use]
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Random string over `[A-Za-z0-9]`.
#[must_use]
pub fn alphanumeric(len: usize) -> String {
    Alphanumeric.sample_string(&mut OsRng, len)
}

/// Random string of decimal digits.
#[must_use]
pub fn digits(len: usize) -> String {
    (0..len).map(|_| char::from(OsRng.gen_range(b'0'..=b'9'))).collect()
}
