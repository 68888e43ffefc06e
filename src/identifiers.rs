//! Session identifiers and the unbiased random generator behind them.
//!
//! Every transport owns one [`SessionIdentity`]: a short numeric
//! [`ServerId`] and a longer alphanumeric [`SessionId`]. Both are drawn from
//! the OS random source with rejection sampling so that no character of the
//! charset is favoured by modulo reduction.
//!
//! # Example
//!
//! ```ignore
//! use sockjs_client::identifiers::SessionIdentity;
//!
//! let identity = SessionIdentity::generate(16)?;
//! let url = identity.url("http://localhost:8081/echo", "/xhr");
//! // http://localhost:8081/echo/042/aZ3k...q9/xhr
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Characters allowed in a session ID.
pub const SESSION_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Characters allowed in a server ID.
pub const SERVER_CHARSET: &[u8] = b"0123456789";

/// Length of a server ID.
pub const SERVER_ID_LEN: usize = 3;

/// Minimum (and default) length of a session ID.
pub const MIN_SESSION_ID_LEN: usize = 16;

// ============================================================================
// Generator
// ============================================================================

/// Generates a random string of exactly `length` characters from `charset`.
///
/// Uses the OS random source. Each charset byte maps to one `char`.
///
/// # Panics
///
/// Panics if `charset` has fewer than 2 or more than 256 entries.
///
/// # Errors
///
/// Returns [`Error::Randomness`] if the OS random source fails.
pub fn generate(charset: &[u8], length: usize) -> Result<String> {
    generate_with(&mut OsRng, charset, length)
}

/// Generates a random string using the given random source.
///
/// Bytes above `255 - (256 % charset.len())` are discarded so every
/// charset entry is equally likely.
///
/// # Panics
///
/// Panics if `charset` has fewer than 2 or more than 256 entries.
///
/// # Errors
///
/// Returns [`Error::Randomness`] if `rng` fails.
pub fn generate_with<R>(rng: &mut R, charset: &[u8], length: usize) -> Result<String>
where
    R: TryRngCore + ?Sized,
{
    if length == 0 {
        return Ok(String::new());
    }

    let charset_len = charset.len();
    assert!(
        (2..=256).contains(&charset_len),
        "charset must contain between 2 and 256 entries, got {charset_len}"
    );

    let max_acceptable = 255 - (256 % charset_len);
    let mut out = String::with_capacity(length);
    let mut produced = 0;
    let mut batch = vec![0u8; length + length / 4];

    loop {
        rng.try_fill_bytes(&mut batch)
            .map_err(|e| Error::randomness(e.to_string()))?;

        for &byte in &batch {
            let value = usize::from(byte);
            if value > max_acceptable {
                continue;
            }

            out.push(char::from(charset[value % charset_len]));
            produced += 1;
            if produced == length {
                return Ok(out);
            }
        }
    }
}

// ============================================================================
// ServerId
// ============================================================================

/// Numeric server component of a session URL (e.g. `"042"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerId(String);

impl ServerId {
    /// Generates a fresh random server ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Randomness`] if the OS random source fails.
    pub fn generate() -> Result<Self> {
        generate(SERVER_CHARSET, SERVER_ID_LEN).map(Self)
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Alphanumeric session component of a session URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session ID of the default length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Randomness`] if the OS random source fails.
    pub fn generate() -> Result<Self> {
        Self::generate_with_len(MIN_SESSION_ID_LEN)
    }

    /// Generates a session ID of `len` characters, raised to at least 16.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Randomness`] if the OS random source fails.
    pub fn generate_with_len(len: usize) -> Result<Self> {
        generate(SESSION_CHARSET, len.max(MIN_SESSION_ID_LEN)).map(Self)
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SessionIdentity
// ============================================================================

/// The ServerID/SessionID pair naming one logical session.
///
/// Immutable once generated. Reconnects reuse the same identity, so the
/// server sees the same session across physical connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Server component.
    pub server_id: ServerId,
    /// Session component.
    pub session_id: SessionId,
}

impl SessionIdentity {
    /// Generates a new identity with a session ID of `session_id_len` chars.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Randomness`] if the OS random source fails.
    pub fn generate(session_id_len: usize) -> Result<Self> {
        Ok(Self {
            server_id: ServerId::generate()?,
            session_id: SessionId::generate_with_len(session_id_len)?,
        })
    }

    /// Builds `<base>/<server_id>/<session_id><suffix>`.
    ///
    /// A trailing `/` on `base` is ignored.
    #[must_use]
    pub fn url(&self, base: &str, suffix: &str) -> String {
        format!(
            "{}/{}/{}{}",
            base.trim_end_matches('/'),
            self.server_id,
            self.session_id,
            suffix
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Random source that always fails.
    struct FailingRng;

    impl TryRngCore for FailingRng {
        type Error = io::Error;

        fn try_next_u32(&mut self) -> StdResult<u32> {
            Err(io::Error::other("entropy pool unavailable"))
        }

        fn try_next_u64(&mut self) -> StdResult<u64> {
            Err(io::Error::other("entropy pool unavailable"))
        }

        fn try_fill_bytes(&mut self, _dst: &mut [u8]) -> StdResult<()> {
            Err(io::Error::other("entropy pool unavailable"))
        }
    }

    type StdResult<T> = std::result::Result<T, io::Error>;

    /// Pearson chi-square statistic of `sample` against a uniform charset.
    fn chi_square(sample: &str, charset: &[u8]) -> f64 {
        let mut counts = vec![0u64; charset.len()];
        for c in sample.chars() {
            let index = charset
                .iter()
                .position(|&b| char::from(b) == c)
                .expect("character outside charset");
            counts[index] += 1;
        }

        let expected = sample.chars().count() as f64 / charset.len() as f64;
        counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum()
    }

    #[test]
    fn test_zero_length_is_empty() {
        assert_eq!(generate(SESSION_CHARSET, 0).unwrap(), "");
    }

    #[test]
    fn test_zero_length_skips_rng() {
        assert_eq!(generate_with(&mut FailingRng, b"ab", 0).unwrap(), "");
    }

    #[test]
    fn test_length_is_honored() {
        for len in [1, 3, 16, 64, 1000] {
            let s = generate(SESSION_CHARSET, len).unwrap();
            assert_eq!(s.chars().count(), len);
        }
    }

    #[test]
    fn test_characters_come_from_charset() {
        let s = generate(SERVER_CHARSET, 500).unwrap();
        assert!(s.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_full_byte_charset() {
        let charset: Vec<u8> = (0..=255).collect();
        let s = generate(&charset, 300).unwrap();
        assert_eq!(s.chars().count(), 300);
    }

    #[test]
    #[should_panic(expected = "charset must contain")]
    fn test_single_entry_charset_panics() {
        let _ = generate(b"a", 4);
    }

    #[test]
    fn test_rng_failure_is_reported() {
        let err = generate_with(&mut FailingRng, SESSION_CHARSET, 16).unwrap_err();
        assert!(matches!(err, Error::Randomness { .. }));
        assert!(err.to_string().contains("entropy pool unavailable"));
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_with(&mut StdRng::seed_from_u64(7), SESSION_CHARSET, 32).unwrap();
        let b = generate_with(&mut StdRng::seed_from_u64(7), SESSION_CHARSET, 32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_alphanumeric_distribution_is_uniform() {
        // 61 degrees of freedom; 130 is far beyond the 0.0001 critical value.
        let sample = generate(SESSION_CHARSET, SESSION_CHARSET.len() * 1000).unwrap();
        let stat = chi_square(&sample, SESSION_CHARSET);
        assert!(stat < 130.0, "chi-square {stat} too large");
    }

    #[test]
    fn test_no_modulo_bias_for_awkward_charset() {
        // 256 % 200 = 56: without rejection the first 56 entries would be
        // twice as likely as the rest.
        let charset: Vec<u8> = (0..200).collect();
        let sample = generate(&charset, charset.len() * 500).unwrap();
        let stat = chi_square(&sample, &charset);
        assert!(stat < 320.0, "chi-square {stat} too large");
    }

    #[test]
    fn test_server_id_format() {
        let id = ServerId::generate().unwrap();
        assert_eq!(id.as_str().len(), SERVER_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_session_id_minimum_length() {
        let id = SessionId::generate_with_len(4).unwrap();
        assert_eq!(id.as_str().len(), MIN_SESSION_ID_LEN);

        let id = SessionId::generate_with_len(32).unwrap();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_identity_url() {
        let identity = SessionIdentity {
            server_id: ServerId("042".into()),
            session_id: SessionId("abcdefghijklmnop".into()),
        };

        assert_eq!(
            identity.url("http://localhost:8081/echo/", "/xhr"),
            "http://localhost:8081/echo/042/abcdefghijklmnop/xhr"
        );
        assert_eq!(
            identity.url("ws://localhost:8081", "/websocket"),
            "ws://localhost:8081/042/abcdefghijklmnop/websocket"
        );
    }

    proptest! {
        #[test]
        fn prop_length_and_membership(len in 0usize..512, size in 2usize..=256, seed: u64) {
            let charset: Vec<u8> = (0..=255u8).take(size).collect();
            let s = generate_with(&mut StdRng::seed_from_u64(seed), &charset, len).unwrap();

            prop_assert_eq!(s.chars().count(), len);
            let all_in_charset = s
                .chars()
                .all(|c| u8::try_from(u32::from(c)).is_ok_and(|b| charset.contains(&b)));
            prop_assert!(all_in_charset);
        }
    }
}
