//! Per-request output tokens.
//!
//! Each separation request writes into its own directory named by a random
//! 64-bit token, so concurrent requests never share an output tree.

use std::fmt;

use rand::RngCore;

/// Number of random bytes in a token (hex-encoded to twice as many chars).
pub const TOKEN_BYTES: usize = 8;

/// A random, lowercase hex-encoded directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputToken(String);

impl OutputToken {
    /// Draw a fresh token from the thread-local RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex_encode(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
