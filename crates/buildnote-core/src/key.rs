use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of a note signing key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the hex fingerprint used to identify a key in logs and state.
const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("note key must be {} bytes, got {got}", KEY_LEN)]
    BadLength { got: usize },
    #[error("note key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("os random source failed: {0}")]
    Rng(String),
}

/// Secret used to sign overlay notes.
///
/// Only the producing side needs the key to encode; the renderer needs it to
/// verify. `Debug` prints the fingerprint, never the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct NoteKey([u8; KEY_LEN]);

impl NoteKey {
    /// Fresh key from the OS random source.
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| KeyError::Rng(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex key, ignoring surrounding whitespace (key files end in a newline).
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let raw = hex::decode(s.trim())?;
        let bytes: [u8; KEY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::BadLength { got: raw.len() })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short SHA-256 fingerprint: lowercase hex, 16 chars.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        let full = hex::encode(hasher.finalize());
        full[..FINGERPRINT_LEN].to_string()
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NoteKey").field(&self.fingerprint()).finish()
    }
}
