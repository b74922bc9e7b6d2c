//! Signed wire form of overlay notes.
//!
//! An encoded note is
//!
//! ```text
//! ESC "[8m" "bn:" hex(version || kind || tag) ESC "[0m"
//! ```
//!
//! where `tag` is a 32-byte blake3 keyed hash over a domain string, the
//! version and the kind. The conceal/reset escapes keep the payload invisible
//! when a decorated log is dumped to a terminal.
//!
//! Decoding verifies the tag before the kind is interpreted, so a payload
//! either yields the kind it was signed with or is rejected.

use crate::key::NoteKey;
use crate::note::NoteKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Range;

/// Marker that starts every encoded note.
pub const PREAMBLE: &[u8] = b"\x1b[8mbn:";
/// Marker that ends every encoded note.
pub const POSTAMBLE: &[u8] = b"\x1b[0m";

const FORMAT_VERSION: u8 = 1;
const TAG_LEN: usize = 32;
const PAYLOAD_LEN: usize = 2 + TAG_LEN;
const TAG_DOMAIN: &[u8] = b"buildnote.note";

/// Total length of an encoded note in bytes.
pub const ENCODED_LEN: usize = PREAMBLE.len() + PAYLOAD_LEN * 2 + POSTAMBLE.len();

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload does not start with the note preamble")]
    MissingPreamble,
    #[error("payload does not end with the note postamble")]
    MissingPostamble,
    #[error("note body is not valid hex")]
    InvalidHex,
    #[error("note body decodes to {got} bytes, expected {}", PAYLOAD_LEN)]
    BadLength { got: usize },
    #[error("unsupported note format version {0}")]
    UnsupportedVersion(u8),
    #[error("note signature does not verify")]
    BadSignature,
    #[error("unrecognized note kind {0}")]
    UnknownKind(u8),
}

/// Bytes of one encoded note, ready to be written into a console stream.
///
/// Serializes as a hex string so it can live inside JSON state snapshots.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedNote(Vec<u8>);

impl EncodedNote {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for EncodedNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncodedNote({})", String::from_utf8_lossy(&self.0).escape_debug())
    }
}

impl AsRef<[u8]> for EncodedNote {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for EncodedNote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for EncodedNote {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s)
            .map(EncodedNote)
            .map_err(serde::de::Error::custom)
    }
}

/// Signs and verifies overlay notes with one key.
#[derive(Debug, Clone)]
pub struct NoteCodec {
    key: NoteKey,
}

impl NoteCodec {
    pub fn new(key: NoteKey) -> Self {
        Self { key }
    }

    /// Fingerprint of the signing key; identifies which key a cache was built with.
    pub fn key_id(&self) -> String {
        self.key.fingerprint()
    }

    pub fn encode(&self, kind: NoteKind) -> EncodedNote {
        let tag = self.tag(FORMAT_VERSION, kind.tag());
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.push(FORMAT_VERSION);
        payload.push(kind.tag());
        payload.extend_from_slice(tag.as_bytes());

        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.extend_from_slice(PREAMBLE);
        out.extend_from_slice(hex::encode(&payload).as_bytes());
        out.extend_from_slice(POSTAMBLE);
        EncodedNote(out)
    }

    /// Decode one complete note (preamble through postamble).
    pub fn decode(&self, bytes: &[u8]) -> Result<NoteKind, DecodeError> {
        let body = bytes
            .strip_prefix(PREAMBLE)
            .ok_or(DecodeError::MissingPreamble)?;
        let body = body
            .strip_suffix(POSTAMBLE)
            .ok_or(DecodeError::MissingPostamble)?;
        let payload = hex::decode(body).map_err(|_| DecodeError::InvalidHex)?;
        if payload.len() != PAYLOAD_LEN {
            return Err(DecodeError::BadLength { got: payload.len() });
        }

        let version = payload[0];
        let kind_tag = payload[1];
        if version != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let mut received = [0u8; TAG_LEN];
        received.copy_from_slice(&payload[2..]);
        // blake3::Hash equality is constant-time.
        if self.tag(version, kind_tag) != blake3::Hash::from(received) {
            return Err(DecodeError::BadSignature);
        }

        NoteKind::from_tag(kind_tag).ok_or(DecodeError::UnknownKind(kind_tag))
    }

    fn tag(&self, version: u8, kind_tag: u8) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(self.key.as_bytes());
        hasher.update(TAG_DOMAIN);
        hasher.update(&[version, kind_tag]);
        hasher.finalize()
    }
}

/// Locate the first note candidate in `haystack`: a preamble, exactly
/// `PAYLOAD_LEN * 2` hex digits, then the postamble. A preamble not followed
/// by that shape is plain text and scanning resumes right after it. The
/// candidate is not verified; pass it to [`NoteCodec::decode`].
pub fn find_note(haystack: &[u8]) -> Option<Range<usize>> {
    let mut offset = 0;
    while let Some(pos) = find_subslice(&haystack[offset..], PREAMBLE) {
        let start = offset + pos;
        let body_start = start + PREAMBLE.len();
        let body_end = body_start + PAYLOAD_LEN * 2;
        let end = body_end + POSTAMBLE.len();
        if end <= haystack.len()
            && haystack[body_start..body_end].iter().all(u8::is_ascii_hexdigit)
            && &haystack[body_end..end] == POSTAMBLE
        {
            return Some(start..end);
        }
        offset = body_start;
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
