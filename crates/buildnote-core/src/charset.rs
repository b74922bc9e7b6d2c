use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported charset: {0}. Expected: utf-8, iso-8859-1")]
pub struct CharsetError(pub String);

/// Character encoding of a build tool's console output.
///
/// Only ASCII-compatible encodings are supported: `\n` is always the single
/// byte 0x0A, so splitting raw bytes on it never cuts a character in half.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[serde(rename = "iso-8859-1", alias = "latin1", alias = "ISO-8859-1")]
    Latin1,
}

impl Charset {
    /// Decode bytes to text. Malformed UTF-8 sequences become U+FFFD;
    /// Latin-1 maps every byte to the code point of the same value.
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes),
            Charset::Latin1 => {
                if bytes.is_ascii() {
                    // ASCII is valid UTF-8; no copy needed.
                    String::from_utf8_lossy(bytes)
                } else {
                    Cow::Owned(bytes.iter().map(|&b| b as char).collect())
                }
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Latin1 => "iso-8859-1",
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Charset {
    type Err = CharsetError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Charset::Latin1),
            other => Err(CharsetError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_replaces_malformed_sequences() {
        let text = Charset::Utf8.decode(b"ok \xff\xfe end");
        assert_eq!(text, "ok \u{fffd}\u{fffd} end");
    }

    #[test]
    fn utf8_borrows_valid_input() {
        assert!(matches!(Charset::Utf8.decode("héllo".as_bytes()), Cow::Borrowed("héllo")));
    }

    #[test]
    fn latin1_maps_high_bytes() {
        assert_eq!(Charset::Latin1.decode(b"caf\xe9"), "café");
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("UTF8".parse::<Charset>(), Ok(Charset::Utf8));
        assert_eq!(" latin1 ".parse::<Charset>(), Ok(Charset::Latin1));
        assert!("ebcdic".parse::<Charset>().is_err());
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Charset::Latin1).unwrap(), "\"iso-8859-1\"");
        let c: Charset = serde_json::from_str("\"utf8\"").unwrap();
        assert_eq!(c, Charset::Utf8);
    }
}
