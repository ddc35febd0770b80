//! Origin codec: packs an origin (or a full URL) into a path-segment token.
//!
//! # Data Flow
//! ```text
//! "https://example.com"
//!     → UTF-8 bytes
//!     → scheme transform (keyed XOR + hex, or URL-safe base64)
//!     → token placed in /r/<token>/...
//! ```
//!
//! # Design Decisions
//! - One `OriginCodec` value is shared by the server-side passes and the
//!   browser interceptor generator, so both ends always agree
//! - Tokens never contain `/`, `?` or `#`
//! - Decoding is strict: wrong length, bad alphabet or non-UTF-8 output fail

pub mod origin;

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use origin::{Origin, OriginError};

/// Default XOR key shared with the injected client script.
pub const DEFAULT_KEY: [u8; 6] = [83, 116, 105, 99, 107, 121];

/// Token encoding scheme. A deployment pins exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingScheme {
    /// Keyed byte-wise XOR over the UTF-8 string, lower-case hex output.
    #[default]
    XorHex,
    /// URL-safe base64 without padding.
    Base64,
}

/// Errors produced when decoding a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("token is empty")]
    Empty,

    #[error("token length {0} is not a whole number of bytes")]
    Length(usize),

    #[error("token contains characters outside the hex alphabet")]
    InvalidHex,

    #[error("token is not valid base64")]
    InvalidBase64,

    #[error("decoded token is not valid UTF-8")]
    InvalidUtf8,

    #[error("decoded token is not an http(s) origin: {0}")]
    NotAnOrigin(#[from] OriginError),
}

/// Reversible token codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginCodec {
    scheme: EncodingScheme,
    key: Arc<[u8]>,
}

impl OriginCodec {
    /// Create a codec. The key is only used by [`EncodingScheme::XorHex`];
    /// an empty key leaves the bytes unchanged.
    pub fn new(scheme: EncodingScheme, key: impl Into<Arc<[u8]>>) -> Self {
        Self {
            scheme,
            key: key.into(),
        }
    }

    pub fn scheme(&self) -> EncodingScheme {
        self.scheme
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Encode an origin into its token.
    pub fn encode(&self, origin: &Origin) -> String {
        self.encode_str(&origin.to_string())
    }

    /// Decode a token back into an origin.
    pub fn decode(&self, token: &str) -> Result<Origin, DecodeError> {
        let decoded = self.decode_str(token)?;
        Ok(Origin::parse(&decoded)?)
    }

    /// Encode an arbitrary string (used for full-URL tokens).
    pub fn encode_str(&self, input: &str) -> String {
        match self.scheme {
            EncodingScheme::XorHex => hex::encode(self.apply_key(input.as_bytes())),
            EncodingScheme::Base64 => URL_SAFE_NO_PAD.encode(input.as_bytes()),
        }
    }

    /// Decode a token into the string it carries.
    pub fn decode_str(&self, token: &str) -> Result<String, DecodeError> {
        if token.is_empty() {
            return Err(DecodeError::Empty);
        }
        let bytes = match self.scheme {
            EncodingScheme::XorHex => {
                if token.len() % 2 != 0 {
                    return Err(DecodeError::Length(token.len()));
                }
                let raw = hex::decode(token).map_err(|e| match e {
                    hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                        DecodeError::Length(token.len())
                    }
                    hex::FromHexError::InvalidHexCharacter { .. } => DecodeError::InvalidHex,
                })?;
                self.apply_key(&raw)
            }
            EncodingScheme::Base64 => {
                let unpadded = token.trim_end_matches('=');
                if unpadded.len() % 4 == 1 {
                    return Err(DecodeError::Length(token.len()));
                }
                URL_SAFE_NO_PAD
                    .decode(unpadded)
                    .map_err(|_| DecodeError::InvalidBase64)?
            }
        };
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn apply_key(&self, bytes: &[u8]) -> Vec<u8> {
        if self.key.is_empty() {
            return bytes.to_vec();
        }
        bytes
            .iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

impl Default for OriginCodec {
    fn default() -> Self {
        Self::new(EncodingScheme::XorHex, DEFAULT_KEY.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base64_codec() -> OriginCodec {
        OriginCodec::new(EncodingScheme::Base64, Vec::new())
    }

    #[test]
    fn xor_hex_matches_reference_bytes() {
        let codec = OriginCodec::default();
        // 'h' ^ 'S' = 0x3b, 't' ^ 't' = 0x00
        assert!(codec.encode_str("https://a.b").starts_with("3b00"));
        assert_eq!(codec.encode_str(""), "");
    }

    #[test]
    fn roundtrip_both_schemes() {
        let origins = [
            "https://example.com",
            "http://localhost:8080",
            "https://cdn.example.com:8443",
            "http://[::1]:3000",
            "https://xn--bcher-kva.example",
        ];
        for codec in [OriginCodec::default(), base64_codec()] {
            for raw in origins {
                let origin = Origin::parse(raw).unwrap();
                let token = codec.encode(&origin);
                assert!(!token.contains(['/', '?', '#', '=']), "{token}");
                assert_eq!(codec.decode(&token).unwrap(), origin);
                assert_eq!(codec.encode(&origin), token, "deterministic");
            }
        }
    }

    #[test]
    fn hex_decode_is_case_insensitive() {
        let codec = OriginCodec::default();
        let origin = Origin::parse("https://example.com").unwrap();
        let token = codec.encode(&origin).to_uppercase();
        assert_eq!(codec.decode(&token).unwrap(), origin);
    }

    #[test]
    fn base64_accepts_restored_padding() {
        let codec = base64_codec();
        let token = codec.encode_str("https://ab.c");
        let padded = format!("{token}{}", "=".repeat((4 - token.len() % 4) % 4));
        assert_eq!(codec.decode_str(&padded).unwrap(), "https://ab.c");
    }

    #[test]
    fn malformed_tokens_fail() {
        let codec = OriginCodec::default();
        assert_eq!(codec.decode_str(""), Err(DecodeError::Empty));
        assert_eq!(codec.decode_str("abc"), Err(DecodeError::Length(3)));
        assert_eq!(codec.decode_str("zz"), Err(DecodeError::InvalidHex));
        assert!(matches!(
            codec.decode("ZmlsZTovL2V0Yy9wYXNzd2Q"),
            Err(DecodeError::Length(_)) | Err(DecodeError::InvalidHex)
        ));
        // 0xff ^ 'S' is not a valid UTF-8 sequence start
        let bad = hex::encode([0xff ^ 83]);
        assert_eq!(codec.decode_str(&bad), Err(DecodeError::InvalidUtf8));

        let b64 = base64_codec();
        assert_eq!(b64.decode_str("a"), Err(DecodeError::Length(1)));
        assert_eq!(b64.decode_str("a+b/"), Err(DecodeError::InvalidBase64));
    }

    #[test]
    fn decoded_file_scheme_is_not_an_origin() {
        let codec = base64_codec();
        assert_eq!(
            codec.decode_str("ZmlsZTovL2V0Yy9wYXNzd2Q").unwrap(),
            "file://etc/passwd"
        );
        assert!(matches!(
            codec.decode("ZmlsZTovL2V0Yy9wYXNzd2Q"),
            Err(DecodeError::NotAnOrigin(OriginError::Scheme(_)))
        ));
    }

    #[test]
    fn empty_key_is_identity() {
        let codec = OriginCodec::new(EncodingScheme::XorHex, Vec::new());
        assert_eq!(codec.encode_str("hi"), "6869");
        assert_eq!(codec.decode_str("6869").unwrap(), "hi");
    }
}
