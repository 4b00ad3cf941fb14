//! Best-effort decoding of redirect `target` values.
//!
//! The host platform wraps destinations in one or more layers of
//! percent-encoding, and occasionally in a long `http%3A`-prefixed wrapper
//! that carries the real destination in a `b64=` field. Decoding failure is
//! never an error at this boundary: the caller always gets a string back.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

use super::{B64_WRAPPER_MIN_CHARS, B64_WRAPPER_PREFIX};

fn encoded_byte_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("%[0-9A-Fa-f]{2}").expect("valid pattern"))
}

fn b64_payload_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("b64=([^&]*)").expect("valid pattern"))
}

#[derive(Debug, Error)]
enum DecodeFailure {
    #[error("malformed percent sequence at byte {0}")]
    MalformedPercent(usize),
    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
    #[error("bad base64 payload: {0}")]
    BadBase64(#[from] base64::DecodeError),
}

/// Decode a redirect `target` value to its destination URL.
///
/// Percent-decoding is peeled one layer at a time until no encoded byte
/// remains; a wrapper carrying a `b64=` payload short-circuits to the base64
/// decode at whichever layer it surfaces. Any malformed layer keeps the
/// original value — decoding never fails past this function.
pub fn decode_redirect_target(raw: &str) -> String {
    match try_decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("target decode failed ({e}); keeping raw value");
            raw.to_string()
        }
    }
}

fn try_decode(raw: &str) -> Result<String, DecodeFailure> {
    let mut decoded = raw.to_string();
    loop {
        if let Some(payload) = base64_payload(&decoded) {
            let bytes = BASE64_STANDARD.decode(payload)?;
            return String::from_utf8(bytes).map_err(|_| DecodeFailure::InvalidUtf8);
        }
        if !encoded_byte_re().is_match(&decoded) {
            return Ok(decoded);
        }
        decoded = percent_pass(&decoded)?;
    }
}

/// The base64 wrapper heuristic: fixed prefix, minimum length, `b64=` field
/// terminated by `&` or end-of-string. Intentionally narrow — this matches
/// the wrapper format as observed on the host platform, nothing more.
fn base64_payload(value: &str) -> Option<&str> {
    if !(value.starts_with(B64_WRAPPER_PREFIX) && value.len() > B64_WRAPPER_MIN_CHARS) {
        return None;
    }
    b64_payload_re()
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|payload| payload.as_str())
}

/// One strict percent-decoding pass. A bare or non-hex `%` sequence anywhere
/// in the string rejects the whole pass, matching the all-or-nothing behavior
/// of `decodeURIComponent`.
fn percent_pass(value: &str) -> Result<String, DecodeFailure> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return Err(DecodeFailure::MalformedPercent(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| DecodeFailure::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::{percent_encode, NON_ALPHANUMERIC};

    fn encode_layer(value: &str) -> String {
        percent_encode(value.as_bytes(), NON_ALPHANUMERIC).to_string()
    }

    #[test]
    fn plain_values_pass_through_unchanged() {
        assert_eq!(decode_redirect_target(""), "");
        assert_eq!(
            decode_redirect_target("https://example.com/a?b=c"),
            "https://example.com/a?b=c"
        );
    }

    #[test]
    fn nested_percent_encoding_is_fully_peeled() {
        let plain = "https://example.com/path?q=1&r=two words";
        let mut encoded = plain.to_string();
        for depth in 1..=5 {
            encoded = encode_layer(&encoded);
            assert_eq!(
                decode_redirect_target(&encoded),
                plain,
                "failed at depth {depth}"
            );
        }
    }

    #[test]
    fn single_layer_decodes() {
        assert_eq!(decode_redirect_target("%41"), "A");
        assert_eq!(
            decode_redirect_target("https%3A%2F%2Fexample.com"),
            "https://example.com"
        );
    }

    #[test]
    fn base64_wrapper_yields_payload() {
        let filler = "x".repeat(95);
        let wrapped = format!("http%3A{filler}b64=SGVsbG8=&rest");
        assert!(wrapped.len() > 100);
        assert_eq!(decode_redirect_target(&wrapped), "Hello");
    }

    #[test]
    fn base64_wrapper_surfacing_after_a_peel_is_honored() {
        let filler = "x".repeat(95);
        let wrapped = format!("http%3A{filler}b64=SGVsbG8=&rest");
        assert_eq!(decode_redirect_target(&encode_layer(&wrapped)), "Hello");
    }

    #[test]
    fn short_wrapper_is_not_treated_as_base64() {
        // Prefix matches but the length gate does not: plain percent decode.
        let short = "http%3A%2F%2Fexample.com%2Fb64%3Dnope";
        assert_eq!(
            decode_redirect_target(short),
            "http://example.com/b64=nope"
        );
    }

    #[test]
    fn malformed_percent_sequence_keeps_original() {
        // No valid encoded byte at all: returned as-is without a decode attempt.
        assert_eq!(decode_redirect_target("%zz"), "%zz");
        // A valid byte alongside a malformed one: the pass fails whole.
        assert_eq!(decode_redirect_target("abc%2Gdef%41"), "abc%2Gdef%41");
        // Truncated sequence at end-of-string.
        assert_eq!(decode_redirect_target("trailing%4"), "trailing%4");
    }

    #[test]
    fn invalid_utf8_keeps_original() {
        assert_eq!(decode_redirect_target("%FF%FE"), "%FF%FE");
    }

    #[test]
    fn bad_base64_payload_keeps_original() {
        let filler = "x".repeat(95);
        let wrapped = format!("http%3A{filler}b64=!!!not-base64!!!&rest");
        assert_eq!(decode_redirect_target(&wrapped), wrapped);
    }
}
