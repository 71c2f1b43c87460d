//! Percent-encoding of file paths for the `/shout_trace/file/-…` URL segment.
//!
//! `..` is escaped twice (`%252E%252E`) so that an intermediary performing one
//! round of percent-decoding hands the resolver `%2E%2E` instead of a raw
//! traversal segment. Decoding accepts both forms, which makes the escape
//! ambiguous with a path that literally contains `%2E%2E`: such a path comes
//! back as `..`.

use std::fmt::Write;

use percent_encoding::percent_decode_str;

/// Dot-pair escape as it appears in generated URLs.
pub const DOUBLE_ESCAPED_DOTS: &str = "%252E%252E";
/// Dot-pair escape after one round of transport decoding.
pub const ESCAPED_DOTS: &str = "%2E%2E";

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'/' | b'-')
}

pub fn encode(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for &byte in path.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            // Writing into a String cannot fail.
            let _ = write!(out, "%{:02x}", byte);
        }
    }
    // Must run after percent-encoding: the `%` in the escape is itself escaped.
    out.replace("..", DOUBLE_ESCAPED_DOTS)
}

pub fn decode(segment: &str) -> String {
    let restored = segment
        .replace(DOUBLE_ESCAPED_DOTS, "..")
        .replace(ESCAPED_DOTS, "..");
    percent_decode_str(&restored)
        .decode_utf8_lossy()
        .into_owned()
}
