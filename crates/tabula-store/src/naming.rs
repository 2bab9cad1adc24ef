//! Session name validation and file-name escaping.
//!
//! Names are user-chosen strings. Everything outside `[A-Za-z0-9._-]` is
//! percent-encoded byte by byte, so any valid name maps to exactly one file
//! stem and back.

use tabula_core::{Error, Result};

/// Longest encoded file stem we are willing to create.
const MAX_ENCODED_LEN: usize = 200;

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-')
}

/// Reject names that cannot be stored.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("session name cannot be empty".into()));
    }
    if name.trim() != name {
        return Err(Error::Validation(
            "session name cannot start or end with whitespace".into(),
        ));
    }
    if name == "." || name == ".." {
        return Err(Error::Validation(format!("'{}' is not a usable session name", name)));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::Validation("session name contains control characters".into()));
    }
    if encode_name(name).len() > MAX_ENCODED_LEN {
        return Err(Error::Validation("session name is too long".into()));
    }
    Ok(())
}

/// Escape a session name into a path-safe file stem.
pub fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if is_plain(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Reverse [`encode_name`]. Returns `None` for stems we did not produce.
pub fn decode_name(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = stem.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if is_plain(b) => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_unchanged() {
        assert_eq!(encode_name("work-2024_v1.final"), "work-2024_v1.final");
    }

    #[test]
    fn test_separators_are_escaped() {
        let encoded = encode_name("client/app ~ main");
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains(' '));
        assert_eq!(decode_name(&encoded).as_deref(), Some("client/app ~ main"));
    }

    #[test]
    fn test_unicode_survives() {
        let encoded = encode_name("café");
        assert_eq!(encoded, "caf%C3%A9");
        assert_eq!(decode_name(&encoded).as_deref(), Some("café"));
    }

    #[test]
    fn test_decode_rejects_foreign_stems() {
        assert_eq!(decode_name("bad%2"), None);
        assert_eq!(decode_name("has space"), None);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("work").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a\nb").is_err());
        assert!(validate_name(" work ").is_err());
        assert!(validate_name("work\t").is_err());
        assert!(validate_name("my work").is_ok());
        assert!(validate_name(&"x".repeat(500)).is_err());
    }
}
