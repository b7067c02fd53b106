//! Object key validation.
//!
//! Every caller-supplied key must pass [`validate_key`] before any read,
//! head, delete, or presign call reaches the storage backend. This is the
//! access-control boundary for keyed operations: a key accepted here always
//! denotes a location inside the allowed namespace.

use thiserror::Error;

/// Keys must live under one of these prefixes.
const ALLOWED_PREFIXES: [&str; 1] = ["uploads/"];

/// Substrings that indicate traversal or NUL smuggling, matched against the
/// lowercased key so percent-encoding tricks with mixed case are caught.
const DANGEROUS_SEQUENCES: [&str; 5] = ["../", "/..", "\\", "%2e%2e", "%00"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid file key")]
pub struct InvalidKey;

/// Reject keys that could escape the allowed prefix or contain traversal.
pub fn validate_key(key: &str) -> Result<(), InvalidKey> {
    if key.is_empty() || !ALLOWED_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return Err(InvalidKey);
    }
    let folded = key.to_lowercase();
    if folded.contains('\0') || DANGEROUS_SEQUENCES.iter().any(|s| folded.contains(s)) {
        return Err(InvalidKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_keys_under_uploads() {
        assert!(validate_key("uploads/abc123def456_report.txt").is_ok());
        assert!(validate_key("uploads/a").is_ok());
    }

    #[test]
    fn rejects_empty_and_foreign_prefixes() {
        assert_eq!(validate_key(""), Err(InvalidKey));
        assert_eq!(validate_key("private/secret"), Err(InvalidKey));
        assert_eq!(validate_key("upload/x"), Err(InvalidKey));
    }

    #[test]
    fn rejects_traversal_sequences() {
        assert_eq!(validate_key("uploads/../etc/passwd"), Err(InvalidKey));
        assert_eq!(validate_key("uploads/a/.."), Err(InvalidKey));
        assert_eq!(validate_key("uploads\\x"), Err(InvalidKey));
        assert_eq!(validate_key("uploads/a\\b"), Err(InvalidKey));
    }

    #[test]
    fn rejects_encoded_sequences_case_insensitively() {
        assert_eq!(validate_key("uploads/%2e%2e/x"), Err(InvalidKey));
        assert_eq!(validate_key("uploads/%2E%2E/x"), Err(InvalidKey));
        assert_eq!(validate_key("uploads/a%00b"), Err(InvalidKey));
        assert_eq!(validate_key("uploads/a\0b"), Err(InvalidKey));
    }
}
