//! Content-type allow-list and extension consistency checks.
//!
//! The declared MIME type comes straight from the request and is not derived
//! from the bytes. Cross-checking the filename extension against the declared
//! type cheaply narrows spoofing without full content sniffing.

/// Allowed MIME types and the extensions each one accepts.
/// Extensions are stored lowercase; comparisons lowercase the input.
const MIME_EXTENSIONS: [(&str, &[&str]); 13] = [
    ("image/jpeg", &["jpg", "jpeg", "jfif"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("application/pdf", &["pdf"]),
    ("text/plain", &["txt", "text", "log", "md"]),
    ("text/csv", &["csv"]),
    ("application/json", &["json"]),
    ("application/zip", &["zip"]),
    ("video/mp4", &["mp4"]),
    ("audio/mpeg", &["mp3", "mpeg"]),
    ("audio/wav", &["wav"]),
    ("image/svg+xml", &["svg"]),
];

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn extensions_for(content_type: &str) -> Option<&'static [&'static str]> {
    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, exts)| *exts)
}

/// Whether the declared content type is in the allow-list.
pub fn is_allowed(content_type: &str) -> bool {
    extensions_for(content_type).is_some()
}

/// Extract the lowercased extension from a filename, empty if none.
pub fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Verify the filename's extension is consistent with the declared type.
///
/// A name without an extension passes (the allow-list check already ran);
/// an unknown content type never passes.
pub fn extension_matches(filename: &str, content_type: &str) -> bool {
    let Some(allowed) = extensions_for(content_type) else {
        return false;
    };
    let ext = extension_of(filename);
    if ext.is_empty() {
        return true;
    }
    allowed.contains(&ext.as_str())
}

/// Best-effort reverse lookup from a key's extension to a MIME type.
/// Used when re-deriving the type of an already-stored object.
pub fn guess_content_type(key: &str) -> &'static str {
    let ext = extension_of(key);
    MIME_EXTENSIONS
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(mime, _)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_membership() {
        assert!(is_allowed("image/jpeg"));
        assert!(is_allowed("application/pdf"));
        assert!(!is_allowed("application/x-msdownload"));
        assert!(!is_allowed("text/html"));
    }

    #[test]
    fn matching_extensions_pass() {
        assert!(extension_matches("a.jpg", "image/jpeg"));
        assert!(extension_matches("a.JPEG", "image/jpeg"));
        assert!(extension_matches("notes.md", "text/plain"));
    }

    #[test]
    fn mismatched_extensions_fail() {
        assert!(!extension_matches("a.exe", "image/jpeg"));
        assert!(!extension_matches("a.png", "image/jpeg"));
    }

    #[test]
    fn no_extension_is_permissive() {
        assert!(extension_matches("a", "image/jpeg"));
    }

    #[test]
    fn unknown_type_always_fails() {
        assert!(!extension_matches("a.html", "text/html"));
        assert!(!extension_matches("a", "text/html"));
    }

    #[test]
    fn guesses_type_from_extension() {
        assert_eq!(guess_content_type("uploads/x_a.png"), "image/png");
        assert_eq!(guess_content_type("uploads/x_a.mp3"), "audio/mpeg");
        assert_eq!(guess_content_type("uploads/x_a.bin"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess_content_type("uploads/noext"), DEFAULT_CONTENT_TYPE);
    }
}
