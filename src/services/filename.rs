//! Filename sanitization for client-supplied names.
//!
//! Raw filenames arrive from multipart form data and are fully attacker
//! controlled. Everything that reaches the storage layer goes through
//! [`sanitize_filename`] first, which is total: any input produces some
//! valid name.

/// Maximum length of a sanitized filename, extension included.
const MAX_FILENAME_LEN: usize = 200;

/// Name substituted when sanitization leaves nothing usable.
const FALLBACK_NAME: &str = "unnamed";

/// Sanitize a client-supplied filename.
///
/// Steps, in order:
/// 1. Keep only the last path segment (both slash variants).
/// 2. Drop NUL bytes.
/// 3. Replace anything outside `[A-Za-z0-9_.-]` with `_`.
/// 4. Collapse runs of two or more `_`/`.` into a single `_`.
/// 5. Strip leading dots and surrounding whitespace.
/// 6. Truncate to 200 bytes, preserving the extension.
/// 7. Fall back to `unnamed` if empty.
///
/// Collapsing runs after replacement so substituted characters cannot
/// reassemble into `..`-like patterns.
pub fn sanitize_filename(raw: &str) -> String {
    let name = raw.replace('\\', "/");
    let name = name.rsplit('/').next().unwrap_or("");

    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '\0' {
            continue;
        }
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            cleaned.push(c);
        } else {
            cleaned.push('_');
        }
    }

    let mut collapsed = String::with_capacity(cleaned.len());
    let mut run = 0usize;
    for c in cleaned.chars() {
        if matches!(c, '_' | '.') {
            run += 1;
            match run {
                1 => collapsed.push(c),
                2 => {
                    // A run just started: retroactively turn it into one `_`.
                    collapsed.pop();
                    collapsed.push('_');
                }
                _ => {}
            }
        } else {
            run = 0;
            collapsed.push(c);
        }
    }

    let mut name = collapsed.trim_start_matches('.').trim().to_string();

    if name.len() > MAX_FILENAME_LEN {
        name = truncate_preserving_extension(&name);
    }

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

/// Shorten an over-long name, keeping its extension when it fits within
/// the length budget. Sanitized names are pure ASCII, so byte truncation
/// is safe.
fn truncate_preserving_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((base, ext)) if !ext.is_empty() && ext.len() + 1 < MAX_FILENAME_LEN => {
            let budget = MAX_FILENAME_LEN - ext.len() - 1;
            format!("{}.{}", &base[..base.len().min(budget)], ext)
        }
        _ => name[..MAX_FILENAME_LEN].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= MAX_FILENAME_LEN
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_filename("report.txt"), "report.txt");
        assert_eq!(sanitize_filename("photo-2024_01.jpg"), "photo-2024_01.jpg");
    }

    #[test]
    fn path_components_are_stripped() {
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("dir/sub/file.txt"), "file.txt");
    }

    #[test]
    fn unsafe_characters_become_underscores() {
        // `(1).` leaves a `_.` run which collapses along with the dot.
        assert_eq!(sanitize_filename("my file (1).txt"), "my_file_1_txt");
        assert_eq!(sanitize_filename("a;b&c.txt"), "a_b_c.txt");
    }

    #[test]
    fn runs_of_dots_and_underscores_collapse() {
        assert_eq!(sanitize_filename("a..b.txt"), "a_b.txt");
        assert_eq!(sanitize_filename("a___b.txt"), "a_b.txt");
        assert_eq!(sanitize_filename("a._.b"), "a_b");
    }

    #[test]
    fn leading_dots_are_stripped() {
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        // `...` collapses to `_` before the leading-dot strip runs.
        assert!(!sanitize_filename("...env").starts_with('.'));
    }

    #[test]
    fn nul_bytes_are_removed() {
        assert_eq!(sanitize_filename("a\0b.txt"), "ab.txt");
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename("///"), "unnamed");
        // A pure dot run collapses to a single underscore, not nothing.
        assert_eq!(sanitize_filename("..."), "_");
    }

    #[test]
    fn long_names_truncate_but_keep_extension() {
        let long = format!("{}.pdf", "x".repeat(400));
        let out = sanitize_filename(&long);
        assert_eq!(out.len(), MAX_FILENAME_LEN);
        assert!(out.ends_with(".pdf"));
    }

    #[test]
    fn long_names_without_extension_truncate_flat() {
        let long = "y".repeat(400);
        let out = sanitize_filename(&long);
        assert_eq!(out.len(), MAX_FILENAME_LEN);
    }

    #[test]
    fn output_is_always_valid() {
        let hostile = [
            "../../../etc/shadow",
            "\\\\server\\share\\x",
            "名前.png",
            " spaced out .txt ",
            "\0\0\0",
            "....//....//x",
            "CON<>|?*.zip",
        ];
        for raw in hostile {
            let out = sanitize_filename(raw);
            assert!(is_valid(&out), "invalid output {:?} for input {:?}", out, raw);
        }
    }
}
