//! Pure filename sanitization and collision resolution.
//!
//! The resolver is a fast path only: the record store's
//! `(record_id, version, filename)` uniqueness constraint remains the
//! final arbiter under concurrent uploads, and the engine retries with a
//! fresh bucket snapshot when that constraint fires.

use std::collections::HashSet;

/// Replace every character outside `[A-Za-z0-9._-]` with an underscore.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split a filename into its stem and extension.
///
/// The extension includes the leading dot and is empty when the name has
/// no dot, or only a leading one (`.gitignore` has no extension).
pub fn split_stem_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

/// Return the lowercase extension without the dot (may be empty).
pub fn extension_of(name: &str) -> String {
    let (_, ext) = split_stem_extension(name);
    ext.trim_start_matches('.').to_lowercase()
}

/// Resolve a collision-free filename within a version bucket.
///
/// If the desired name is absent from the bucket it is returned
/// unchanged; otherwise numeric suffixes `stem_1.ext`, `stem_2.ext`, ...
/// are probed in increasing order and the first absent name wins.
pub fn resolve_filename(bucket: &HashSet<String>, desired: &str) -> String {
    if !bucket.contains(desired) {
        return desired.to_string();
    }

    let (stem, ext) = split_stem_extension(desired);
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{stem}_{suffix}{ext}");
        if !bucket.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sanitize_replaces_special_characters() {
        assert_eq!(sanitize_filename("báo cáo (1).pdf"), "b_o_c_o__1_.pdf");
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a b/c\\d.png"), "a_b_c_d.png");
    }

    #[test]
    fn test_split_stem_extension() {
        assert_eq!(split_stem_extension("report.pdf"), ("report", ".pdf"));
        assert_eq!(split_stem_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_stem_extension("README"), ("README", ""));
        assert_eq!(split_stem_extension(".gitignore"), (".gitignore", ""));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.PDF"), "pdf");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_resolve_returns_unchanged_when_absent() {
        assert_eq!(
            resolve_filename(&bucket(&["other.pdf"]), "report.pdf"),
            "report.pdf"
        );
    }

    #[test]
    fn test_resolve_probes_suffixes_in_order() {
        assert_eq!(
            resolve_filename(&bucket(&["report.pdf"]), "report.pdf"),
            "report_1.pdf"
        );
        assert_eq!(
            resolve_filename(&bucket(&["report.pdf", "report_1.pdf"]), "report.pdf"),
            "report_2.pdf"
        );
    }

    #[test]
    fn test_resolve_without_extension() {
        assert_eq!(resolve_filename(&bucket(&["README"]), "README"), "README_1");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let b = bucket(&["a.pdf", "a_1.pdf", "a_2.pdf"]);
        assert_eq!(resolve_filename(&b, "a.pdf"), "a_3.pdf");
        assert_eq!(resolve_filename(&b, "a.pdf"), "a_3.pdf");
    }
}
