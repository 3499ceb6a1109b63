//! Entry-name normalization
//!
//! Container entries and dictionary lines carry console-style paths:
//! either separator, arbitrary case, sometimes a leading separator.
//! Everything written to disk goes through [`normalize_entry_name`] so
//! re-runs resolve to the same destination no matter which container
//! variant a name came from.

use std::path::PathBuf;

/// Convert a container entry name into a relative on-disk path
///
/// Backslashes and forward slashes both become the native separator,
/// leading separators are trimmed so the name can never escape the
/// destination root upward, and the whole name is lowercased when
/// `lowercase` is set.
pub fn normalize_entry_name(name: &str, lowercase: bool) -> PathBuf {
    let trimmed = name.trim_start_matches(['\\', '/']);
    let mut out = PathBuf::new();
    for part in trimmed.split(['\\', '/']) {
        if part.is_empty() || part == "." || part == ".." {
            continue;
        }
        if lowercase {
            out.push(part.to_lowercase());
        } else {
            out.push(part);
        }
    }
    out
}

/// Lowercased forward-slash form used for hashing dictionary paths
pub fn hash_form(name: &str) -> String {
    let mut cleaned = name.replace('\\', "/").to_lowercase();
    if !cleaned.starts_with('/') {
        cleaned.insert(0, '/');
    }
    cleaned
}
