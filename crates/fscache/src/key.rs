//! Cache key normalization.
//!
//! Turns arbitrary strings into file-system-safe path segments. Normalization
//! is deterministic but not injective: `"a b"`, `"a?b"` and `"a - b"` all map
//! to `"a-b"`, so distinct keys may address the same cache file.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of anything other than word characters and `.`. Hyphens and
/// whitespace are included so that `"a - b"` collapses to `"a-b"`.
static FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.]+").expect("invalid forbidden-character regex"));

/// A trailing file extension that survives normalization unchanged.
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\w+$").expect("invalid extension regex"));

/// Return `segment` with forbidden characters replaced by hyphens.
///
/// Leading and trailing whitespace is stripped, every run of characters other
/// than letters, digits, `_` and `.` becomes a single `-`, and hyphens left at
/// either end are removed. Unicode letters are kept as they are.
///
/// Returns an empty string when nothing allowed remains; callers that need a
/// file name must reject that case themselves.
pub fn normalize(segment: &str) -> String {
    FORBIDDEN
        .replace_all(segment.trim(), "-")
        .trim_matches('-')
        .to_string()
}

/// Normalize the final segment of a key, keeping its file extension intact.
///
/// `"report (final).json"` becomes `"report-final.json"`, not
/// `"report-final-.json"`.
pub fn normalize_file_name(segment: &str) -> String {
    let name = normalize(segment);
    let (stem, extension) = split_extension(&name);
    format!("{}{}", stem.trim_end_matches('-'), extension)
}

/// Split off a trailing `.ext` made only of word characters.
///
/// A leading dot is part of the name, so `".bashrc"` has no extension.
fn split_extension(segment: &str) -> (&str, &str) {
    match segment.rfind('.') {
        Some(i) if i > 0 && EXTENSION.is_match(&segment[i..]) => segment.split_at(i),
        _ => (segment, ""),
    }
}

/// Whether a normalized segment is `.`, `..` or any other all-dot name.
///
/// Such segments would alias or escape their parent directory.
pub fn is_dot_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c == '.')
}

/// A cache key broken down into normalized directory and file name segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheId {
    dirs: Vec<String>,
    name: String,
}

impl CacheId {
    /// Derive the segments of `key`.
    ///
    /// When `split` is non-empty and occurs in `key`, the key is split on it,
    /// empty parts are dropped and every part is normalized on its own. All
    /// parts but the last become directories. Otherwise the whole key is a
    /// single file name.
    pub fn new(key: &str, split: Option<&str>) -> Self {
        let Some(separator) = split.filter(|s| !s.is_empty() && key.contains(*s)) else {
            return Self {
                dirs: Vec::new(),
                name: normalize_file_name(key),
            };
        };

        let mut parts: Vec<&str> = key.split(separator).filter(|p| !p.is_empty()).collect();
        let name = parts.pop().map(normalize_file_name).unwrap_or_default();
        let dirs = parts
            .into_iter()
            .map(normalize)
            .filter(|dir| !dir.is_empty())
            .collect();

        Self { dirs, name }
    }

    /// Directory segments, outermost first.
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// The file name segment. Empty if the key had nothing usable in it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All segments, directories first and the file name last.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.dirs
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
    }

    /// Join the segments with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.segments().collect::<Vec<_>>().join(separator)
    }
}

/// Create a cache id for `key` that is usable as a relative file path.
///
/// Set `separator` to keep the key's hierarchy, e.g. `"/"` for URLs: each
/// part is normalized separately and rejoined with `separator`. With an empty
/// separator, or one that does not occur in `key`, the whole key is
/// normalized as one segment.
///
/// When the last part has nothing usable in it the result ends with
/// `separator` (`build_id("a/?!", "/")` is `"a/"`). [`crate::resolve`]
/// rejects such keys with [`crate::CacheError::InvalidKey`].
pub fn build_id(key: &str, separator: &str) -> String {
    CacheId::new(key, Some(separator)).join(separator)
}
