//! Reading and writing cache files.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::encode::{from_json, to_json};
use crate::error::{CacheError, Result};
use crate::valid::is_valid;

/// How the content of a cache file is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// UTF-8 text
    #[default]
    Text,
    /// Raw bytes, e.g. images or PDF files
    Binary,
    /// JSON, see [`crate::encode`]
    Json,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Binary => "binary",
            Mode::Json => "json",
        }
    }
}

impl FromStr for Mode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "text" => Ok(Mode::Text),
            "binary" => Ok(Mode::Binary),
            "json" => Ok(Mode::Json),
            other => Err(CacheError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The content of a cache file, tagged with its mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl Content {
    pub fn mode(&self) -> Mode {
        match self {
            Content::Text(_) => Mode::Text,
            Content::Binary(_) => Mode::Binary,
            Content::Json(_) => Mode::Json,
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Binary(bytes)
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Content::Json(value)
    }
}

/// Load the cache file at `path` in the given mode.
///
/// The file must exist; check [`is_valid`] first.
pub fn load(path: &Path, mode: Mode) -> Result<Content> {
    match mode {
        Mode::Text => load_text(path).map(Content::Text),
        Mode::Binary => load_binary(path).map(Content::Binary),
        Mode::Json => load_json(path).map(Content::Json),
    }
}

/// Save `content` to the cache file at `path` in its own mode.
pub fn save(path: &Path, content: &Content) -> Result<()> {
    match content {
        Content::Text(text) => save_text(path, text),
        Content::Binary(bytes) => save_binary(path, bytes),
        Content::Json(value) => save_json(path, value),
    }
}

pub fn load_text(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = text.len(), mode = %Mode::Text, "loaded cache file");
    Ok(text)
}

pub fn load_binary(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), mode = %Mode::Binary, "loaded cache file");
    Ok(bytes)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = text.len(), mode = %Mode::Json, "loaded cache file");
    from_json(&text)
}

pub fn save_text(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, text.as_bytes(), Mode::Text)
}

pub fn save_binary(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic(path, bytes, Mode::Binary)
}

/// Serialize `value` to JSON and save it. Nothing is written if the value
/// cannot be represented.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = to_json(value)?;
    write_atomic(path, text.as_bytes(), Mode::Json)
}

/// Write through a temporary file in the target directory and rename it over
/// `path`. Concurrent writers race; the last rename wins.
///
/// A rewritten file keeps its permissions. New files get the same
/// permissions as `fs::write` would give them (0666 less the umask on unix).
fn write_atomic(path: &Path, bytes: &[u8], mode: Mode) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let existing = fs::metadata(path).ok().map(|metadata| metadata.permissions());
    let mut builder = tempfile::Builder::new();
    if existing.is_none()
        && let Some(permissions) = new_file_permissions()
    {
        builder.permissions(permissions);
    }

    let mut temp = builder.tempfile_in(dir)?;
    if let Some(permissions) = existing {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.write_all(bytes)?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = bytes.len(), %mode, "saved cache file");
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    // Subject to the umask when the file is created
    Some(fs::Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// Return the cached content at `path`, or produce, save and return it.
///
/// The cache file is used while [`is_valid`] holds for `lifetime`. Otherwise
/// `produce` is called and its result must match `mode`.
///
/// ```no_run
/// use std::time::Duration;
/// use fscache::{Content, Mode, ResolveOptions, memoize, resolve};
///
/// let opts = ResolveOptions::default().with_split("/");
/// let path = resolve("https://example.com/index.html", &opts)?;
/// let page = memoize(&path, Some(Duration::from_secs(3600)), Mode::Text, || {
///     Ok::<_, fscache::CacheError>(Content::from("<html></html>"))
/// })?;
/// # Ok::<(), fscache::CacheError>(())
/// ```
pub fn memoize<F, E>(
    path: &Path,
    lifetime: Option<Duration>,
    mode: Mode,
    produce: F,
) -> Result<Content, E>
where
    F: FnOnce() -> Result<Content, E>,
    E: From<CacheError>,
{
    if is_valid(path, lifetime) {
        return Ok(load(path, mode)?);
    }

    let content = produce()?;
    if content.mode() != mode {
        return Err(CacheError::ModeMismatch {
            expected: mode,
            found: content.mode(),
        }
        .into());
    }
    save(path, &content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    // Smallest GIF http://probablyprogramming.com/2009/03/15/the-tiniest-gif-ever
    const GIF: &[u8] =
        b"GIF89a\x01\x00\x01\x00\x00\xff\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x00;";

    #[test]
    fn test_mode_from_str() {
        assert_eq!("".parse::<Mode>().unwrap(), Mode::Text);
        assert_eq!("text".parse::<Mode>().unwrap(), Mode::Text);
        assert_eq!("binary".parse::<Mode>().unwrap(), Mode::Binary);
        assert_eq!("json".parse::<Mode>().unwrap(), Mode::Json);
        assert_eq!(
            "pickle".parse::<Mode>().unwrap_err(),
            CacheError::UnknownMode("pickle".to_string())
        );
    }

    #[test]
    fn test_text_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_content.txt");
        save_text(&path, "abc").unwrap();
        assert!(path.exists());
        assert_eq!(load_text(&path).unwrap(), "abc");
    }

    #[test]
    fn test_binary_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_content.gif");
        save_binary(&path, GIF).unwrap();
        assert_eq!(load_binary(&path).unwrap(), GIF);
        assert_eq!(fs::read(&path).unwrap(), GIF);
    }

    #[test]
    fn test_binary_roundtrip_all_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bytes.bin");
        let content: Vec<u8> = (0..=255).collect();
        save(&path, &Content::Binary(content.clone())).unwrap();
        assert_eq!(load(&path, Mode::Binary).unwrap(), Content::Binary(content));
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_content.json");
        let value = json!({
            "list": [1, 2.5, "three", null, true],
            "nested": {"a": {"b": []}},
            "empty": {}
        });
        save(&path, &Content::Json(value.clone())).unwrap();
        assert_eq!(load(&path, Mode::Json).unwrap(), Content::Json(value));
    }

    #[test]
    fn test_json_typed_roundtrip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Entry {
            title: String,
            tags: Vec<String>,
            counts: BTreeMap<String, u32>,
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.json");
        let entry = Entry {
            title: "Gómez".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            counts: BTreeMap::from([("x".to_string(), 1), ("y".to_string(), 2)]),
        };
        save_json(&path, &entry).unwrap();
        assert_eq!(load_json::<Entry>(&path).unwrap(), entry);
    }

    #[test]
    fn test_save_json_unsupported_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unsupported.json");
        let map = BTreeMap::from([((1, 2), "point")]);
        let err = save_json(&path, &map).unwrap_err();
        assert!(matches!(err, CacheError::SerializationUnsupported(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_json_non_finite_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readings.json");
        let err = save_json(&path, &[f64::NAN]).unwrap_err();
        assert!(matches!(err, CacheError::SerializationUnsupported(_)));
        assert!(!path.exists());

        save(&path, &Content::Json(json!([1.0]))).unwrap();
        let err = save_json(&path, &vec![f64::INFINITY, 1.0]).unwrap_err();
        assert!(matches!(err, CacheError::SerializationUnsupported(_)));
        assert_eq!(load_json::<Vec<f64>>(&path).unwrap(), vec![1.0]);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_new_file_permissions_follow_umask() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("reference.txt");
        fs::write(&reference, "x").unwrap();
        let path = dir.path().join("saved.txt");
        save_text(&path, "x").unwrap();

        let mode_of = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode_of(&path), mode_of(&reference));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.txt");
        save_text(&path, "first").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        save_text(&path, "second").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(load_text(&path).unwrap(), "second");
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("malformed.json");
        save_text(&path, "{not json").unwrap();
        let err = load(&path, Mode::Json).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        let err = load(&path, Mode::Text).unwrap_err();
        assert_eq!(
            err,
            CacheError::Io(std::io::Error::from(std::io::ErrorKind::NotFound))
        );
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("file.txt");
        let err = save_text(&path, "abc").unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        save_text(&path, "first").unwrap();
        save_text(&path, "second").unwrap();
        assert_eq!(load_text(&path).unwrap(), "second");
    }

    #[test]
    fn test_memoize_produces_then_reuses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.txt");
        let lifetime = Some(Duration::from_secs(3600));

        let first = memoize(&path, lifetime, Mode::Text, || {
            Ok::<_, CacheError>(Content::from("fresh"))
        })
        .unwrap();
        assert_eq!(first, Content::from("fresh"));

        let second = memoize(&path, lifetime, Mode::Text, || -> Result<Content> {
            panic!("cached content should have been used")
        })
        .unwrap();
        assert_eq!(second, Content::from("fresh"));
    }

    #[test]
    fn test_memoize_refreshes_expired() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.txt");
        save_text(&path, "stale").unwrap();

        let content = memoize(&path, Some(Duration::ZERO), Mode::Text, || {
            Ok::<_, CacheError>(Content::from("fresh"))
        })
        .unwrap();
        assert_eq!(content, Content::from("fresh"));
        assert_eq!(load_text(&path).unwrap(), "fresh");
    }

    #[test]
    fn test_memoize_mode_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.bin");
        let err = memoize(&path, None, Mode::Binary, || {
            Ok::<_, CacheError>(Content::from("text"))
        })
        .unwrap_err();
        assert_eq!(
            err,
            CacheError::ModeMismatch {
                expected: Mode::Binary,
                found: Mode::Text,
            }
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_memoize_propagates_producer_error() {
        #[derive(Debug)]
        #[allow(dead_code)]
        enum FetchError {
            Offline,
            Cache(CacheError),
        }

        impl From<CacheError> for FetchError {
            fn from(err: CacheError) -> Self {
                FetchError::Cache(err)
            }
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.txt");
        let err = memoize(&path, None, Mode::Text, || Err(FetchError::Offline)).unwrap_err();
        assert!(matches!(err, FetchError::Offline));
        assert!(!path.exists());
    }
}
