//! Cache path computation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::{BaseDirs, ProjectDirs};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::key::{CacheId, is_dot_segment};

/// Application name used for the default cache directory.
pub const APP_NAME: &str = "fscache";

/// Environment variable overriding the default cache directory.
pub const CACHE_DIR_ENV: &str = "FSCACHE_DIR";

/// Alphabetical directory index inserted before the file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AlphaIndex {
    /// No index directory
    #[default]
    None,
    /// Bucket by the first character of the file name: `a` to `z`, or `_`
    Name,
}

impl AlphaIndex {
    /// The bucket directory for `file_name`, if this index uses one.
    pub fn bucket(self, file_name: &str) -> Option<char> {
        match self {
            AlphaIndex::None => None,
            AlphaIndex::Name => Some(alpha_bucket(file_name)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlphaIndex::None => "none",
            AlphaIndex::Name => "name",
        }
    }
}

impl FromStr for AlphaIndex {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(AlphaIndex::None),
            "name" => Ok(AlphaIndex::Name),
            other => Err(CacheError::UnknownAlphaIndex(other.to_string())),
        }
    }
}

impl fmt::Display for AlphaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase first character of `file_name` if it is an ASCII letter, else `_`.
pub fn alpha_bucket(file_name: &str) -> char {
    match file_name.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some(c @ 'a'..='z') => c,
        _ => '_',
    }
}

/// Options for resolving a cache id to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Base directory. Must already exist. `None` uses [`default_cache_dir`].
    pub cache_dir: Option<PathBuf>,
    /// Separator that turns parts of the cache id into sub directories
    pub split: Option<String>,
    /// Alphabetical index directory before the file name
    pub alpha_index: AlphaIndex,
    /// Create missing directories below the base directory
    pub create_dirs: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            split: None,
            alpha_index: AlphaIndex::None,
            create_dirs: true,
        }
    }
}

impl ResolveOptions {
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(split.into());
        self
    }

    pub fn with_alpha_index(mut self, alpha_index: AlphaIndex) -> Self {
        self.alpha_index = alpha_index;
        self
    }

    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }
}

/// Get the default cache directory.
///
/// `$FSCACHE_DIR` takes precedence and, like an explicit directory, must
/// already exist. Otherwise the platform cache directory is used (via the
/// `directories` crate):
/// - Linux: `~/.cache/fscache`
/// - macOS: `~/Library/Caches/fscache`
/// - Windows: `C:\Users\<User>\AppData\Local\fscache\cache`
pub fn default_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return existing_dir(Path::new(&dir));
    }
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .ok_or(CacheError::NoCacheDirectory)
}

/// Expand a leading `~` component to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), BaseDirs::new()) {
        (Ok(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => path.to_path_buf(),
    }
}

fn existing_dir(dir: &Path) -> Result<PathBuf> {
    let dir = expand_home(dir);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(CacheError::DirectoryNotFound(dir))
    }
}

fn base_dir(opts: &ResolveOptions) -> Result<PathBuf> {
    match opts
        .cache_dir
        .as_deref()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        Some(dir) => existing_dir(dir),
        None => default_cache_dir(),
    }
}

/// Return the path of the cache file for `cache_id`.
///
/// The layout is `{base}/{dirs...}/{bucket}/{name}` where the directories come
/// from splitting the id on [`ResolveOptions::split`] and the bucket is only
/// present with [`AlphaIndex::Name`]. With `split = "/"` and the alphabetical
/// index, `bands/bad-brains.html` resolves to `{base}/bands/b/bad-brains.html`.
///
/// An explicit base directory is never created. Directories below it are
/// created when [`ResolveOptions::create_dirs`] is set; the file itself never
/// is.
pub fn resolve(cache_id: &str, opts: &ResolveOptions) -> Result<PathBuf> {
    let mut path = base_dir(opts)?;

    let id = CacheId::new(cache_id, opts.split.as_deref());
    if id.name().is_empty() || id.segments().any(is_dot_segment) {
        return Err(CacheError::InvalidKey(cache_id.to_string()));
    }

    path.extend(id.dirs());
    if let Some(bucket) = opts.alpha_index.bucket(id.name()) {
        path.push(bucket.to_string());
    }
    path.push(id.name());

    if opts.create_dirs
        && let Some(parent) = path.parent()
    {
        // Succeeds if another process created the directories first
        fs::create_dir_all(parent)?;
        debug!(dir = %parent.display(), "ensured cache directories");
    }

    debug!(cache_id, path = %path.display(), "resolved cache path");
    Ok(path)
}
