//! Cache data in the file system.
//!
//! Any string can serve as a cache key. It is turned into a safe relative
//! path ([`key`]), joined with a base directory ([`resolve`]), checked for
//! freshness ([`is_valid`]) and read or written as text, bytes or JSON
//! ([`load`] / [`save`]).
//!
//! # Cache Layout
//!
//! Without an explicit directory, files are stored in the platform cache
//! directory (via the `directories` crate):
//! - Linux: `~/.cache/fscache/`
//! - macOS: `~/Library/Caches/fscache/`
//! - Windows: `C:\Users\<User>\AppData\Local\fscache\cache\`
//!
//! Override with the `$FSCACHE_DIR` environment variable.
//!
//! With `split = "/"` and [`AlphaIndex::Name`], ids map to files like this:
//!
//! ```text
//! https://example.com/index.html  ->  {base}/https/example.com/i/index.html
//! bands/bad-brains.html           ->  {base}/bands/b/bad-brains.html
//! 0-zero.txt                      ->  {base}/_/0-zero.txt
//! ```
//!
//! Normalization replaces forbidden characters with hyphens, so distinct ids
//! can share a file.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use fscache::{ResolveOptions, is_valid, load_text, resolve, save_text};
//!
//! let url = "https://example.com/index.html";
//! let opts = ResolveOptions::default()
//!     .with_cache_dir(".fscache")
//!     .with_split("/");
//! let cache_file = resolve(url, &opts)?;
//!
//! let content = if is_valid(&cache_file, Some(Duration::from_secs(3600))) {
//!     load_text(&cache_file)?
//! } else {
//!     let content = String::from("<html>...</html>"); // fetch url here
//!     // Saved in .fscache/https/example.com/index.html
//!     save_text(&cache_file, &content)?;
//!     content
//! };
//! # Ok::<(), fscache::CacheError>(())
//! ```

pub mod encode;
pub mod key;

mod error;
mod path;
mod storage;
mod valid;

pub use error::{CacheError, Result};
pub use key::{CacheId, build_id, normalize};
pub use path::{
    APP_NAME, AlphaIndex, CACHE_DIR_ENV, ResolveOptions, alpha_bucket, default_cache_dir,
    expand_home, resolve,
};
pub use storage::{
    Content, Mode, load, load_binary, load_json, load_text, memoize, save, save_binary, save_json,
    save_text,
};
pub use valid::is_valid;
