//! Cache file validity.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::trace;

/// Check whether the cache file at `path` is valid.
///
/// Returns `false` if the file does not exist or cannot be inspected. Without
/// a `lifetime` an existing file is always valid. Otherwise the file is valid
/// while its age, measured from the modification time, is strictly less than
/// `lifetime`, so a zero lifetime is never valid.
pub fn is_valid(path: &Path, lifetime: Option<Duration>) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            trace!(path = %path.display(), error = %e, "cache miss");
            return false;
        }
    };

    let Some(lifetime) = lifetime else {
        return true;
    };

    let Ok(modified) = metadata.modified() else {
        trace!(path = %path.display(), "modification time unavailable");
        return false;
    };

    let age = file_age(modified.into(), Utc::now());
    let max_age = TimeDelta::from_std(lifetime).unwrap_or(TimeDelta::MAX);
    let valid = age < max_age;
    trace!(
        path = %path.display(),
        age_secs = age.num_seconds(),
        lifetime_secs = lifetime.as_secs(),
        valid,
        "checked cache file age"
    );
    valid
}

/// Age of a file modified at `modified`. Timestamps in the future count as
/// age zero.
fn file_age(modified: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
    now.signed_duration_since(modified).max(TimeDelta::zero())
}
