// src/archive.rs
//! JSON archive primitives: typed load/save with atomic replace.
//!
//! Writes go through a `.tmp` sibling and `fs::rename` so a crashed process
//! never leaves a half-written archive behind.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load a typed JSON document. A missing file yields `T::default()`;
/// a malformed file is reported to the caller.
pub fn load_json<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s)
            .with_context(|| format!("parse JSON archive {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e).with_context(|| format!("read JSON archive {}", path.display())),
    }
}

/// Like [`load_json`] but degrades a malformed file to `T::default()` with a
/// warning. Used where a corrupt archive must not stop the process.
pub fn load_json_or_default<T>(path: impl AsRef<Path>) -> T
where
    T: DeserializeOwned + Default,
{
    let path = path.as_ref();
    match load_json(path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "archive unreadable, starting empty");
            T::default()
        }
    }
}

/// Serialize `value` and atomically replace the file at `path`.
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create archive dir {}", dir.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("serialize JSON archive")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
