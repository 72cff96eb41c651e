//! Parameter store kept as JSON files below a root directory.
//!
//! Parameter `/a/b/c` lives in `<root>/a/b/c.json`:
//!
//! ```json
//! { "value": "...", "type": "SecureString", "key_id": "alias/consul" }
//! ```
//!
//! Values are stored as given; the type and key id are metadata only.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ParameterStore;
use crate::types::{ParameterPage, ParameterRecord, ParameterType, PutOptions};

/// Page size used when the caller leaves it open.
pub const DEFAULT_PAGE_SIZE: usize = 10;

const EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sibling of `path` unique to this write.
fn temp_path(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("{EXTENSION}.{}-{n}.tmp", process::id()))
}

/// Move a fully written `tmp` into place at `path`.
///
/// Without `overwrite` the file is hard-linked, which fails when `path`
/// exists, so at most one concurrent writer wins.
fn commit(name: &str, tmp: &Path, path: &Path, overwrite: bool) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if overwrite {
        return fs::rename(tmp, path).map_err(io_err);
    }
    match fs::hard_link(tmp, path) {
        Ok(()) => {
            let _ = fs::remove_file(tmp);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(StoreError::AlreadyExists(name.to_string()))
        }
        Err(source) => Err(io_err(source)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredParameter {
    value: String,
    #[serde(rename = "type")]
    kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_id: Option<String>,
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Split a parameter name into its path segments.
///
/// Accepts `a/b` and `/a/b`; rejects empty, `.` and `..` segments and any
/// character outside `[A-Za-z0-9_.-]`.
fn segments(name: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = name.strip_prefix('/').unwrap_or(name);
    let parts: Vec<&str> = trimmed.split('/').collect();
    let valid = parts
        .iter()
        .all(|p| !p.is_empty() && *p != "." && *p != ".." && p.chars().all(is_segment_char));
    if valid {
        Ok(parts)
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct FsParameterStore {
    root: PathBuf,
}

impl FsParameterStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let parts = segments(name)?;
        let mut path = self.root.clone();
        if let Some((last, dirs)) = parts.split_last() {
            path.extend(dirs);
            path.push(format!("{last}.{EXTENSION}"));
        }
        Ok(path)
    }

    /// Directory holding everything below `prefix`; the root for `""` or `/`.
    fn dir_for(&self, prefix: &str) -> Result<PathBuf, StoreError> {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(self.root.clone());
        }
        let mut path = self.root.clone();
        path.extend(segments(trimmed)?);
        Ok(path)
    }

    fn read(&self, name: &str, path: &Path) -> Result<Option<StoredParameter>, StoreError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Collect parameter names below `dir`, `base` being the name of `dir`.
    fn walk(&self, dir: &Path, base: &str, names: &mut Vec<String>) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_err(e)),
        };

        for entry in entries {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if entry.file_type().map_err(io_err)?.is_dir() {
                if segments(&file_name).is_ok() {
                    self.walk(&path, &format!("{base}/{file_name}"), names)?;
                }
                continue;
            }
            let stem = file_name.strip_suffix(".json");
            if let Some(stem) = stem.filter(|s| segments(s).is_ok()) {
                names.push(format!("{base}/{stem}"));
            }
        }
        Ok(())
    }
}

impl ParameterStore for FsParameterStore {
    fn get(&self, name: &str, fail_if_absent: bool) -> Result<String, StoreError> {
        let path = self.path_for(name)?;
        match self.read(name, &path)? {
            Some(stored) => Ok(stored.value),
            None if fail_if_absent => Err(StoreError::NotFound(name.to_string())),
            None => Ok(String::new()),
        }
    }

    fn put(&self, name: &str, value: &str, options: &PutOptions) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let stored = StoredParameter {
            value: value.to_string(),
            kind: options.parameter_type(),
            key_id: options.key_id.clone().filter(|_| options.secure),
        };
        let body = serde_json::to_string_pretty(&stored).map_err(|e| StoreError::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        // Readers only ever see complete files.
        let tmp = temp_path(&path);
        fs::write(&tmp, body)
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })
            .and_then(|()| commit(name, &tmp, &path, options.overwrite))
            .inspect_err(|_| {
                let _ = fs::remove_file(&tmp);
            })?;

        debug!(event = "Store", phase = "Put", param = name, kind = %stored.kind);
        Ok(())
    }

    fn list_page(
        &self,
        prefix: &str,
        page_size: Option<usize>,
        next_token: Option<&str>,
    ) -> Result<ParameterPage, StoreError> {
        let dir = self.dir_for(prefix)?;
        let base = prefix.trim_end_matches('/');
        let base = if base.is_empty() || base.starts_with('/') {
            base.to_string()
        } else {
            format!("/{base}")
        };

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidPageToken(token.to_string()))?,
            None => 0,
        };
        let page_size = page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE);

        let mut names = Vec::new();
        self.walk(&dir, &base, &mut names)?;
        names.sort();

        let mut records = Vec::new();
        for name in names.iter().skip(offset).take(page_size) {
            let path = self.path_for(name)?;
            // A file removed between walking and reading is simply skipped.
            if let Some(stored) = self.read(name, &path)? {
                records.push(ParameterRecord::new(name.as_str(), stored.value));
            }
        }

        let end = offset.saturating_add(page_size);
        let next_token = (end < names.len()).then(|| end.to_string());
        debug!(
            event = "Store",
            phase = "List",
            prefix,
            offset,
            returned = records.len(),
            total = names.len()
        );
        Ok(ParameterPage {
            records,
            next_token,
        })
    }
}
