//! File-backed local key-value store.
//!
//! One pretty-printed JSON document per key, kept in the data directory.
//! Holds the mirrored filter criteria, the fallback session copy and the
//! cookie jar.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::SeismodashError;

/// Key under which the filter criteria are mirrored.
pub const FILTERS_KEY: &str = "earthquakeFilters";

/// Key under which the logged-in user is mirrored.
pub const SESSION_KEY: &str = "user";

/// Key under which session cookies are kept between CLI invocations.
pub const COOKIES_KEY: &str = "cookies";

/// A directory of JSON documents addressed by key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `dir`. The directory is created lazily.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a value. A missing key yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SeismodashError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SeismodashError::Storage {
                    path,
                    message: e.to_string(),
                });
            }
        };

        let value = serde_json::from_str(&content).map_err(|e| SeismodashError::Storage {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!("loaded {} from {:?}", key, path);
        Ok(Some(value))
    }

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SeismodashError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|e| SeismodashError::Storage {
            path: self.dir.clone(),
            message: e.to_string(),
        })?;

        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(|e| SeismodashError::Storage {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!("stored {} at {:?}", key, path);
        Ok(())
    }

    /// Delete a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(&self, key: &str) -> Result<(), SeismodashError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SeismodashError::Storage {
                path,
                message: e.to_string(),
            }),
        }
    }
}
