//! JSON-file persistence for the consumption record.
//!
//! The file holds a JSON array of code strings. A missing file is an empty
//! record; writes go to a sibling temporary file first and are renamed into
//! place.
//!
//! # Example
//!
//! ```no_run
//! use mail_otp::store::ConsumptionStore;
//!
//! # async fn example() -> mail_otp::Result<()> {
//! let store = ConsumptionStore::new("/var/lib/mail-otp/consumed.json");
//! let mut record = store.load().await?;
//! record.mark_consumed("482910");
//! store.save(&record).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::freshness::ConsumptionRecord;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// File-backed storage for a [`ConsumptionRecord`].
#[derive(Debug, Clone)]
pub struct ConsumptionStore {
    path: PathBuf,
}

impl ConsumptionStore {
    /// Creates a store backed by `path`. Nothing is read until [`load`](Self::load).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record, returning an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on I/O failure and [`Error::StorageFormat`]
    /// if the file is not a JSON array of strings.
    #[instrument(name = "ConsumptionStore::load", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<ConsumptionRecord> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No consumption record yet");
                return Ok(ConsumptionRecord::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let record: ConsumptionRecord =
            serde_json::from_slice(&bytes).map_err(|source| Error::StorageFormat {
                path: self.path.clone(),
                source,
            })?;

        debug!(codes = record.len(), "Loaded consumption record");
        Ok(record)
    }

    /// Writes the record, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on I/O failure.
    #[instrument(name = "ConsumptionStore::save", skip(self, record), fields(path = %self.path.display(), codes = record.len()))]
    pub async fn save(&self, record: &ConsumptionRecord) -> Result<()> {
        let json = serde_json::to_vec(record).map_err(|source| Error::StorageFormat {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        debug!("Saved consumption record");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Storage {
            path: self.path.clone(),
            source,
        }
    }
}
