//! Resolves a [`DataSource`] into a live database handle, memoised per
//! configuration with a time-based expiry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use config::DataSource;
use tracing::{debug, info};

use crate::mysql::MySqlDatabase;
use crate::sqlite::SqliteDatabase;
use crate::{Database, DbError};

/// Handles are dropped and rebuilt after this long even if nothing changed.
pub const DEFAULT_HANDLE_TTL: Duration = Duration::from_secs(7200);

pub type DatabaseHandle = Arc<dyn Database>;

/// The full configuration tuple a handle was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(DataSource);

impl From<&DataSource> for SessionKey {
    fn from(source: &DataSource) -> Self {
        Self(source.clone())
    }
}

/// Builds a handle for `source` without any caching.
///
/// Networked sources are validated before anything is constructed and never
/// connect here; the embedded file is opened read-only right away.
pub async fn configure(source: &DataSource, embedded_path: &Path) -> Result<DatabaseHandle, DbError> {
    match source {
        DataSource::Embedded => {
            let db = SqliteDatabase::open_read_only(embedded_path).await?;
            info!(path = %embedded_path.display(), "opened embedded database");
            Ok(Arc::new(db))
        }
        DataSource::Networked(params) => {
            params.validate()?;
            info!(host = %params.host, database = %params.database, "configured mysql database");
            Ok(Arc::new(MySqlDatabase::connect_lazy(params)))
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    handle: DatabaseHandle,
    created: Instant,
}

/// Memoises [`configure`] by [`SessionKey`].
///
/// Construction runs without holding the lock, so two callers racing on the
/// same key may both build a handle; the last one stored wins.
#[derive(Debug)]
pub struct HandleCache {
    embedded_path: PathBuf,
    ttl: Duration,
    entries: Mutex<HashMap<SessionKey, CacheEntry>>,
}

impl HandleCache {
    pub fn new(embedded_path: impl Into<PathBuf>) -> Self {
        Self::with_ttl(embedded_path, DEFAULT_HANDLE_TTL)
    }

    pub fn with_ttl(embedded_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            embedded_path: embedded_path.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_configure(&self, source: &DataSource) -> Result<DatabaseHandle, DbError> {
        let key = SessionKey::from(source);

        if let Some(handle) = self.lookup(&key) {
            debug!("reusing cached database handle");
            return Ok(handle);
        }

        let handle = configure(source, &self.embedded_path).await?;
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.created.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                handle: Arc::clone(&handle),
                created: Instant::now(),
            },
        );
        Ok(handle)
    }

    fn lookup(&self, key: &SessionKey) -> Option<DatabaseHandle> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.created.elapsed() < self.ttl => Some(Arc::clone(&entry.handle)),
            Some(_) => {
                debug!("database handle expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn invalidate(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SessionKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
