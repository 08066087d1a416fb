use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use directories::ProjectDirs;
use redb::{Database, ReadableTable, TableDefinition};

use crate::maintenance::quarantine_corrupt_file;
use crate::{SessionStorage, StorageError};

pub const SESSION_REDB_FILENAME: &str = "session.redb";
pub const CURRENT_SCHEMA: u32 = 1;

const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
const ITEMS: TableDefinition<&str, &str> = TableDefinition::new("items");

const META_FORMAT_KEY: &str = "format";
const META_FORMAT_VALUE: &str = "quill-session";
const META_SCHEMA_VERSION: &str = "schema_version";
const META_CREATED_AT: &str = "created_at";

const QUALIFIER: &str = "com";
const ORG: &str = "quill";
const APP: &str = "blog";

/// File-backed session storage, so route history survives a restart of a
/// native host the way `sessionStorage` survives a page reload.
#[derive(Clone)]
pub struct RedbSessionStorage {
    path: Utf8PathBuf,
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbSessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSessionStorage")
            .field("path", &self.path)
            .finish()
    }
}

impl RedbSessionStorage {
    fn is_corrupt_open_error(err: &redb::DatabaseError) -> bool {
        match err {
            redb::DatabaseError::Storage(storage) => match storage {
                redb::StorageError::Corrupted(_) => true,
                redb::StorageError::Io(ioe) => matches!(
                    ioe.kind(),
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
                ),
                _ => false,
            },
            _ => false,
        }
    }

    pub fn path_for_dir(dir: &Utf8Path) -> Utf8PathBuf {
        dir.join(SESSION_REDB_FILENAME)
    }

    /// Opens the storage under the platform cache directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let proj_dirs =
            ProjectDirs::from(QUALIFIER, ORG, APP).ok_or(StorageError::NoStorageDir)?;
        let dir = Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf())
            .map_err(|_| StorageError::NoStorageDir)?;
        Self::open(&dir)
    }

    /// Opens or creates `session.redb` in `dir`. A corrupt file is moved
    /// aside and replaced by an empty one.
    pub fn open(dir: &Utf8Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::path_for_dir(dir);

        let db = match Database::create(path.as_std_path()) {
            Ok(db) => db,
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                return Err(StorageError::Busy);
            }
            Err(e) if Self::is_corrupt_open_error(&e) => {
                quarantine_corrupt_file(&path)?;
                Database::create(path.as_std_path())?
            }
            Err(e) => return Err(e.into()),
        };

        let db = match Self::ensure_schema(&db) {
            Ok(()) => db,
            Err(StorageError::Corrupt) => {
                drop(db);
                quarantine_corrupt_file(&path)?;
                let fresh = Database::create(path.as_std_path())?;
                Self::ensure_schema(&fresh)?;
                fresh
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            path,
            db: Arc::new(db),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn ensure_schema(db: &Database) -> Result<(), StorageError> {
        let write_tx = db.begin_write()?;
        {
            let mut meta = write_tx.open_table(META)?;
            let format: Option<String> = meta.get(META_FORMAT_KEY)?.map(|g| g.value().to_string());
            if format.is_none() {
                let schema_version = CURRENT_SCHEMA.to_string();
                let created_at = Utc::now().to_rfc3339();
                meta.insert(META_FORMAT_KEY, META_FORMAT_VALUE)?;
                meta.insert(META_SCHEMA_VERSION, schema_version.as_str())?;
                meta.insert(META_CREATED_AT, created_at.as_str())?;
            } else if format.as_deref() != Some(META_FORMAT_VALUE) {
                return Err(StorageError::Corrupt);
            }
        }
        let _ = write_tx.open_table(ITEMS)?;
        write_tx.commit()?;

        let read_tx = db.begin_read()?;
        let meta = read_tx.open_table(META)?;
        let schema_version = meta
            .get(META_SCHEMA_VERSION)?
            .and_then(|g| g.value().parse::<u32>().ok())
            .unwrap_or(0);
        if schema_version == 0 {
            return Err(StorageError::Corrupt);
        }
        if schema_version > CURRENT_SCHEMA {
            return Err(StorageError::NewerSchema {
                found: schema_version,
                supported: CURRENT_SCHEMA,
            });
        }
        Ok(())
    }
}

impl SessionStorage for RedbSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_tx = self.db.begin_read()?;
        let items = read_tx.open_table(ITEMS)?;
        let value = items.get(key)?.map(|g| g.value().to_string());
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_tx = self.db.begin_write()?;
        {
            let mut items = write_tx.open_table(ITEMS)?;
            items.insert(key, value)?;
        }
        write_tx.commit()?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let write_tx = self.db.begin_write()?;
        {
            let mut items = write_tx.open_table(ITEMS)?;
            items.remove(key)?;
        }
        write_tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let write_tx = self.db.begin_write()?;
        write_tx.delete_table(ITEMS)?;
        let _ = write_tx.open_table(ITEMS)?;
        write_tx.commit()?;
        tracing::debug!("cleared session storage at {}", self.path);
        Ok(())
    }
}
