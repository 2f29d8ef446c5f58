//! redb-backed digest storage.
//!
//! One table of `&str -> &[u8]`. Every write is its own transaction and is
//! durable once `commit` returns.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::backend::StoreBackend;
use crate::error::StoreError;

const DIGESTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vdigest_digests");

pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Opens the database at `path`, creating the file and table if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;

        let write_txn = db.begin_write().map_err(StoreError::backend)?;
        {
            let _table = write_txn
                .open_table(DIGESTS_TABLE)
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreBackend for RedbBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(DIGESTS_TABLE)
            .map_err(StoreError::backend)?;
        let value = table.get(key).map_err(StoreError::backend)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(DIGESTS_TABLE)
                .map_err(StoreError::backend)?;
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(StoreError::backend)?;
            }
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(DIGESTS_TABLE)
            .map_err(StoreError::backend)?;

        for item in table.range(prefix..).map_err(StoreError::backend)? {
            let (key, value) = item.map_err(StoreError::backend)?;
            if !key.value().starts_with(prefix) {
                break;
            }
            visitor(value.value())?;
        }
        Ok(())
    }
}
