use std::marker::PhantomData;

use tracing::debug;

use crate::backend::{ContinuationToken, Entity, ScanFilter, TableBackend, MAX_BATCH_SIZE};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::record::TableRecord;

/// Typed client bound to one backend table.
///
/// `TableStore` translates records of `T` into key-addressed backend
/// operations and normalizes outcomes into [`Result`] values a caller can
/// branch on. It holds no copy of table contents; all persisted state lives
/// in the backend.
///
/// Reads (`get_all`, `scan`, `get_range`) are scoped to the partition fixed
/// at construction, or span the whole table when no scope was given. Writes
/// and point lookups address whatever partition the record or template
/// carries.
///
/// All methods take `&self`; the store holds only its immutable binding and
/// is safe to share across tasks. No coordination is added across concurrent
/// callers: two tasks inserting the same key race, and one of them gets
/// [`Error::Conflict`].
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use tablestore::{MemoryBackend, TableRecord, TableStore};
///
/// #[derive(Serialize, Deserialize)]
/// struct Event {
///     partition_key: String,
///     row_key: String,
///     message: String,
/// }
///
/// impl TableRecord for Event {
///     fn partition_key(&self) -> &str {
///         &self.partition_key
///     }
///
///     fn row_key(&self) -> &str {
///         &self.row_key
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tablestore::Result<()> {
/// let store: TableStore<Event, _> =
///     TableStore::connect(MemoryBackend::new(), "events", Some("web".to_string())).await?;
///
/// store
///     .insert(&Event {
///         partition_key: "web".to_string(),
///         row_key: "001".to_string(),
///         message: "started".to_string(),
///     })
///     .await?;
///
/// assert_eq!(store.get_all().await?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct TableStore<T, B> {
    backend: B,
    table_name: String,
    partition_scope: Option<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T, B> TableStore<T, B>
where
    T: TableRecord,
    B: TableBackend,
{
    /// Binds to `table_name` on `backend`, creating the table if it does
    /// not already exist.
    ///
    /// `partition_scope`, when given, fixes the partition that `get_all`,
    /// `scan` and `get_range` operate on.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if the table cannot be reached or provisioned.
    pub async fn connect(
        backend: B,
        table_name: impl Into<String>,
        partition_scope: Option<String>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        backend
            .create_table_if_absent(&table_name)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        debug!(table = %table_name, scope = ?partition_scope, "table binding ready");
        Ok(Self {
            backend,
            table_name,
            partition_scope,
            _record: PhantomData,
        })
    }

    /// [`connect`](Self::connect) driven by a [`StoreConfig`].
    pub async fn open(config: StoreConfig, backend: B) -> Result<Self> {
        Self::connect(backend, config.table_name, config.partition_scope).await
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] if a record with the same key pair already
    /// exists; [`Error::Backend`] on any other backend failure.
    pub async fn insert(&self, record: &T) -> Result<()> {
        let entity = self.to_entity(record)?;
        debug!(
            table = %self.table_name,
            partition_key = %entity.partition_key,
            row_key = %entity.row_key,
            "insert"
        );
        self.backend.insert(&self.table_name, entity).await
    }

    /// Inserts the record, or wholesale-replaces the stored payload if a
    /// record with the same key pair exists.
    ///
    /// Issued as the backend's native unconditional upsert: one call, no
    /// lookup-then-write window for a concurrent writer to slip into.
    pub async fn insert_or_replace(&self, record: &T) -> Result<()> {
        let entity = self.to_entity(record)?;
        debug!(
            table = %self.table_name,
            partition_key = %entity.partition_key,
            row_key = %entity.row_key,
            "upsert"
        );
        self.backend.upsert(&self.table_name, entity).await
    }

    /// Atomically inserts a batch of records sharing one partition key.
    ///
    /// The backend applies the batch all-or-nothing. Batches larger than
    /// [`MAX_BATCH_SIZE`] are rejected with [`Error::BatchSize`] before any
    /// backend call is made, so a caller can tell "never attempted" from
    /// "attempted and rejected".
    pub async fn batch_insert(&self, records: &[T]) -> Result<()> {
        if records.len() > MAX_BATCH_SIZE {
            return Err(Error::BatchSize {
                len: records.len(),
            });
        }
        let entities = records
            .iter()
            .map(|r| self.to_entity(r))
            .collect::<Result<Vec<_>>>()?;
        debug!(table = %self.table_name, count = entities.len(), "batch insert");
        self.backend.insert_batch(&self.table_name, entities).await
    }

    /// Returns every record in the store's partition scope, draining the
    /// backend's segmented scan across all continuation tokens.
    ///
    /// Re-invoking re-issues the scan. Ordering within one call is the
    /// backend's (row-key lexicographic within a partition); do not rely on
    /// it being stable across calls.
    pub async fn get_all(&self) -> Result<Vec<T>> {
        self.drain(self.scan()).await
    }

    /// Page-at-a-time cursor over the store's partition scope.
    ///
    /// Each [`Scan::next_page`] call fetches one backend segment; the
    /// continuation token lives inside the cursor and is discarded with it.
    /// [`get_all`](Self::get_all) is this cursor, drained.
    pub fn scan(&self) -> Scan<'_, T, B> {
        Scan {
            store: self,
            row_key_below: None,
            continuation: None,
            exhausted: false,
        }
    }

    /// Returns every record in the partition scope whose row key is
    /// lexicographically strictly less than `upper_row_key`.
    ///
    /// The comparison is on strings: callers wanting numeric range
    /// semantics must zero-pad their keys.
    pub async fn get_range(&self, upper_row_key: &str) -> Result<Vec<T>> {
        let scan = Scan {
            store: self,
            row_key_below: Some(upper_row_key.to_string()),
            continuation: None,
            exhausted: false,
        };
        self.drain(scan).await
    }

    /// Point lookup by the template's key pair. Payload fields of the
    /// template are ignored.
    ///
    /// A missing record is `Ok(None)`, a normal outcome rather than an
    /// error.
    pub async fn get_single(&self, template: &T) -> Result<Option<T>> {
        let found = self
            .backend
            .retrieve(
                &self.table_name,
                template.partition_key(),
                template.row_key(),
            )
            .await?;
        match found {
            Some(entity) => Ok(Some(Self::from_entity(entity)?)),
            None => Ok(None),
        }
    }

    /// Deletes the record addressed by the template's key pair.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no record exists at that key. The backend
    /// reports existence as part of the delete itself, so there is no
    /// separate lookup to race against.
    pub async fn delete(&self, template: &T) -> Result<()> {
        let removed = self
            .backend
            .delete(
                &self.table_name,
                template.partition_key(),
                template.row_key(),
            )
            .await?;
        if removed {
            Ok(())
        } else {
            Err(Error::NotFound {
                partition_key: template.partition_key().to_string(),
                row_key: template.row_key().to_string(),
            })
        }
    }

    /// Deletes the bound table if it exists. Idempotent; deleting an
    /// already-absent table succeeds.
    ///
    /// The backend may hold the name in a cooldown before it can be
    /// recreated; that policy is the backend's, not this client's.
    pub async fn delete_table(&self) -> Result<()> {
        debug!(table = %self.table_name, "delete table");
        self.backend.delete_table_if_exists(&self.table_name).await
    }

    async fn drain(&self, mut scan: Scan<'_, T, B>) -> Result<Vec<T>> {
        let mut records = Vec::new();
        while let Some(page) = scan.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }

    fn to_entity(&self, record: &T) -> Result<Entity> {
        Ok(Entity {
            partition_key: record.partition_key().to_string(),
            row_key: record.row_key().to_string(),
            payload: serde_json::to_value(record)?,
        })
    }

    fn from_entity(entity: Entity) -> Result<T> {
        Ok(serde_json::from_value(entity.payload)?)
    }
}

/// Cursor over one segmented scan.
///
/// Holds the scan's continuation token between pages; dropping the cursor
/// discards the token. Obtained from [`TableStore::scan`].
pub struct Scan<'a, T, B> {
    store: &'a TableStore<T, B>,
    row_key_below: Option<String>,
    continuation: Option<ContinuationToken>,
    exhausted: bool,
}

impl<T, B> Scan<'_, T, B>
where
    T: TableRecord,
    B: TableBackend,
{
    /// Fetches the next segment, or `None` once the backend reports the
    /// scan exhausted. A page may be shorter than the backend's segment
    /// cap; only `None` means done.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if self.exhausted {
            return Ok(None);
        }
        let filter = ScanFilter {
            partition_key: self.store.partition_scope.as_deref(),
            row_key_below: self.row_key_below.as_deref(),
        };
        let segment = self
            .store
            .backend
            .scan_segment(&self.store.table_name, filter, self.continuation.take())
            .await?;
        self.continuation = segment.continuation;
        if self.continuation.is_none() {
            self.exhausted = true;
        }
        let page = segment
            .entities
            .into_iter()
            .map(TableStore::<T, B>::from_entity)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(page))
    }
}
