use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Largest number of records the backend accepts in one batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Largest number of records the backend returns in one scan segment.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A record in backend wire form: its two-part key plus the serialized
/// payload. The payload holds the full record, keys included.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub partition_key: String,
    pub row_key: String,
    pub payload: Value,
}

/// Opaque cursor a segmented scan hands back to say where to resume.
/// Round-tripped to the backend untouched, never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(pub String);

/// One page of a segmented scan. `continuation` is `None` once the scan is
/// exhausted.
#[derive(Debug, Clone)]
pub struct Segment {
    pub entities: Vec<Entity>,
    pub continuation: Option<ContinuationToken>,
}

/// Filter for a segmented scan: an optional partition scope and an optional
/// exclusive lexicographic upper bound on the row key.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter<'a> {
    pub partition_key: Option<&'a str>,
    pub row_key_below: Option<&'a str>,
}

/// Contract this crate requires from the storage backend.
///
/// The backend owns all persisted state, addressing records by
/// (partition key, row key). Implementations must provide:
///
/// - table create-if-absent and delete-if-exists,
/// - single insert that fails on a duplicate key,
/// - unconditional upsert,
/// - atomic single-partition batch insert bounded by [`MAX_BATCH_SIZE`]
///   (either every record in the batch is written or none is),
/// - point retrieve by full key,
/// - single delete reporting whether a record was removed,
/// - segmented scan returning at most a page per call with a continuation
///   token for the remainder.
///
/// Retry, throttling, auth and consistency are the backend's concern;
/// callers see failures only as [`Error`](crate::Error) values.
#[async_trait]
pub trait TableBackend: Send + Sync + 'static {
    /// Create the table if it does not already exist. Succeeds if it does.
    async fn create_table_if_absent(&self, table: &str) -> Result<()>;

    /// Delete the table if it exists. Succeeds if it does not.
    async fn delete_table_if_exists(&self, table: &str) -> Result<()>;

    /// Insert a single entity. Fails with a conflict if the key pair is
    /// already present.
    async fn insert(&self, table: &str, entity: Entity) -> Result<()>;

    /// Insert or wholesale-replace a single entity, unconditionally.
    async fn upsert(&self, table: &str, entity: Entity) -> Result<()>;

    /// Atomically insert a batch of entities sharing one partition key.
    /// Rejects oversized or mixed-partition batches without writing
    /// anything.
    async fn insert_batch(&self, table: &str, entities: Vec<Entity>) -> Result<()>;

    /// Point lookup by full key. `None` when no such record exists.
    async fn retrieve(&self, table: &str, partition_key: &str, row_key: &str)
        -> Result<Option<Entity>>;

    /// Delete by full key. Returns whether a record was actually removed.
    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<bool>;

    /// Fetch one segment of a scan matching `filter`, resuming after
    /// `continuation` when given.
    async fn scan_segment(
        &self,
        table: &str,
        filter: ScanFilter<'_>,
        continuation: Option<ContinuationToken>,
    ) -> Result<Segment>;
}
