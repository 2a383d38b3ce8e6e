use serde::de::DeserializeOwned;
use serde::Serialize;

/// Capability trait for records addressable by the backend's two-part key.
///
/// The `(partition_key, row_key)` pair uniquely identifies a record within a
/// table: the partition key groups records for scoped scans and batch
/// operations, the row key is unique within its partition. Key fields are
/// fixed for the life of a record; payload fields may change between writes.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use tablestore::TableRecord;
///
/// #[derive(Serialize, Deserialize)]
/// struct Measurement {
///     partition_key: String,
///     row_key: String,
///     value: f64,
/// }
///
/// impl TableRecord for Measurement {
///     fn partition_key(&self) -> &str {
///         &self.partition_key
///     }
///
///     fn row_key(&self) -> &str {
///         &self.row_key
///     }
/// }
/// ```
pub trait TableRecord: Serialize + DeserializeOwned + Send + Sync {
    /// The key grouping this record with others for scoped operations.
    fn partition_key(&self) -> &str;

    /// The key identifying this record within its partition.
    fn row_key(&self) -> &str;
}
