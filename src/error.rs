use crate::backend::MAX_BATCH_SIZE;

/// Error type for table store operations.
///
/// Every variant a caller can branch on programmatically; backend messages
/// are carried verbatim rather than interpreted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend could not be reached or the table could not be
    /// provisioned at construction time.
    #[error("connection failed: {0}")]
    Connection(String),

    /// An insert targeted a (partition key, row key) pair that already
    /// exists.
    #[error("record already exists at ({partition_key}, {row_key})")]
    Conflict {
        partition_key: String,
        row_key: String,
    },

    /// A batch exceeded the backend's maximum batch size. Raised before any
    /// backend call is attempted, so no partial write can have occurred.
    #[error("batch of {len} records exceeds the limit of {MAX_BATCH_SIZE}")]
    BatchSize { len: usize },

    /// The operation required an existing record and none was found.
    #[error("no record at ({partition_key}, {row_key})")]
    NotFound {
        partition_key: String,
        row_key: String,
    },

    /// Any other backend-reported failure, message carried as-is.
    #[error("backend error: {0}")]
    Backend(String),

    /// A record could not be serialized to or deserialized from its stored
    /// form.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
