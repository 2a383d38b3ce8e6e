use serde::Deserialize;

/// Describes one table binding: which table to attach to, an optional
/// partition scope for reads, and an optional scan page size override.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Name of the backend table. Created on connect if absent.
    pub table_name: String,

    /// Partition scope applied to `get_all`, `scan` and `get_range`.
    /// When unset, scans cover every partition in the table.
    #[serde(default)]
    pub partition_scope: Option<String>,

    /// Scan segment size cap. Backends fall back to their own default
    /// when unset.
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl StoreConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            partition_scope: None,
            page_size: None,
        }
    }

    pub fn with_partition_scope(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_scope = Some(partition_key.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}
