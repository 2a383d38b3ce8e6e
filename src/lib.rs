//! Typed client over a partitioned tabular key-value backend.
//!
//! Records carry a two-part primary key: a partition key grouping them for
//! scoped scans and batch writes, and a row key unique within its partition.
//! [`TableStore`] binds one backend table and exposes insert, upsert, atomic
//! batch insert, point lookup, range query, scan and delete over any type
//! implementing [`TableRecord`].
//!
//! The storage itself sits behind the [`TableBackend`] trait; the crate
//! ships [`MemoryBackend`], an in-process implementation with the same
//! observable semantics (duplicate-key conflicts, all-or-nothing batches,
//! segmented scans with continuation tokens).

mod backend;
mod config;
mod error;
mod memory;
mod record;
mod store;

pub use backend::{
    ContinuationToken, Entity, ScanFilter, Segment, TableBackend, DEFAULT_PAGE_SIZE,
    MAX_BATCH_SIZE,
};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use memory::MemoryBackend;
pub use record::TableRecord;
pub use store::{Scan, TableStore};
