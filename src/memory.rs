use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{
    ContinuationToken, Entity, ScanFilter, Segment, TableBackend, DEFAULT_PAGE_SIZE,
    MAX_BATCH_SIZE,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result};

type TableData = BTreeMap<(String, String), Value>;

/// In-process [`TableBackend`] backed by ordered maps, one per table.
///
/// Mirrors the real backend's observable behavior: insert fails on duplicate
/// keys, batches are validated fully before any write lands, scans come back
/// in (partition key, row key) order in segments of at most `page_size`
/// records. Cloning shares the underlying state, so several handles can
/// observe one set of tables.
#[derive(Clone)]
pub struct MemoryBackend {
    tables: Arc<RwLock<HashMap<String, TableData>>>,
    page_size: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A backend returning scan segments of at most `page_size` records.
    /// Small page sizes make multi-segment scans observable in tests.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            page_size: page_size.max(1),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        match config.page_size {
            Some(size) => Self::with_page_size(size),
            None => Self::new(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// Tokens carry the last key of the previous segment; the scan resumes
// strictly after it. The pair is serialized as a JSON array so keys may
// contain any character.
fn encode_token(partition_key: &str, row_key: &str) -> ContinuationToken {
    ContinuationToken(
        serde_json::to_string(&(partition_key, row_key)).expect("string pair serializes"),
    )
}

fn decode_token(token: &ContinuationToken) -> Result<(String, String)> {
    serde_json::from_str(&token.0)
        .map_err(|_| Error::Backend(format!("malformed continuation token: {:?}", token.0)))
}

fn matches(filter: &ScanFilter<'_>, partition_key: &str, row_key: &str) -> bool {
    if let Some(scope) = filter.partition_key {
        if partition_key != scope {
            return false;
        }
    }
    if let Some(bound) = filter.row_key_below {
        if row_key >= bound {
            return false;
        }
    }
    true
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn create_table_if_absent(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn delete_table_if_exists(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        tables.remove(table);
        Ok(())
    }

    async fn insert(&self, table: &str, entity: Entity) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| Error::Backend(format!("no such table: {table}")))?;
        let key = (entity.partition_key.clone(), entity.row_key.clone());
        if data.contains_key(&key) {
            return Err(Error::Conflict {
                partition_key: entity.partition_key,
                row_key: entity.row_key,
            });
        }
        data.insert(key, entity.payload);
        Ok(())
    }

    async fn upsert(&self, table: &str, entity: Entity) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| Error::Backend(format!("no such table: {table}")))?;
        data.insert(
            (entity.partition_key, entity.row_key),
            entity.payload,
        );
        Ok(())
    }

    async fn insert_batch(&self, table: &str, entities: Vec<Entity>) -> Result<()> {
        if entities.len() > MAX_BATCH_SIZE {
            return Err(Error::BatchSize {
                len: entities.len(),
            });
        }

        let mut tables = self.tables.write().unwrap();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| Error::Backend(format!("no such table: {table}")))?;

        // Validate the whole batch before touching the table: either every
        // record lands or none does.
        if let Some(first) = entities.first() {
            for entity in &entities {
                if entity.partition_key != first.partition_key {
                    return Err(Error::Backend(
                        "batch spans multiple partitions".to_string(),
                    ));
                }
            }
            for entity in &entities {
                let key = (entity.partition_key.clone(), entity.row_key.clone());
                if data.contains_key(&key) {
                    return Err(Error::Conflict {
                        partition_key: entity.partition_key.clone(),
                        row_key: entity.row_key.clone(),
                    });
                }
            }
        }

        for entity in entities {
            data.insert((entity.partition_key, entity.row_key), entity.payload);
        }
        Ok(())
    }

    async fn retrieve(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Entity>> {
        let tables = self.tables.read().unwrap();
        let data = tables
            .get(table)
            .ok_or_else(|| Error::Backend(format!("no such table: {table}")))?;
        Ok(data
            .get(&(partition_key.to_string(), row_key.to_string()))
            .map(|payload| Entity {
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
                payload: payload.clone(),
            }))
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<bool> {
        let mut tables = self.tables.write().unwrap();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| Error::Backend(format!("no such table: {table}")))?;
        Ok(data
            .remove(&(partition_key.to_string(), row_key.to_string()))
            .is_some())
    }

    async fn scan_segment(
        &self,
        table: &str,
        filter: ScanFilter<'_>,
        continuation: Option<ContinuationToken>,
    ) -> Result<Segment> {
        let resume_after = match &continuation {
            Some(token) => Some(decode_token(token)?),
            None => None,
        };

        let tables = self.tables.read().unwrap();
        let data = tables
            .get(table)
            .ok_or_else(|| Error::Backend(format!("no such table: {table}")))?;

        let mut entities: Vec<Entity> = Vec::new();
        let mut next = None;
        for ((partition_key, row_key), payload) in data.iter() {
            if let Some(last) = &resume_after {
                if (partition_key.as_str(), row_key.as_str()) <= (last.0.as_str(), last.1.as_str())
                {
                    continue;
                }
            }
            if !matches(&filter, partition_key, row_key) {
                continue;
            }
            if entities.len() == self.page_size {
                next = Some(encode_token(
                    &entities[self.page_size - 1].partition_key,
                    &entities[self.page_size - 1].row_key,
                ));
                break;
            }
            entities.push(Entity {
                partition_key: partition_key.clone(),
                row_key: row_key.clone(),
                payload: payload.clone(),
            });
        }

        Ok(Segment {
            entities,
            continuation: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entity(partition_key: &str, row_key: &str) -> Entity {
        Entity {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            payload: json!({ "pk": partition_key, "rk": row_key }),
        }
    }

    #[tokio::test]
    async fn insert_then_retrieve_round_trips() {
        let backend = MemoryBackend::new();
        backend.create_table_if_absent("t").await.unwrap();

        backend.insert("t", entity("p", "r")).await.unwrap();
        let found = backend.retrieve("t", "p", "r").await.unwrap();

        assert_eq!(found, Some(entity("p", "r")));
    }

    #[tokio::test]
    async fn oversized_batch_writes_nothing() {
        let backend = MemoryBackend::new();
        backend.create_table_if_absent("t").await.unwrap();

        let batch: Vec<_> = (0..MAX_BATCH_SIZE + 1)
            .map(|i| entity("p", &format!("r{i:03}")))
            .collect();
        let err = backend.insert_batch("t", batch).await.unwrap_err();

        assert!(matches!(err, Error::BatchSize { len } if len == MAX_BATCH_SIZE + 1));
        let segment = backend
            .scan_segment("t", ScanFilter::default(), None)
            .await
            .unwrap();
        assert!(segment.entities.is_empty());
    }

    #[tokio::test]
    async fn batch_with_duplicate_key_writes_nothing() {
        let backend = MemoryBackend::new();
        backend.create_table_if_absent("t").await.unwrap();
        backend.insert("t", entity("p", "r1")).await.unwrap();

        let err = backend
            .insert_batch("t", vec![entity("p", "r0"), entity("p", "r1")])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict { .. }));
        let segment = backend
            .scan_segment("t", ScanFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(segment.entities.len(), 1);
    }

    #[tokio::test]
    async fn scan_pages_resume_where_the_token_points() {
        let backend = MemoryBackend::with_page_size(2);
        backend.create_table_if_absent("t").await.unwrap();
        for i in 0..5 {
            backend
                .insert("t", entity("p", &format!("r{i}")))
                .await
                .unwrap();
        }

        let filter = ScanFilter {
            partition_key: Some("p"),
            row_key_below: None,
        };
        let first = backend
            .scan_segment("t", filter.clone(), None)
            .await
            .unwrap();
        assert_eq!(first.entities.len(), 2);
        assert!(first.continuation.is_some());

        let second = backend
            .scan_segment("t", filter.clone(), first.continuation)
            .await
            .unwrap();
        assert_eq!(second.entities[0].row_key, "r2");

        let third = backend
            .scan_segment("t", filter, second.continuation)
            .await
            .unwrap();
        assert_eq!(third.entities.len(), 1);
        assert!(third.continuation.is_none());
    }

    #[tokio::test]
    async fn scan_resumes_correctly_when_keys_contain_control_characters() {
        let backend = MemoryBackend::with_page_size(1);
        backend.create_table_if_absent("t").await.unwrap();
        let partition = "p\u{1f}left";
        for i in 0..3 {
            backend
                .insert("t", entity(partition, &format!("r{i}\u{1f}x")))
                .await
                .unwrap();
        }

        let filter = ScanFilter {
            partition_key: Some(partition),
            row_key_below: None,
        };
        let mut seen = Vec::new();
        let mut continuation = None;
        loop {
            let segment = backend
                .scan_segment("t", filter.clone(), continuation)
                .await
                .unwrap();
            seen.extend(segment.entities.into_iter().map(|e| e.row_key));
            continuation = segment.continuation;
            if continuation.is_none() {
                break;
            }
        }

        assert_eq!(seen, vec!["r0\u{1f}x", "r1\u{1f}x", "r2\u{1f}x"]);
    }

    #[tokio::test]
    async fn scan_against_missing_table_is_a_backend_error() {
        let backend = MemoryBackend::new();

        let err = backend
            .scan_segment("missing", ScanFilter::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Backend(_)));
    }
}
