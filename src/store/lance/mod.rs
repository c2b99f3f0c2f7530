
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::index::Index;
use lancedb::index::vector::IvfPqIndexBuilder;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    DistanceMetric, NewRecord, RecordSummary, ScoredChunk, VectorStore, format_vector_preview,
};
use crate::{RagError, Result};

const TABLE_NAME: &str = "documents";
/// Below this row count an ANN index cannot be trained; searches stay on the
/// exact flat scan, which is still correct
const MIN_INDEX_ROWS: u64 = 256;

/// Persisted vector store backed by LanceDB
pub struct LanceStore {
    connection: Connection,
    dimension: usize,
    /// Monotonic insertion sequence, the tie-breaker for equal distances
    next_seq: AtomicU64,
    /// Index builds for the same table must not run concurrently
    index_lock: Mutex<()>,
}

impl LanceStore {
    /// Open (or create) the store at `db_path` for `dimension`-sized vectors
    #[inline]
    pub async fn new(db_path: &Path, dimension: usize) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Store(format!("Failed to create vector store directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            dimension,
            next_seq: AtomicU64::new(0),
            index_lock: Mutex::new(()),
        };

        store.initialize_table().await?;
        let existing = store.count().await?;
        store.next_seq.store(existing, Ordering::SeqCst);

        info!("Vector store ready with {} records", existing);
        Ok(store)
    }

    async fn initialize_table(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            debug!("Documents table already exists");
            return Ok(());
        }

        self.connection
            .create_empty_table(TABLE_NAME, self.schema())
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create documents table: {}", e)))?;

        info!(
            "Documents table created with {}-dimensional vectors",
            self.dimension
        );
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("seq", DataType::UInt64, false),
            Field::new("contents", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
        ]))
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open documents table: {}", e)))
    }

    fn create_record_batch(&self, records: &[NewRecord], first_seq: u64) -> Result<RecordBatch> {
        let len = records.len();

        for record in records {
            if record.embedding.len() != self.dimension {
                return Err(RagError::Store(format!(
                    "Record vector has {} dimensions, table expects {}",
                    record.embedding.len(),
                    self.dimension
                )));
            }
        }

        let ids: Vec<String> = (0..len).map(|_| Uuid::new_v4().to_string()).collect();
        let seqs: Vec<u64> = (0..len as u64).map(|i| first_seq + i).collect();
        let contents: Vec<&str> = records.iter().map(|r| r.contents.as_str()).collect();

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for record in records {
            flat_values.extend_from_slice(&record.embedding);
        }
        let values_array = Float32Array::from(flat_values);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let embedding_array = FixedSizeListArray::try_new(
            item_field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| RagError::Store(format!("Failed to build embedding array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(
                ids.iter().map(String::as_str).collect::<Vec<_>>(),
            )),
            Arc::new(UInt64Array::from(seqs)),
            Arc::new(StringArray::from(contents)),
            Arc::new(embedding_array),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| RagError::Store(format!("Failed to build record batch: {}", e)))
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<(ScoredChunk, u64)>> {
        let contents = batch
            .column_by_name("contents")
            .ok_or_else(|| RagError::Store("Missing contents column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RagError::Store("Invalid contents column type".to_string()))?;

        let seqs = batch
            .column_by_name("seq")
            .ok_or_else(|| RagError::Store("Missing seq column".to_string()))?
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| RagError::Store("Invalid seq column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .ok_or_else(|| RagError::Store("Missing _distance column".to_string()))?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| RagError::Store("Invalid _distance column type".to_string()))?;

        let mut results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            results.push((
                ScoredChunk {
                    contents: contents.value(row).to_string(),
                    distance: if distances.is_null(row) {
                        0.0
                    } else {
                        distances.value(row)
                    },
                },
                seqs.value(row),
            ));
        }
        Ok(results)
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    #[inline]
    async fn insert(&self, records: Vec<NewRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No records to insert");
            return Ok(());
        }

        let first_seq = self
            .next_seq
            .fetch_add(records.len() as u64, Ordering::SeqCst);
        let batch = self.create_record_batch(&records, first_seq)?;
        let schema = batch.schema();

        let table = self.open_table().await?;
        // One batch per call keeps the insert all-or-nothing
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to insert records: {}", e)))?;

        info!("Inserted {} records", records.len());
        Ok(())
    }

    #[inline]
    async fn ensure_index(&self, metric: DistanceMetric) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let table = self.open_table().await?;

        let existing = table
            .list_indices()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list indexes: {}", e)))?;
        if existing
            .iter()
            .any(|idx| idx.columns == vec!["embedding".to_string()])
        {
            debug!("Similarity index already exists");
            return Ok(());
        }

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))?;
        if (rows as u64) < MIN_INDEX_ROWS {
            debug!(
                "Only {} rows stored; deferring index build, search stays exact",
                rows
            );
            return Ok(());
        }

        let distance_type = match metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
        };
        table
            .create_index(
                &["embedding"],
                Index::IvfPq(IvfPqIndexBuilder::default().distance_type(distance_type)),
            )
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create similarity index: {}", e)))?;

        info!("Created {} similarity index on embedding column", metric);
        Ok(())
    }

    #[inline]
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        debug!("Searching for {} nearest records", k);

        if query_vector.len() != self.dimension {
            return Err(RagError::Store(format!(
                "Query vector has {} dimensions, table expects {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let table = self.open_table().await?;
        let mut stream = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Store(format!("Failed to build vector search: {}", e)))?
            .column("embedding")
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute search: {}", e)))?;

        let mut scored: Vec<(ScoredChunk, u64)> = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read search results: {}", e)))?
        {
            scored.extend(Self::parse_search_batch(&batch)?);
        }

        // The engine orders by distance; re-sort with the insertion sequence
        // as tie-breaker so repeated searches are byte-stable
        scored.sort_by(|(a, sa), (b, sb)| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| sa.cmp(sb))
        });
        scored.truncate(k);

        debug!("Search returned {} records", scored.len());
        Ok(scored.into_iter().map(|(chunk, _)| chunk).collect())
    }

    #[inline]
    async fn list_summary(&self, limit: usize) -> Result<Vec<RecordSummary>> {
        let table = self.open_table().await?;
        let mut stream = table
            .query()
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to scan documents: {}", e)))?;

        let mut summaries: Vec<(u64, RecordSummary)> = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read scan results: {}", e)))?
        {
            let ids = batch
                .column_by_name("id")
                .ok_or_else(|| RagError::Store("Missing id column".to_string()))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| RagError::Store("Invalid id column type".to_string()))?;
            let seqs = batch
                .column_by_name("seq")
                .ok_or_else(|| RagError::Store("Missing seq column".to_string()))?
                .as_any()
                .downcast_ref::<UInt64Array>()
                .ok_or_else(|| RagError::Store("Invalid seq column type".to_string()))?;
            let contents = batch
                .column_by_name("contents")
                .ok_or_else(|| RagError::Store("Missing contents column".to_string()))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| RagError::Store("Invalid contents column type".to_string()))?;
            let embeddings = batch
                .column_by_name("embedding")
                .ok_or_else(|| RagError::Store("Missing embedding column".to_string()))?
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| RagError::Store("Invalid embedding column type".to_string()))?;

            for row in 0..batch.num_rows() {
                let vector = embeddings
                    .value(row)
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .map(|values| values.values().to_vec())
                    .unwrap_or_default();

                summaries.push((
                    seqs.value(row),
                    RecordSummary {
                        id: ids.value(row).to_string(),
                        contents: contents.value(row).to_string(),
                        embedding_preview: format_vector_preview(&vector),
                    },
                ));
            }
        }

        summaries.sort_by_key(|(seq, _)| *seq);
        Ok(summaries.into_iter().map(|(_, s)| s).collect())
    }

    #[inline]
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let table = self.open_table().await?;
        let indexes = table
            .list_indices()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list indexes: {}", e)))?;
        Ok(indexes.into_iter().map(|idx| idx.name).collect())
    }

    #[inline]
    async fn delete_index(&self, name: &str) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let table = self.open_table().await?;
        table
            .drop_index(name)
            .await
            .map_err(|e| RagError::Store(format!("Failed to drop index {}: {}", name, e)))?;
        info!("Dropped index {}", name);
        Ok(())
    }

    #[inline]
    async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count records: {}", e)))?;
        Ok(count as u64)
    }
}
