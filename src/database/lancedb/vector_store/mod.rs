
use super::{ConsistencyLevel, IndexedRecord, NewRecord, OutputField, SearchHit, VectorStore};
use crate::{RagError, Result, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase, Select},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Vector store keeping one LanceDB table per collection
pub struct LanceVectorStore {
    connection: Connection,
    path: PathBuf,
    consistency: ConsistencyLevel,
}

impl LanceVectorStore {
    /// Open the store configured in `config`
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        Self::open(
            config.vector_database_path(),
            config.store.consistency,
            Duration::from_secs(config.store.refresh_interval_secs),
        )
        .await
    }

    /// Open (or create) a store directory
    ///
    /// `refresh_interval` bounds how stale reads may be under
    /// [`ConsistencyLevel::Eventually`]; it is ignored for `Strong`.
    #[inline]
    pub async fn open(
        path: impl AsRef<Path>,
        consistency: ConsistencyLevel,
        refresh_interval: Duration,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(&path).map_err(|e| {
            RagError::Connection(format!(
                "Failed to create vector database directory {}: {}",
                path.display(),
                e
            ))
        })?;

        let uri = format!("file://{}", path.display());
        let interval = match consistency {
            ConsistencyLevel::Strong => Duration::ZERO,
            ConsistencyLevel::Eventually => refresh_interval,
        };

        let connection = lancedb::connect(&uri)
            .read_consistency_interval(interval)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to connect to LanceDB at {}: {}", uri, e)))?;

        info!(
            "Vector store opened at {} with {:?} consistency",
            path.display(),
            consistency
        );

        Ok(Self {
            connection,
            path,
            consistency,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub const fn consistency(&self) -> ConsistencyLevel {
        self.consistency
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to list tables: {}", e)))
    }

    async fn open_table(&self, name: &str) -> Result<Table> {
        if !self.table_names().await?.iter().any(|t| t == name) {
            return Err(RagError::CollectionNotFound(name.to_string()));
        }

        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table '{}': {}", name, e)))
    }

    /// Detect vector dimension from existing table schema
    async fn table_dimension(table: &Table) -> Result<usize> {
        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RagError::Database("Could not find vector column or determine dimension".to_string())
            })
    }

    /// Largest id currently stored, if any
    async fn max_id(table: &Table) -> Result<Option<i64>> {
        let mut stream = table
            .query()
            .select(Select::columns(&["id"]))
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to scan ids: {}", e)))?;

        let mut max_id = None;
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read id stream: {}", e)))?
        {
            let ids = int64_column(&batch, "id")?;
            max_id = ids.iter().flatten().chain(max_id).max();
        }

        Ok(max_id)
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
        let size = list_size(vector_dim)?;

        Ok(Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("chunk", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("page", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    size,
                ),
                false,
            ),
        ])))
    }

    /// Create a RecordBatch from indexed records
    fn create_record_batch(records: &[IndexedRecord], vector_dim: usize) -> Result<RecordBatch> {
        let schema = Self::create_schema(vector_dim)?;

        let mut flat_values = Vec::with_capacity(records.len() * vector_dim);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(
            field,
            list_size(vector_dim)?,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.id))),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.chunk.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.source.as_str()),
            )),
            Arc::new(UInt32Array::from_iter_values(records.iter().map(|r| r.page))),
            Arc::new(UInt32Array::from_iter_values(
                records.iter().map(|r| r.chunk_index),
            )),
            Arc::new(vector_array),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(
        batch: &RecordBatch,
        output_fields: &[OutputField],
    ) -> Result<Vec<SearchHit>> {
        let wants = |field: OutputField| output_fields.contains(&field);

        let ids = int64_column(batch, "id")?;
        let chunks = wants(OutputField::Chunk)
            .then(|| string_column(batch, "chunk"))
            .transpose()?;
        let sources = wants(OutputField::Source)
            .then(|| string_column(batch, "source"))
            .transpose()?;
        let pages = wants(OutputField::Page)
            .then(|| uint32_column(batch, "page"))
            .transpose()?;
        let chunk_indices = wants(OutputField::ChunkIndex)
            .then(|| uint32_column(batch, "chunk_index"))
            .transpose()?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| RagError::Database("Missing _distance column".to_string()))?;

        let hits = (0..batch.num_rows())
            .map(|row| {
                let distance = if distances.is_null(row) {
                    0.0
                } else {
                    distances.value(row)
                };

                SearchHit {
                    id: ids.value(row),
                    chunk: chunks.map(|c| c.value(row).to_string()),
                    source: sources.map(|s| s.value(row).to_string()),
                    page: pages.map(|p| p.value(row)),
                    chunk_index: chunk_indices.map(|c| c.value(row)),
                    distance,
                    score: 1.0 - distance,
                }
            })
            .collect();

        Ok(hits)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    #[inline]
    async fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        overwrite: bool,
    ) -> Result<()> {
        if dimension == 0 {
            return Err(RagError::Database(format!(
                "Collection '{}' needs a non-zero vector dimension",
                name
            )));
        }

        if self.has_collection(name).await? {
            if overwrite {
                info!("Dropping existing collection '{}'", name);
                self.drop_collection(name).await?;
            } else {
                let existing = self.dimension(name).await?;
                if existing != dimension {
                    return Err(RagError::DimensionMismatch {
                        collection: name.to_string(),
                        expected: existing,
                        actual: dimension,
                    });
                }
                debug!("Collection '{}' already exists", name);
                return Ok(());
            }
        }

        let schema = Self::create_schema(dimension)?;
        self.connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| {
                RagError::Database(format!("Failed to create collection '{}': {}", name, e))
            })?;

        info!(
            "Created collection '{}' with {} dimensions",
            name, dimension
        );
        Ok(())
    }

    #[inline]
    async fn insert(&self, name: &str, records: Vec<NewRecord>) -> Result<Vec<i64>> {
        let table = self.open_table(name).await?;

        if records.is_empty() {
            debug!("No records to insert into '{}'", name);
            return Ok(Vec::new());
        }

        let dimension = Self::table_dimension(&table).await?;
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                collection: name.to_string(),
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        let start = Instant::now();
        let first_id = Self::max_id(&table).await?.map_or(0, |id| id + 1);
        let indexed: Vec<IndexedRecord> = records
            .into_iter()
            .zip(first_id..)
            .map(|(record, id)| record.with_id(id))
            .collect();
        let ids = indexed.iter().map(|r| r.id).collect::<Vec<_>>();

        let record_batch = Self::create_record_batch(&indexed, dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| {
                RagError::Database(format!("Failed to insert into '{}': {}", name, e))
            })?;

        info!(
            "Inserted {} records into '{}' in {:.2}s",
            ids.len(),
            name,
            start.elapsed().as_secs_f64()
        );
        Ok(ids)
    }

    #[inline]
    async fn search(
        &self,
        name: &str,
        query: &[f32],
        top_k: usize,
        output_fields: &[OutputField],
    ) -> Result<Vec<SearchHit>> {
        debug!("Searching '{}' with limit: {}", name, top_k);

        let table = self.open_table(name).await?;

        let dimension = Self::table_dimension(&table).await?;
        if query.len() != dimension {
            return Err(RagError::DimensionMismatch {
                collection: name.to_string(),
                expected: dimension,
                actual: query.len(),
            });
        }

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut columns = vec!["id"];
        for field in output_fields {
            if !columns.contains(&field.column()) {
                columns.push(field.column());
            }
        }

        let mut results = table
            .vector_search(query)
            .map_err(|e| query_error(name, "Failed to create vector search", &e))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .select(Select::columns(&columns))
            .execute()
            .await
            .map_err(|e| query_error(name, "Failed to execute search", &e))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| query_error(name, "Failed to read result stream", &e))?
        {
            hits.extend(Self::parse_search_batch(&batch, output_fields)?);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);

        debug!("Parsed {} search results", hits.len());
        Ok(hits)
    }

    #[inline]
    async fn drop_collection(&self, name: &str) -> Result<()> {
        if !self.has_collection(name).await? {
            return Err(RagError::CollectionNotFound(name.to_string()));
        }

        self.connection
            .drop_table(name)
            .await
            .map_err(|e| RagError::Database(format!("Failed to drop collection '{}': {}", name, e)))?;

        info!("Dropped collection '{}'", name);
        Ok(())
    }

    #[inline]
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.table_names().await?.iter().any(|t| t == name))
    }

    #[inline]
    async fn count(&self, name: &str) -> Result<usize> {
        let table = self.open_table(name).await?;

        table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows in '{}': {}", name, e)))
    }

    #[inline]
    async fn dimension(&self, name: &str) -> Result<usize> {
        let table = self.open_table(name).await?;
        Self::table_dimension(&table).await
    }
}

fn list_size(vector_dim: usize) -> Result<i32> {
    i32::try_from(vector_dim)
        .map_err(|_| RagError::Database(format!("Vector dimension {} is too large", vector_dim)))
}

fn query_error(collection: &str, stage: &str, error: &lancedb::Error) -> RagError {
    RagError::Query {
        collection: collection.to_string(),
        message: format!("{}: {}", stage, error),
    }
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn uint32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}
