//! The RAG table manager.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use rag_core::{
    Column, RagConfig, RagError, Record, Result, Statement, StoreClient, TableDef, Value,
    Vectorizer,
};
use rag_query::rank_by_similarity;

use crate::backup::{self, BackupFormat};
use crate::registry::VectorizerRegistry;

/// Default number of records per insert statement during restore.
const DEFAULT_BATCH_SIZE: usize = 1000;

/// A similarity search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityHit {
    /// Cosine similarity to the query vector.
    pub score: f32,

    /// The row, projected to the requested columns.
    pub record: Record,
}

/// Outcome of a similarity search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimilarityResults {
    /// Best rows, highest score first.
    pub hits: Vec<SimilarityHit>,

    /// Rows scored against the query.
    pub scanned: usize,

    /// Rows skipped because their vector length differs from the query.
    pub skipped: usize,

    /// Rows with no vector.
    pub unvectorized: usize,
}

/// Manages one table in a store: lifecycle, CRUD, vectorization, similarity
/// search and backup/restore.
///
/// Every operation performs its store round trips in sequence and returns
/// only once they have completed.
pub struct RagTableManager {
    store: Arc<dyn StoreClient>,
    table: TableDef,
    vectorizers: VectorizerRegistry,
    batch_size: usize,
}

impl RagTableManager {
    /// Bind `table` to `store`, creating the table if the store lacks it.
    pub async fn new(store: Arc<dyn StoreClient>, table: TableDef) -> Result<Self> {
        table.validate()?;
        store.connect().await?;

        let manager = Self {
            store,
            table,
            vectorizers: VectorizerRegistry::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        };

        if manager.table_exists().await? {
            info!("Using existing table {}", manager.table.name);
        } else {
            manager.create(&manager.table).await?;
        }

        Ok(manager)
    }

    /// Bind the table described by `config`.
    pub async fn from_config(store: Arc<dyn StoreClient>, config: &RagConfig) -> Result<Self> {
        let table = config.table.to_table_def()?;
        Ok(Self::new(store, table)
            .await?
            .with_batch_size(config.backup.batch_size))
    }

    /// Records per insert statement during restore.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The bound table definition.
    pub fn table(&self) -> &TableDef {
        &self.table
    }

    /// Release the store connection.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }

    // Table lifecycle

    /// Create a table and bind the manager to it.
    ///
    /// Fails with a store error if the table already exists.
    pub async fn create_table(&mut self, table: TableDef) -> Result<()> {
        table.validate()?;
        self.create(&table).await?;
        self.table = table;
        Ok(())
    }

    /// Whether the bound table exists in the store.
    pub async fn table_exists(&self) -> Result<bool> {
        self.exists(&self.table.name).await
    }

    /// Drop and recreate the bound table, discarding every row.
    pub async fn reset_database(&self) -> Result<()> {
        self.store
            .execute(&Statement::DropTable {
                table: self.table.name.clone(),
            })
            .await?;
        self.create(&self.table).await?;

        info!("Reset table {}", self.table.name);
        Ok(())
    }

    async fn create(&self, table: &TableDef) -> Result<()> {
        self.store
            .execute(&Statement::CreateTable {
                table: table.clone(),
            })
            .await?;

        info!(
            "Created table {} (engine {}, order by {})",
            table.name, table.engine, table.order_by
        );
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let result = self
            .store
            .execute(&Statement::TableExists {
                table: name.to_string(),
            })
            .await?;

        match result.scalar() {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Integer(i)) => Ok(*i != 0),
            other => Err(RagError::store(format!(
                "unexpected table existence result: {:?}",
                other
            ))),
        }
    }

    // Vectorizers

    /// Register a vectorizer under `name`, replacing any previous one.
    pub fn add_vectorizer(
        &mut self,
        name: impl Into<String>,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> Option<Arc<dyn Vectorizer>> {
        self.vectorizers.register(name, vectorizer)
    }

    /// Look up a registered vectorizer.
    pub fn get_vectorizer(&self, name: &str) -> Result<Arc<dyn Vectorizer>> {
        self.vectorizers.get(name)
    }

    /// Unregister a vectorizer, returning it if it was registered.
    pub fn remove_vectorizer(&mut self, name: &str) -> Option<Arc<dyn Vectorizer>> {
        self.vectorizers.remove(name)
    }

    /// Registered vectorizer names, sorted.
    pub fn vectorizer_names(&self) -> Vec<String> {
        self.vectorizers.names()
    }

    /// Column the vectorizer output is written to.
    fn vector_column(&self) -> Result<&Column> {
        self.table.schema.vector_column()?.ok_or_else(|| {
            RagError::schema(format!("table {} has no vector column", self.table.name))
        })
    }

    /// Value handed to the vectorizer for `record`.
    fn vectorizer_input<'a>(&self, record: &'a Record) -> Result<&'a Value> {
        let source = self.table.schema.vectorize_from().ok_or_else(|| {
            RagError::schema(format!(
                "table {} has no vectorize-from column",
                self.table.name
            ))
        })?;

        record.get(&source.name).ok_or_else(|| {
            RagError::schema_mismatch(format!(
                "record has no value for vectorize-from column '{}'",
                source.name
            ))
        })
    }

    fn check_vector(
        &self,
        column: &Column,
        vectorizer: &dyn Vectorizer,
        vector: &[f32],
    ) -> Result<()> {
        let expected = column
            .column_type
            .dimension()
            .or_else(|| vectorizer.dimension());

        match expected {
            Some(expected) if vector.len() != expected => Err(RagError::vectorization(format!(
                "vectorizer produced {} components for column '{}', expected {}",
                vector.len(),
                column.name,
                expected
            ))),
            _ => Ok(()),
        }
    }

    async fn vectorize_record(&self, record: &mut Record, name: &str) -> Result<()> {
        let vectorizer = self.vectorizers.get(name)?;
        let column = self.vector_column()?;

        let vector = vectorizer.vectorize(self.vectorizer_input(record)?).await?;
        self.check_vector(column, vectorizer.as_ref(), &vector)?;

        record.insert(column.name.clone(), vector);
        Ok(())
    }

    async fn vectorize_records(&self, records: &mut [Record], name: &str) -> Result<()> {
        let vectorizer = self.vectorizers.get(name)?;
        let column = self.vector_column()?;

        let vectors = {
            let inputs = records
                .iter()
                .map(|record| self.vectorizer_input(record))
                .collect::<Result<Vec<_>>>()?;
            vectorizer.bulk_vectorize(&inputs).await?
        };

        if vectors.len() != records.len() {
            return Err(RagError::vectorization(format!(
                "vectorizer '{}' returned {} vectors for {} records",
                name,
                vectors.len(),
                records.len()
            )));
        }

        for vector in &vectors {
            self.check_vector(column, vectorizer.as_ref(), vector)?;
        }
        for (record, vector) in records.iter_mut().zip(vectors) {
            record.insert(column.name.clone(), vector);
        }
        Ok(())
    }

    // Writes

    /// Validate a record for insertion into `table`.
    fn validate_new(table: &TableDef, record: Record) -> Result<Record> {
        let record = table.schema.validate_record(record)?;
        let identifier = table.identifier()?;
        match record.get(&identifier.name) {
            Some(value) if !value.is_null() => Ok(record),
            _ => Err(RagError::schema_mismatch(format!(
                "record is missing identifier column '{}'",
                identifier.name
            ))),
        }
    }

    /// Coerce a caller-supplied identifier to the identifier column type.
    fn key(&self, id: Value) -> Result<(String, Value)> {
        let identifier = self.table.identifier()?;
        if id.is_null() {
            return Err(RagError::invalid_argument("identifier must not be null"));
        }
        let key = identifier.column_type.coerce(&identifier.name, id)?;
        Ok((identifier.name.clone(), key))
    }

    /// Like [`Self::key`], but an identifier of the wrong type matches no row.
    fn lookup_key(&self, id: Value) -> Result<Option<(String, Value)>> {
        match self.key(id) {
            Ok(key) => Ok(Some(key)),
            Err(RagError::SchemaMismatch { message }) => {
                debug!("Identifier matches no row in {}: {}", self.table.name, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Insert one record, vectorizing it first when `vectorizer` is named.
    pub async fn add_data(&self, mut record: Record, vectorizer: Option<&str>) -> Result<()> {
        if let Some(name) = vectorizer {
            self.vectorize_record(&mut record, name).await?;
        }
        let record = Self::validate_new(&self.table, record)?;

        self.store
            .execute(&Statement::Insert {
                table: self.table.name.clone(),
                records: vec![record],
            })
            .await?;

        debug!("Added record to {}", self.table.name);
        Ok(())
    }

    /// Insert many records in one statement.
    ///
    /// Vectorization and validation cover the whole batch before anything is
    /// sent to the store. Returns the number of records inserted.
    pub async fn add_bulk_data(
        &self,
        mut records: Vec<Record>,
        vectorizer: Option<&str>,
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(name) = vectorizer {
            self.vectorize_records(&mut records, name).await?;
        }
        let records = records
            .into_iter()
            .map(|record| Self::validate_new(&self.table, record))
            .collect::<Result<Vec<_>>>()?;
        let count = records.len();

        self.store
            .execute(&Statement::Insert {
                table: self.table.name.clone(),
                records,
            })
            .await?;

        info!("Added {} records to {}", count, self.table.name);
        Ok(count)
    }

    /// Assign the record's columns on the row with identifier `id`.
    ///
    /// The identifier itself is never reassigned; if the record carries it,
    /// it must equal `id`. Updating an absent row changes nothing.
    pub async fn update_data(
        &self,
        id: impl Into<Value>,
        mut record: Record,
        vectorizer: Option<&str>,
    ) -> Result<()> {
        let (key_column, key) = self.key(id.into())?;

        if let Some(name) = vectorizer {
            self.vectorize_record(&mut record, name).await?;
        }
        let mut record = self.table.schema.validate_record(record)?;

        if let Some(carried) = record.remove(&key_column) {
            if carried != key {
                return Err(RagError::schema_mismatch(format!(
                    "record identifier {} does not match {}",
                    carried, key
                )));
            }
        }

        let assignments: Vec<(String, Value)> = record.into_iter().collect();
        if assignments.is_empty() {
            debug!("Nothing to update for {}", key);
            return Ok(());
        }

        let result = self
            .store
            .execute(&Statement::Update {
                table: self.table.name.clone(),
                assignments,
                key_column,
                key: key.clone(),
            })
            .await?;

        if result.affected == 0 {
            warn!("Update of {} in {} matched no rows", key, self.table.name);
        } else {
            debug!("Updated {} in {}", key, self.table.name);
        }
        Ok(())
    }

    /// Update the row if its identifier exists, else insert it.
    pub async fn set_data(&self, record: Record, vectorizer: Option<&str>) -> Result<()> {
        let identifier = self.table.identifier()?;
        let id = record
            .get(&identifier.name)
            .cloned()
            .ok_or_else(|| {
                RagError::schema_mismatch(format!(
                    "record is missing identifier column '{}'",
                    identifier.name
                ))
            })?;

        if self.get_data(id.clone()).await?.is_some() {
            self.update_data(id, record, vectorizer).await
        } else {
            self.add_data(record, vectorizer).await
        }
    }

    /// Delete the row with identifier `id`. Deleting an absent row, or an
    /// identifier that cannot have the identifier column's type, is a no-op.
    pub async fn delete_data(&self, id: impl Into<Value>) -> Result<()> {
        let Some((key_column, key)) = self.lookup_key(id.into())? else {
            return Ok(());
        };

        let result = self
            .store
            .execute(&Statement::Delete {
                table: self.table.name.clone(),
                key_column,
                key: key.clone(),
            })
            .await?;

        debug!(
            "Deleted {} from {} ({} rows)",
            key, self.table.name, result.affected
        );
        Ok(())
    }

    // Reads

    /// Fetch the row with identifier `id`.
    ///
    /// Returns `None` when no row matches, including when `id` cannot be
    /// coerced to the identifier column's type. A null `id` is an error.
    pub async fn get_data(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        let Some((key_column, key)) = self.lookup_key(id.into())? else {
            return Ok(None);
        };

        let result = self
            .store
            .execute(&Statement::Select {
                table: self.table.name.clone(),
                columns: None,
                filter: Some((key_column, key)),
                order_by: None,
                limit: Some(1),
            })
            .await?;

        Ok(result
            .into_records()
            .into_iter()
            .next()
            .map(|record| self.table.schema.normalize_record(record)))
    }

    /// Run query text against the store verbatim.
    ///
    /// The text is neither validated nor escaped; callers must not pass
    /// untrusted input.
    pub async fn search(&self, query: &str) -> Result<Vec<Record>> {
        let result = self
            .store
            .execute(&Statement::Raw {
                sql: query.to_string(),
                params: Vec::new(),
            })
            .await?;

        Ok(result
            .into_records()
            .into_iter()
            .map(|record| self.table.schema.normalize_record(record))
            .collect())
    }

    /// Rank every row by cosine similarity of its vector to `query`.
    ///
    /// Returns at most `top_k` rows projected to `columns` (all columns when
    /// empty), highest score first, ties ordered by identifier. Rows whose
    /// vector length differs from the query are skipped and counted.
    pub async fn similarity_search(
        &self,
        query: &[f32],
        top_k: usize,
        columns: &[&str],
    ) -> Result<SimilarityResults> {
        if query.is_empty() {
            return Err(RagError::invalid_argument("query vector must not be empty"));
        }
        if let Some(unknown) = columns.iter().find(|c| !self.table.schema.contains(c)) {
            return Err(RagError::invalid_argument(format!("unknown column '{}'", unknown)));
        }

        let identifier = self.table.identifier()?.name.clone();
        let vector_column = self.vector_column()?.name.clone();

        let projection = if columns.is_empty() {
            None
        } else {
            let mut selected = vec![identifier.clone(), vector_column.clone()];
            for column in columns {
                if !selected.iter().any(|s| s == column) {
                    selected.push(column.to_string());
                }
            }
            Some(selected)
        };

        let rows = self
            .store
            .execute(&Statement::Select {
                table: self.table.name.clone(),
                columns: projection,
                filter: None,
                order_by: None,
                limit: None,
            })
            .await?
            .into_records();

        let mut unvectorized = 0;
        let mut candidates = Vec::with_capacity(rows.len());
        for record in rows {
            let mut record = self.table.schema.normalize_record(record);
            let id = record.get(&identifier).cloned().unwrap_or(Value::Null);
            match record.remove(&vector_column) {
                Some(Value::Vector(vector)) => {
                    if columns.is_empty() || columns.contains(&vector_column.as_str()) {
                        record.insert(vector_column.clone(), vector.clone());
                    }
                    candidates.push(((id, record), vector));
                }
                Some(Value::Null) | None => unvectorized += 1,
                Some(other) => {
                    return Err(RagError::store(format!(
                        "column '{}' holds {} instead of a vector",
                        vector_column,
                        other.type_name()
                    )))
                }
            }
        }

        let ranking = rank_by_similarity(
            query,
            candidates,
            top_k,
            |a: &(Value, Record), b: &(Value, Record)| a.0.total_cmp(&b.0),
        )?;

        if ranking.skipped > 0 {
            warn!(
                "Similarity search on {} skipped {} rows with mismatched dimension",
                self.table.name, ranking.skipped
            );
        }

        let hits = ranking
            .hits
            .into_iter()
            .map(|hit| SimilarityHit {
                score: hit.score,
                record: hit.item.1.project(columns),
            })
            .collect();

        Ok(SimilarityResults {
            hits,
            scanned: ranking.scanned,
            skipped: ranking.skipped,
            unvectorized,
        })
    }

    /// Vectorize `text` with a registered vectorizer and run a similarity
    /// search with the result.
    pub async fn similarity_search_text(
        &self,
        text: &str,
        vectorizer: &str,
        top_k: usize,
        columns: &[&str],
    ) -> Result<SimilarityResults> {
        let query = self
            .vectorizers
            .get(vectorizer)?
            .vectorize(&Value::from(text))
            .await?;
        self.similarity_search(&query, top_k, columns).await
    }

    // Backup and restore

    /// Write every row, ordered by identifier, to a backup file.
    ///
    /// The format follows the extension (`.json` or `.jsonl`). Returns the
    /// number of records written.
    pub async fn backup_database(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        BackupFormat::from_path(path)?;

        let identifier = self.table.identifier()?.name.clone();
        let records: Vec<Record> = self
            .store
            .execute(&Statement::Select {
                table: self.table.name.clone(),
                columns: None,
                filter: None,
                order_by: Some(identifier),
                limit: None,
            })
            .await?
            .into_records()
            .into_iter()
            .map(|record| self.table.schema.normalize_record(record))
            .collect();

        let count = backup::write_backup(path, &records)?;
        info!("Backed up {} records from {} to {:?}", count, self.table.name, path);
        Ok(count)
    }

    /// Replace the table contents with a backup.
    ///
    /// Records are validated against `table` (the bound definition when
    /// `None`) before the store is touched. A definition different from the
    /// bound one replaces the table and becomes the bound definition.
    /// Records are inserted as stored, without re-vectorization. Returns the
    /// number of records restored.
    pub async fn restore_database(
        &mut self,
        path: impl AsRef<Path>,
        table: Option<TableDef>,
    ) -> Result<usize> {
        let path = path.as_ref();
        let target = match table {
            Some(table) => {
                table.validate()?;
                table
            }
            None => self.table.clone(),
        };

        let records = backup::read_backup(path)?
            .into_iter()
            .map(|record| Self::validate_new(&target, record))
            .collect::<Result<Vec<_>>>()?;

        if target != self.table {
            self.store
                .execute(&Statement::DropTable {
                    table: target.name.clone(),
                })
                .await?;
            self.create(&target).await?;
            self.table = target;
        } else if self.table_exists().await? {
            self.store
                .execute(&Statement::Truncate {
                    table: self.table.name.clone(),
                })
                .await?;
        } else {
            self.create(&self.table).await?;
        }

        for batch in records.chunks(self.batch_size) {
            self.store
                .execute(&Statement::Insert {
                    table: self.table.name.clone(),
                    records: batch.to_vec(),
                })
                .await?;
            debug!("Restored batch of {} records", batch.len());
        }

        info!(
            "Restored {} records into {} from {:?}",
            records.len(),
            self.table.name,
            path
        );
        Ok(records.len())
    }
}
