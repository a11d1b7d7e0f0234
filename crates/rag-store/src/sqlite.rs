//! SQLite-backed store client.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::{debug, info};

use rag_core::config::DatabaseConfig;
use rag_core::{QueryResult, RagError, Record, Result, Statement, StoreClient, Value};

use crate::sql;

/// Store client over a single SQLite connection.
///
/// Vectors are stored as little-endian `f32` blobs and booleans as integers;
/// the table manager normalizes both back through the bound schema.
pub struct SqliteStore {
    /// `None` while closed.
    conn: Mutex<Option<Connection>>,

    /// Database file, or `None` for an in-memory database.
    path: Option<PathBuf>,

    wal_mode: bool,
    busy_timeout_ms: u32,
}

impl SqliteStore {
    /// Open or create a database at the given path with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        };
        Self::open_with_config(&config)
    }

    /// Open or create the database described by `config`.
    pub fn open_with_config(config: &DatabaseConfig) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(None),
            path: Some(config.path.clone()),
            wal_mode: config.wal_mode,
            busy_timeout_ms: config.busy_timeout_ms,
        };
        store.reopen()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    ///
    /// Closing an in-memory store discards its contents.
    pub fn open_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(None),
            path: None,
            wal_mode: false,
            busy_timeout_ms: 30000,
        };
        store.reopen()?;
        Ok(store)
    }

    /// Database file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn reopen(&self) -> Result<()> {
        let mut guard = self.conn.lock().map_err(|e| RagError::store(e.to_string()))?;
        if guard.is_some() {
            return Ok(());
        }

        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_WRITE
                        | OpenFlags::SQLITE_OPEN_CREATE
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(|e| RagError::store(format!("Failed to open database: {}", e)))?
            }
            None => Connection::open_in_memory().map_err(|e| {
                RagError::store(format!("Failed to open in-memory database: {}", e))
            })?,
        };

        self.configure_connection(&conn)?;

        match &self.path {
            Some(path) => info!("Database opened at {:?}", path),
            None => debug!("In-memory database opened"),
        }

        *guard = Some(conn);
        Ok(())
    }

    fn configure_connection(&self, conn: &Connection) -> Result<()> {
        let journal = if self.wal_mode && self.path.is_some() {
            "PRAGMA journal_mode = WAL;"
        } else {
            ""
        };

        conn.execute_batch(&format!(
            r#"
            {}
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = {};
            PRAGMA temp_store = MEMORY;
            "#,
            journal, self.busy_timeout_ms
        ))
        .map_err(|e| RagError::store(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Run an operation against the open connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let guard = self.conn.lock().map_err(|e| RagError::store(e.to_string()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| RagError::store("not connected"))?;
        f(conn)
    }
}

#[async_trait]
impl StoreClient for SqliteStore {
    async fn connect(&self) -> Result<()> {
        self.reopen()
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.conn.lock().map_err(|e| RagError::store(e.to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close()
                .map_err(|(_, e)| RagError::store(format!("Failed to close database: {}", e)))?;
            debug!("Database connection closed");
        }
        Ok(())
    }

    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        debug!("Executing {}", statement.kind());

        self.with_conn(|conn| match statement {
            Statement::CreateTable { table } => {
                debug!(
                    "Creating table {} (engine {} not applicable to SQLite)",
                    table.name, table.engine
                );
                let create = sql::create_table(table)?;
                conn.execute(&create, [])
                    .map_err(|e| RagError::store(format!("Failed to create table: {}", e)))?;
                Ok(QueryResult::default())
            }

            Statement::DropTable { table } => {
                conn.execute(&sql::drop_table(table), [])
                    .map_err(|e| RagError::store(format!("Failed to drop table: {}", e)))?;
                Ok(QueryResult::default())
            }

            Statement::TableExists { table } => {
                let exists: bool = conn
                    .query_row(sql::table_exists(), [table.as_str()], |row| row.get(0))
                    .map_err(|e| RagError::store(e.to_string()))?;
                Ok(QueryResult {
                    columns: vec!["exists".to_string()],
                    rows: vec![vec![Value::Bool(exists)]],
                    affected: 0,
                })
            }

            Statement::Truncate { table } => {
                let affected = conn
                    .execute(&sql::truncate(table), [])
                    .map_err(|e| RagError::store(format!("Failed to truncate table: {}", e)))?;
                Ok(QueryResult::affected(affected))
            }

            Statement::Insert { table, records } => insert_records(conn, table, records),

            Statement::Update {
                table,
                assignments,
                key_column,
                key,
            } => {
                if assignments.is_empty() {
                    return Ok(QueryResult::affected(0));
                }

                let columns: Vec<&str> = assignments.iter().map(|(c, _)| c.as_str()).collect();
                let mut params: Vec<&Value> = assignments.iter().map(|(_, v)| v).collect();
                params.push(key);

                let affected = conn
                    .execute(
                        &sql::update(table, &columns, key_column),
                        params_from_iter(params.into_iter().map(SqlParam)),
                    )
                    .map_err(|e| RagError::store(format!("Failed to update row: {}", e)))?;
                Ok(QueryResult::affected(affected))
            }

            Statement::Delete {
                table,
                key_column,
                key,
            } => {
                let affected = conn
                    .execute(
                        &sql::delete(table, key_column),
                        params_from_iter([SqlParam(key)]),
                    )
                    .map_err(|e| RagError::store(format!("Failed to delete row: {}", e)))?;
                Ok(QueryResult::affected(affected))
            }

            Statement::Select {
                table,
                columns,
                filter,
                order_by,
                limit,
            } => {
                let text = sql::select(
                    table,
                    columns.as_deref(),
                    filter.as_ref().map(|(c, _)| c.as_str()),
                    order_by.as_deref(),
                    *limit,
                );
                let params: Vec<&Value> = filter.iter().map(|(_, v)| v).collect();
                query(conn, &text, &params)
            }

            Statement::Raw { sql, params } => {
                let params: Vec<&Value> = params.iter().collect();
                query(conn, sql, &params)
            }
        })
    }
}

/// Insert all records in one transaction. Any failure rolls back the batch.
fn insert_records(conn: &Connection, table: &str, records: &[Record]) -> Result<QueryResult> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| RagError::store(e.to_string()))?;

    let mut affected = 0;
    for record in records {
        let columns: Vec<&str> = record.keys().collect();
        let mut stmt = tx
            .prepare_cached(&sql::insert(table, &columns))
            .map_err(|e| RagError::store(format!("Failed to prepare insert: {}", e)))?;
        affected += stmt
            .execute(params_from_iter(record.iter().map(|(_, v)| SqlParam(v))))
            .map_err(|e| RagError::store(format!("Failed to insert row: {}", e)))?;
    }

    tx.commit().map_err(|e| RagError::store(e.to_string()))?;

    debug!("Inserted {} rows into {}", affected, table);
    Ok(QueryResult::affected(affected))
}

/// Run arbitrary statement text, collecting rows when it yields any.
fn query(conn: &Connection, text: &str, params: &[&Value]) -> Result<QueryResult> {
    let mut stmt = conn
        .prepare_cached(text)
        .map_err(|e| RagError::store(format!("Failed to prepare query: {}", e)))?;
    let bound = params_from_iter(params.iter().map(|v| SqlParam(*v)));

    if stmt.column_count() == 0 {
        let affected = stmt
            .execute(bound)
            .map_err(|e| RagError::store(e.to_string()))?;
        return Ok(QueryResult::affected(affected));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(bound).map_err(|e| RagError::store(e.to_string()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| RagError::store(e.to_string()))? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            let cell = row.get_ref(i).map_err(|e| RagError::store(e.to_string()))?;
            values.push(value_from_sql(cell)?);
        }
        out.push(values);
    }

    Ok(QueryResult {
        columns,
        rows: out,
        affected: 0,
    })
}

/// Binds a [`Value`] as a SQLite parameter.
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(x) => ToSqlOutput::Owned(SqlValue::Real(*x)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Vector(v) => ToSqlOutput::Owned(SqlValue::Blob(vec_to_bytes(v))),
        })
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),
        ValueRef::Real(x) => Ok(Value::Float(x)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Text(s.to_string()))
            .map_err(|e| RagError::store(format!("invalid UTF-8 in text column: {}", e))),
        ValueRef::Blob(bytes) => bytes_to_vec(bytes).map(Value::Vector),
    }
}

/// Convert f32 vector to bytes (little-endian).
fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vec(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(RagError::store(format!(
            "vector blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::{Schema, TableDef};

    fn docs() -> TableDef {
        let schema = Schema::parse([
            ("id", "String"),
            ("title", "String"),
            ("views", "UInt32"),
            ("vector", "Array(Float32)"),
        ])
        .unwrap();
        TableDef::new("docs", schema)
    }

    fn select_all(table: &str) -> Statement {
        Statement::Select {
            table: table.to_string(),
            columns: None,
            filter: None,
            order_by: Some("id".to_string()),
            limit: None,
        }
    }

    async fn exists(store: &SqliteStore, table: &str) -> bool {
        let result = store
            .execute(&Statement::TableExists {
                table: table.to_string(),
            })
            .await
            .unwrap();
        result.scalar() == Some(&Value::Bool(true))
    }

    #[tokio::test]
    async fn test_create_and_exists() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(!exists(&store, "docs").await);

        store
            .execute(&Statement::CreateTable { table: docs() })
            .await
            .unwrap();
        assert!(exists(&store, "docs").await);

        let err = store
            .execute(&Statement::CreateTable { table: docs() })
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Store { .. }));

        store
            .execute(&Statement::DropTable {
                table: "docs".to_string(),
            })
            .await
            .unwrap();
        assert!(!exists(&store, "docs").await);
    }

    #[tokio::test]
    async fn test_row_crud() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .execute(&Statement::CreateTable { table: docs() })
            .await
            .unwrap();

        let records = vec![
            Record::new()
                .with("id", "b")
                .with("title", "second")
                .with("vector", vec![0.5f32, -0.25]),
            Record::new().with("id", "a").with("title", "first").with("views", 3i64),
        ];
        let inserted = store
            .execute(&Statement::Insert {
                table: "docs".to_string(),
                records,
            })
            .await
            .unwrap();
        assert_eq!(inserted.affected, 2);

        let rows = store.execute(&select_all("docs")).await.unwrap().into_records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::from("a")));
        assert_eq!(rows[0].get("views"), Some(&Value::Integer(3)));
        assert_eq!(rows[0].get("vector"), Some(&Value::Null));
        assert_eq!(rows[1].get("vector"), Some(&Value::Vector(vec![0.5, -0.25])));

        let updated = store
            .execute(&Statement::Update {
                table: "docs".to_string(),
                assignments: vec![("title".to_string(), Value::from("renamed"))],
                key_column: "id".to_string(),
                key: Value::from("a"),
            })
            .await
            .unwrap();
        assert_eq!(updated.affected, 1);

        let one = store
            .execute(&Statement::Select {
                table: "docs".to_string(),
                columns: Some(vec!["title".to_string()]),
                filter: Some(("id".to_string(), Value::from("a"))),
                order_by: None,
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(one.columns, vec!["title".to_string()]);
        assert_eq!(one.scalar(), Some(&Value::from("renamed")));

        let deleted = store
            .execute(&Statement::Delete {
                table: "docs".to_string(),
                key_column: "id".to_string(),
                key: Value::from("a"),
            })
            .await
            .unwrap();
        assert_eq!(deleted.affected, 1);

        let deleted = store
            .execute(&Statement::Delete {
                table: "docs".to_string(),
                key_column: "id".to_string(),
                key: Value::from("a"),
            })
            .await
            .unwrap();
        assert_eq!(deleted.affected, 0);
    }

    #[tokio::test]
    async fn test_insert_is_all_or_nothing() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .execute(&Statement::CreateTable { table: docs() })
            .await
            .unwrap();

        let records = vec![
            Record::new().with("id", "a"),
            Record::new().with("id", "a"),
        ];
        let err = store
            .execute(&Statement::Insert {
                table: "docs".to_string(),
                records,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Store { .. }));

        let rows = store.execute(&select_all("docs")).await.unwrap();
        assert!(rows.rows.is_empty());
    }

    #[tokio::test]
    async fn test_truncate_and_raw() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .execute(&Statement::CreateTable { table: docs() })
            .await
            .unwrap();
        store
            .execute(&Statement::Insert {
                table: "docs".to_string(),
                records: vec![Record::new().with("id", "a"), Record::new().with("id", "b")],
            })
            .await
            .unwrap();

        let count = store
            .execute(&Statement::Raw {
                sql: "SELECT COUNT(*) AS n FROM docs WHERE id <> ?1".to_string(),
                params: vec![Value::from("a")],
            })
            .await
            .unwrap();
        assert_eq!(count.columns, vec!["n".to_string()]);
        assert_eq!(count.scalar(), Some(&Value::Integer(1)));

        let truncated = store
            .execute(&Statement::Truncate {
                table: "docs".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(truncated.affected, 2);
        assert!(exists(&store, "docs").await);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_statements() {
        let store = SqliteStore::open_memory().unwrap();
        store.close().await.unwrap();
        assert!(!store.is_connected());

        let err = store.execute(&select_all("docs")).await.unwrap_err();
        assert!(matches!(err, RagError::Store { .. }));

        store.connect().await.unwrap();
        assert!(store.is_connected());
        assert!(!exists(&store, "docs").await);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rag.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .execute(&Statement::CreateTable { table: docs() })
                .await
                .unwrap();
            store
                .execute(&Statement::Insert {
                    table: "docs".to_string(),
                    records: vec![Record::new().with("id", "a").with("vector", vec![1.0f32])],
                })
                .await
                .unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let rows = store.execute(&select_all("docs")).await.unwrap().into_records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("vector"), Some(&Value::Vector(vec![1.0])));
    }

    #[test]
    fn test_blob_length_checked() {
        assert_eq!(
            bytes_to_vec(&vec_to_bytes(&[1.5, -2.0])).unwrap(),
            vec![1.5, -2.0]
        );
        assert!(bytes_to_vec(&[0, 1, 2]).is_err());
    }
}
