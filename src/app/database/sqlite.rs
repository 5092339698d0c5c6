//! SQLite query engine
//!
//! The artifact bytes are written to a private temporary file which is then
//! opened read-only through a single-connection `sqlx` pool. The file is
//! removed when the database is dropped.

use std::io::Write;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as _, Statement as _, TypeInfo, ValueRef};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{Database, QueryEngine, Row, Statement};
use crate::errors::{DatabaseError, DatabaseResult};

const SQLITE_HEADER: &[u8] = b"SQLite format 3\0";

/// Query engine backed by SQLite
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryEngine for SqliteEngine {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn open(&self, bytes: Vec<u8>) -> DatabaseResult<Box<dyn Database>> {
        if !bytes.starts_with(SQLITE_HEADER) {
            return Err(DatabaseError::Engine {
                message: "input is not a SQLite database".to_string(),
            });
        }

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut file = NamedTempFile::new()?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!("Materialised SQLite database at {}", file.path().display());

        let options = SqliteConnectOptions::new()
            .filename(file.path())
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Box::new(SqliteDatabase { pool, _file: file }))
    }
}

/// Open SQLite database
///
/// Field order matters: the pool closes before the backing file is removed.
struct SqliteDatabase {
    pool: SqlitePool,
    _file: NamedTempFile,
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn prepare(&self, sql: &str) -> DatabaseResult<Box<dyn Statement>> {
        let prepared = (&self.pool).prepare(sql).await?;
        let columns = prepared
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let pool = self.pool.clone();
        let sql = sql.to_string();
        let rows: BoxStream<'static, sqlx::Result<SqliteRow>> = try_stream! {
            let mut rows = sqlx::query(&sql).fetch(&pool);
            while let Some(row) = rows.try_next().await? {
                yield row;
            }
        }
        .boxed();

        Ok(Box::new(SqliteStatement { columns, rows }))
    }

    async fn close(self: Box<Self>) -> DatabaseResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

struct SqliteStatement {
    columns: Vec<String>,
    rows: BoxStream<'static, sqlx::Result<SqliteRow>>,
}

#[async_trait]
impl Statement for SqliteStatement {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    async fn step(&mut self) -> DatabaseResult<Option<Row>> {
        match self.rows.try_next().await? {
            Some(row) => Ok(Some(row_to_map(&row)?)),
            None => Ok(None),
        }
    }
}

/// Convert a row by the storage class of each value
///
/// Blobs are summarised by their length rather than rendered.
fn row_to_map(row: &SqliteRow) -> DatabaseResult<Row> {
    let mut map = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Value::from(row.try_get::<f64, _>(index)?),
                "BLOB" => {
                    let blob = row.try_get::<Vec<u8>, _>(index)?;
                    Value::String(format!("<{} bytes>", blob.len()))
                }
                _ => Value::String(row.try_get::<String, _>(index)?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}
