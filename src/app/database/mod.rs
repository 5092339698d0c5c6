//! Database opener and query boundary
//!
//! The artifact is handed to a [`QueryEngine`] as an opaque byte buffer. The
//! engine returns a [`Database`] that prepares [`Statement`]s, and rows come
//! back as column name to JSON value maps so callers can render them without
//! knowing the engine's value types.
//!
//! # Module Organization
//!
//! - [`sqlite`] - `sqlx`-backed SQLite engine

pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::app::cache::{Location, StoreResult};
use crate::app::selector::ResolvedSource;
use crate::constants::DEFAULT_QUERY_LIMIT;
use crate::errors::{DatabaseError, DatabaseResult};

pub use sqlite::SqliteEngine;

/// One result row keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Constructor for queryable databases
#[async_trait]
pub trait QueryEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Materialise a database from the raw artifact bytes
    async fn open(&self, bytes: Vec<u8>) -> DatabaseResult<Box<dyn Database>>;
}

/// An open database
#[async_trait]
pub trait Database: Send + Sync {
    /// Compile `sql` into a statement ready to be stepped
    async fn prepare(&self, sql: &str) -> DatabaseResult<Box<dyn Statement>>;

    /// Release the engine's resources
    async fn close(self: Box<Self>) -> DatabaseResult<()>;
}

/// A prepared statement; dropping it frees its resources
#[async_trait]
pub trait Statement: Send {
    fn column_names(&self) -> &[String];

    /// Next row, or `None` once the statement is exhausted
    async fn step(&mut self) -> DatabaseResult<Option<Row>>;
}

/// Database opened from a store result
pub struct LoadedDatabase {
    pub db: Box<dyn Database>,
    pub location: Location,
    pub version: String,
    pub source: ResolvedSource,
}

impl std::fmt::Debug for LoadedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedDatabase")
            .field("location", &self.location)
            .field("version", &self.version)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Turn a store result into an open database
///
/// A durable result is read in full from its handle, a transient result
/// hands over its buffer as is.
///
/// # Errors
///
/// * `DatabaseError::InvalidStore` - The bytes are empty
/// * `DatabaseError::Storage` - The durable file could not be read
/// * Any error the engine reports while opening
pub async fn open_database(
    stored: StoreResult,
    engine: &dyn QueryEngine,
) -> DatabaseResult<LoadedDatabase> {
    let location = stored.location();
    let (bytes, source, version) = match stored {
        StoreResult::Durable {
            handle,
            source,
            version,
        } => {
            debug!("Reading {} from durable storage", handle.name());
            (handle.read().await?, source, version)
        }
        StoreResult::Transient {
            bytes,
            source,
            version,
        } => (bytes, source, version),
    };

    if bytes.is_empty() {
        return Err(DatabaseError::InvalidStore {
            reason: format!("{} store holds no bytes", location),
        });
    }

    let size = bytes.len();
    let db = engine.open(bytes).await?;
    info!(
        "Opened {} database at version {} ({} bytes, {})",
        engine.name(),
        version,
        size,
        location
    );

    Ok(LoadedDatabase {
        db,
        location,
        version,
        source,
    })
}

/// Rows returned by [`run_query`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// More rows were available beyond the limit
    pub truncated: bool,
}

/// Run `sql` and collect at most `limit` rows
///
/// A limit of zero falls back to the default of 200 rows.
pub async fn run_query(db: &dyn Database, sql: &str, limit: usize) -> DatabaseResult<QueryOutput> {
    let limit = if limit == 0 { DEFAULT_QUERY_LIMIT } else { limit };

    let mut statement = db.prepare(sql).await?;
    let columns = statement.column_names().to_vec();
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = statement.step().await? {
        rows.push(row);
        if rows.len() >= limit {
            truncated = statement.step().await?.is_some();
            break;
        }
    }

    debug!("Query returned {} rows (truncated: {})", rows.len(), truncated);
    Ok(QueryOutput {
        columns,
        rows,
        truncated,
    })
}
