use thiserror::Error;

/// Failure of a store operation.
///
/// "Not found" is not an error: lookups return `Ok(None)` and deletes return
/// `Ok(false)`, so an `Err` always means the store could not answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (e.g. a second directory
    /// row for the same subject).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store rejected the row's contents (bad reference, wrong type).
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Connection, pool or query failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Map SQLx errors by SQLSTATE.
///
/// | SQLSTATE | Meaning | StoreError |
/// |---|---|---|
/// | `23505` | unique violation | `Conflict` |
/// | `23503` | foreign key violation | `InvalidRecord` |
/// | `23502` | not-null violation | `InvalidRecord` |
/// | `22P02` | invalid text representation | `InvalidRecord` |
/// | other | | `Backend` |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") | Some("23502") | Some("22P02") => StoreError::InvalidRecord(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
