use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable at {path}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not create table `{table}`")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("table `{table}` already exists with an incompatible layout: {detail}")]
    IncompatibleSchema { table: String, detail: String },

    #[error("seed record `{name}` violates a table constraint")]
    ConstraintViolation {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not seed table `{table}`")]
    Seed {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query failed")]
    Query(#[source] rusqlite::Error),

    #[error("failed to write records")]
    Render(#[from] std::io::Error),

    #[error("failed to close store")]
    Close(#[source] rusqlite::Error),
}

impl StoreError {
    /// Classify a failure inserting the record called `name` into `table`.
    pub(crate) fn insert(table: &str, name: &str, source: rusqlite::Error) -> Self {
        if source.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            StoreError::ConstraintViolation {
                name: name.to_string(),
                source,
            }
        } else {
            StoreError::Seed {
                table: table.to_string(),
                source,
            }
        }
    }
}
