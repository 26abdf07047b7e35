//! Typed tabular storage.
//!
//! Tables hold their rows in a dense vector next to a hash index over the
//! encoded primary key. The [`Catalog`] owns every table, and [`DiskStore`]
//! mirrors each table into a data file and a metadata file under a data root.
pub mod catalog;
pub mod column;
pub mod disk;
pub mod table;

pub use catalog::Catalog;
pub use column::{Column, ColumnType};
pub use disk::DiskStore;
pub use table::{Row, Table};

pub mod error {
    use std::{io, path::PathBuf};

    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum StorageError {
        #[error("duplicate primary key '{key}' in table '{table}'")]
        DuplicateKey { table: String, key: String },

        #[error("primary key column '{column}' cannot be NULL")]
        NullKeyViolation { column: String },

        #[error("table '{0}' already exists")]
        DuplicateTable(String),

        #[error("PRIMARY KEY column not found: {0}")]
        UnknownPrimaryKey(String),

        #[error("row has {actual} values, table '{table}' has {expected} columns")]
        RowArity {
            table: String,
            expected: usize,
            actual: usize,
        },

        #[error("row position {position} out of range for {len} rows")]
        RowOutOfRange { position: usize, len: usize },

        #[error("[metadata][{path:?}]: {reason}")]
        Metadata { path: PathBuf, reason: String },

        #[error("[io][{path:?}]: {cause}")]
        Io {
            path: PathBuf,
            #[source]
            cause: io::Error,
        },
    }
}
