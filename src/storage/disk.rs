//! On-disk mirror of the catalog.
//!
//! Every table owns a directory under the data root holding two text files:
//!
//! - `<name>.csv`: a header of comma-joined column names followed by one line
//!   per row, each value in its canonical text form. Fields are split on
//!   every comma with no quoting, so text containing a comma does not survive
//!   a reload, and text that is exactly `NULL` comes back as a null value.
//! - `<name>.meta`: `columns:`, then `name|TYPE|capacity|nullable` per column,
//!   then `pk:` with the comma-joined key column names.
//!
//! Inserts append to the data file; updates and deletes rewrite it whole.
//! Nothing is fsynced and there is no temp-file rename.
//!
//! # Example
//! ```rust
//! use minidb::storage::{Column, ColumnType, DiskStore, Table};
//! use minidb::value::Value;
//!
//! let root = std::env::temp_dir().join("minidb-doc-disk");
//! # let _ = std::fs::remove_dir_all(&root);
//! let store = DiskStore::open(&root).unwrap();
//!
//! let columns = vec![Column::new("id", ColumnType::Int).primary_key()];
//! let mut table = Table::new("ids", columns, &[] as &[&str]).unwrap();
//! store.create(&table).unwrap();
//!
//! let row = vec![Value::Int(7)];
//! table.insert(row.clone()).unwrap();
//! store.append(&table, &row).unwrap();
//!
//! let catalog = store.load().unwrap();
//! assert!(catalog.get("ids").unwrap().find_by_key(&["7"]).is_some());
//! # std::fs::remove_dir_all(&root).unwrap();
//! ```
use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use super::{Catalog, Column, ColumnType, Row, Table, error::StorageError};
use crate::value::{Date, Value};

const DATA_EXTENSION: &str = "csv";
const META_EXTENSION: &str = "meta";
const COLUMNS_MARKER: &str = "columns:";
const PK_MARKER: &str = "pk:";

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |cause| StorageError::Io {
        path: path.to_path_buf(),
        cause,
    }
}

/// Reads one persisted field back into a value of the column's type.
/// Text is kept byte for byte, padding included.
fn parse_stored(raw: &str, column_type: ColumnType) -> Option<Value> {
    if raw == "NULL" {
        return Some(Value::Null);
    }

    match column_type {
        ColumnType::Int => raw.trim().parse().ok().map(Value::Int),
        ColumnType::Double => raw.trim().parse().ok().map(Value::Double),
        ColumnType::Date => Date::parse(raw.trim()).map(Value::Date),
        ColumnType::Varchar => Some(Value::Text(raw.to_string())),
    }
}

fn join_row(row: &Row) -> String {
    row.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Opens a data root, creating the directory when missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    pub fn data_path(&self, table: &str) -> PathBuf {
        self.table_dir(table)
            .join(format!("{table}.{DATA_EXTENSION}"))
    }

    pub fn meta_path(&self, table: &str) -> PathBuf {
        self.table_dir(table)
            .join(format!("{table}.{META_EXTENSION}"))
    }

    /// Writes the metadata file and an empty data file for a new table.
    pub fn create(&self, table: &Table) -> Result<(), StorageError> {
        let dir = self.table_dir(table.name());
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        self.write_meta(table)?;
        self.rewrite(table)?;
        info!("created storage for table '{}' in {:?}", table.name(), dir);
        Ok(())
    }

    fn write_meta(&self, table: &Table) -> Result<(), StorageError> {
        let path = self.meta_path(table.name());
        let f = File::create(&path).map_err(io_error(&path))?;
        let mut writer = BufWriter::new(f);

        let mut out = String::from(COLUMNS_MARKER);
        out.push('\n');
        for column in table.columns() {
            out.push_str(&format!(
                "{}|{}|{}|{}\n",
                column.name,
                column.column_type,
                column.capacity,
                if column.nullable { 1 } else { 0 }
            ));
        }
        out.push_str(PK_MARKER);
        out.push_str(&table.primary_key_names().join(","));
        out.push('\n');

        writer.write_all(out.as_bytes()).map_err(io_error(&path))?;
        writer.flush().map_err(io_error(&path))
    }

    fn header(table: &Table) -> String {
        table
            .columns()
            .iter()
            .map(|c| c.name.replace(',', "_"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Appends a single row to the table's data file.
    pub fn append(&self, table: &Table, row: &Row) -> Result<(), StorageError> {
        let path = self.data_path(table.name());
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error(&path))?;

        writeln!(f, "{}", join_row(row)).map_err(io_error(&path))
    }

    /// Replaces the table's data file with its current rows.
    pub fn rewrite(&self, table: &Table) -> Result<(), StorageError> {
        let path = self.data_path(table.name());
        let f = File::create(&path).map_err(io_error(&path))?;
        let mut writer = BufWriter::new(f);

        writeln!(writer, "{}", Self::header(table)).map_err(io_error(&path))?;
        for row in table.rows() {
            writeln!(writer, "{}", join_row(row)).map_err(io_error(&path))?;
        }
        writer.flush().map_err(io_error(&path))?;
        debug!("rewrote {} rows to {:?}", table.len(), path);
        Ok(())
    }

    /// Rebuilds every table found under the data root.
    ///
    /// A directory whose metadata can't be read is skipped with a warning, as
    /// are data rows that don't fit the schema or violate the primary key.
    pub fn load(&self) -> Result<Catalog, StorageError> {
        let mut catalog = Catalog::new();
        let mut dirs = Vec::new();

        for entry in fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let entry = entry.map_err(io_error(&self.root))?;
            if entry.path().is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();

        for name in dirs {
            if !self.meta_path(&name).is_file() {
                continue;
            }

            match self.load_table(&name) {
                Ok(table) => {
                    info!("loaded table '{}' with {} rows", name, table.len());
                    catalog.add(table)?;
                }
                Err(e) => warn!("skipping table '{name}': {e}"),
            }
        }

        Ok(catalog)
    }

    fn read_meta(&self, name: &str) -> Result<(Vec<Column>, Vec<String>), StorageError> {
        let path = self.meta_path(name);
        let f = File::open(&path).map_err(io_error(&path))?;
        let metadata_error = |reason: String| StorageError::Metadata {
            path: path.clone(),
            reason,
        };

        let mut columns = Vec::new();
        let mut primary_key = Vec::new();

        for line in BufReader::new(f).lines() {
            let line = line.map_err(io_error(&path))?;
            let line = line.trim();

            if line.is_empty() || line == COLUMNS_MARKER {
                continue;
            }
            if let Some(list) = line.strip_prefix(PK_MARKER) {
                primary_key = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                break;
            }

            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() < 3 {
                return Err(metadata_error(format!("malformed column line '{line}'")));
            }

            let column_type: ColumnType = parts[1].parse().map_err(metadata_error)?;
            let capacity: usize = parts[2]
                .parse()
                .map_err(|_| metadata_error(format!("invalid capacity '{}'", parts[2])))?;

            let mut column = Column::new(parts[0], column_type).with_capacity(capacity);
            column.nullable = parts.get(3).is_none_or(|flag| *flag == "1");
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(metadata_error("no columns defined".to_string()));
        }

        for column in columns.iter_mut() {
            column.primary_key = primary_key.contains(&column.name);
        }
        Ok((columns, primary_key))
    }

    fn load_table(&self, name: &str) -> Result<Table, StorageError> {
        let (columns, primary_key) = self.read_meta(name)?;
        let mut table = Table::new(name, columns, &primary_key)?;

        let path = self.data_path(name);
        if !path.is_file() {
            return Ok(table);
        }

        let f = File::open(&path).map_err(io_error(&path))?;
        for (line_no, line) in BufReader::new(f).lines().enumerate().skip(1) {
            let line = line.map_err(io_error(&path))?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != table.columns().len() {
                warn!(
                    "[{name}] line {}: expected {} fields, found {}",
                    line_no + 1,
                    table.columns().len(),
                    fields.len()
                );
                continue;
            }

            let row: Option<Row> = fields
                .iter()
                .zip(table.columns())
                .map(|(raw, column)| parse_stored(raw, column.column_type))
                .collect();

            match row {
                Some(row) => {
                    if let Err(e) = table.insert(row) {
                        warn!("[{name}] line {}: {e}", line_no + 1);
                    }
                }
                None => warn!("[{name}] line {}: unreadable value", line_no + 1),
            }
        }

        Ok(table)
    }
}
