use std::collections::HashMap;

use super::{Table, error::StorageError};

/// Registry of every table known to the engine, keyed by exact name.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table. Names are unique; a collision is rejected and the
    /// existing table is left untouched.
    pub fn add(&mut self, table: Table) -> Result<(), StorageError> {
        if self.tables.contains_key(table.name()) {
            return Err(StorageError::DuplicateTable(table.name().to_string()));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Column, ColumnType};

    fn table(name: &str) -> Table {
        Table::new(name, vec![Column::new("id", ColumnType::Int)], &[] as &[&str]).unwrap()
    }

    #[test]
    fn add_and_get() {
        let mut catalog = Catalog::new();
        catalog.add(table("users")).unwrap();
        catalog.add(table("orders")).unwrap();

        assert!(catalog.contains("users"));
        assert!(catalog.get("Users").is_none());
        assert_eq!(catalog.names(), vec!["orders", "users"]);
    }

    #[test]
    #[should_panic(expected = "DuplicateTable")]
    fn add_duplicate() {
        let mut catalog = Catalog::new();
        catalog.add(table("users")).unwrap();
        catalog.add(table("users")).unwrap();
    }
}
