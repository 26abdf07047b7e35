//! Row storage with a primary-key index.
//!
//! Rows live in a dense `Vec`; positions carry no identity beyond "current
//! slot". When the table declares a primary key, `index` maps the encoded key
//! of every row to its position. All methods that move rows keep the two in
//! step before returning.
use std::collections::HashMap;

use log::trace;

use super::{Column, error::StorageError};
use crate::value::Value;

pub type Row = Vec<Value>;

const KEY_SEPARATOR: char = '|';
const KEY_ESCAPE: char = '\\';

/// Escapes one key component so joined keys can't collide.
fn escape_key(component: &str, out: &mut String) {
    for ch in component.chars() {
        if ch == KEY_ESCAPE || ch == KEY_SEPARATOR {
            out.push(KEY_ESCAPE);
        }
        out.push(ch);
    }
}

/// Encodes a sequence of key components in their canonical text form.
pub fn encode_key<I, S>(components: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for (i, component) in components.into_iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        escape_key(component.as_ref(), &mut key);
    }
    key
}

#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    ordinals: HashMap<String, usize>,
    rows: Vec<Row>,
    primary_key: Vec<usize>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Builds an empty table.
    ///
    /// When `primary_key` is empty the key is taken from the columns flagged
    /// with [`Column::primary_key`].
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        columns: Vec<Column>,
        primary_key: &[S],
    ) -> Result<Self, StorageError> {
        let ordinals: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        let primary_key = if primary_key.is_empty() {
            columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.primary_key)
                .map(|(i, _)| i)
                .collect()
        } else {
            primary_key
                .iter()
                .map(|pk| {
                    ordinals
                        .get(pk.as_ref())
                        .copied()
                        .ok_or_else(|| StorageError::UnknownPrimaryKey(pk.as_ref().to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.into(),
            columns,
            ordinals,
            rows: Vec::new(),
            primary_key,
            index: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, ordinal: usize) -> Option<&Column> {
        self.columns.get(ordinal)
    }

    /// Ordinal of a column by its exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.ordinals.get(name).copied()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&Row> {
        self.rows.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Ordinals of the primary key columns, in key order.
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn primary_key_names(&self) -> Vec<&str> {
        self.primary_key
            .iter()
            .map(|&i| self.columns[i].name.as_str())
            .collect()
    }

    /// Number of entries in the key index.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    fn row_key(&self, row: &Row) -> Result<String, StorageError> {
        let mut parts = Vec::with_capacity(self.primary_key.len());
        for &i in self.primary_key.iter() {
            match &row[i] {
                Value::Null => {
                    return Err(StorageError::NullKeyViolation {
                        column: self.columns[i].name.clone(),
                    });
                }
                value => parts.push(value.to_string()),
            }
        }
        Ok(encode_key(parts))
    }

    fn check_arity(&self, row: &Row) -> Result<(), StorageError> {
        if row.len() != self.columns.len() {
            return Err(StorageError::RowArity {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        Ok(())
    }

    /// Appends a row, returning its position.
    pub fn insert(&mut self, row: Row) -> Result<usize, StorageError> {
        self.check_arity(&row)?;
        let position = self.rows.len();

        if self.has_primary_key() {
            let key = self.row_key(&row)?;
            if self.index.contains_key(&key) {
                return Err(StorageError::DuplicateKey {
                    table: self.name.clone(),
                    key,
                });
            }
            trace!("[{}] indexing key '{key}' at {position}", self.name);
            self.index.insert(key, position);
        }

        self.rows.push(row);
        Ok(position)
    }

    /// Replaces the row at `position`, re-indexing when its key changes.
    pub fn update(&mut self, position: usize, row: Row) -> Result<(), StorageError> {
        self.check_arity(&row)?;
        if position >= self.rows.len() {
            return Err(StorageError::RowOutOfRange {
                position,
                len: self.rows.len(),
            });
        }

        if self.has_primary_key() {
            let old_key = self.row_key(&self.rows[position])?;
            let new_key = self.row_key(&row)?;

            if old_key != new_key {
                if self.index.contains_key(&new_key) {
                    return Err(StorageError::DuplicateKey {
                        table: self.name.clone(),
                        key: new_key,
                    });
                }
                trace!("[{}] re-keying '{old_key}' -> '{new_key}'", self.name);
                self.index.remove(&old_key);
                self.index.insert(new_key, position);
            }
        }

        self.rows[position] = row;
        Ok(())
    }

    /// Removes the rows at `positions`, returning how many were removed.
    ///
    /// Positions are processed in descending order with swap-remove, so the
    /// surviving rows are not kept in insertion order. Out of range and
    /// repeated positions are ignored.
    pub fn delete_many(&mut self, mut positions: Vec<usize>) -> usize {
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions.dedup();

        let mut removed = 0;
        for position in positions {
            if position >= self.rows.len() {
                continue;
            }
            self.remove_at(position);
            removed += 1;
        }
        removed
    }

    fn remove_at(&mut self, position: usize) -> Row {
        if self.has_primary_key() {
            // Keys of stored rows were validated on the way in.
            if let Ok(key) = self.row_key(&self.rows[position]) {
                self.index.remove(&key);
            }
        }

        let row = self.rows.swap_remove(position);

        if self.has_primary_key() && position < self.rows.len() {
            if let Ok(moved) = self.row_key(&self.rows[position]) {
                self.index.insert(moved, position);
            }
        }
        row
    }

    /// Position of the row whose key matches the given literal components.
    ///
    /// Components are compared in canonical text form, e.g. a `DOUBLE` key
    /// column is looked up as `"3.50"`.
    pub fn position_by_key<S: AsRef<str>>(&self, literals: &[S]) -> Option<usize> {
        if !self.has_primary_key() || literals.len() != self.primary_key.len() {
            return None;
        }
        let key = encode_key(literals.iter().map(|s| s.as_ref()));
        self.index.get(&key).copied()
    }

    pub fn find_by_key<S: AsRef<str>>(&self, literals: &[S]) -> Option<&Row> {
        self.position_by_key(literals).map(|p| &self.rows[p])
    }

    /// Deletes the row with the given key, returning it.
    pub fn delete_by_key<S: AsRef<str>>(&mut self, literals: &[S]) -> Option<Row> {
        let position = self.position_by_key(literals)?;
        Some(self.remove_at(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ColumnType;

    fn people() -> Table {
        let columns = vec![
            Column::new("id", ColumnType::Int).primary_key(),
            Column::new("name", ColumnType::Varchar).with_capacity(20),
        ];
        Table::new("people", columns, &[] as &[&str]).unwrap()
    }

    fn row(id: i64, name: &str) -> Row {
        vec![Value::Int(id), Value::from(name)]
    }

    /// Every stored row's key maps to its own position, and nothing else is
    /// indexed.
    fn assert_consistent(table: &Table) {
        assert_eq!(table.index_len(), table.len());
        for (position, row) in table.rows().iter().enumerate() {
            let literals: Vec<String> = table
                .primary_key()
                .iter()
                .map(|&i| row[i].to_string())
                .collect();
            assert_eq!(table.position_by_key(&literals), Some(position));
        }
    }

    #[test]
    fn insert_then_lookup() {
        let mut table = people();
        table.insert(row(1, "ada")).unwrap();
        table.insert(row(2, "grace")).unwrap();

        assert_eq!(table.find_by_key(&["2"]), Some(&row(2, "grace")));
        assert_eq!(table.find_by_key(&["3"]), None);
        assert_consistent(&table);
    }

    #[test]
    #[should_panic(expected = "DuplicateKey")]
    fn insert_duplicate_key() {
        let mut table = people();
        table.insert(row(1, "ada")).unwrap();
        table.insert(row(1, "someone else")).unwrap();
    }

    #[test]
    fn duplicate_leaves_table_unchanged() {
        let mut table = people();
        table.insert(row(1, "ada")).unwrap();
        assert!(table.insert(row(1, "x")).is_err());
        assert_eq!(table.len(), 1);
        assert_consistent(&table);
    }

    #[test]
    #[should_panic(expected = "NullKeyViolation")]
    fn insert_null_key() {
        let mut table = people();
        table.insert(vec![Value::Null, Value::from("ghost")]).unwrap();
    }

    #[test]
    #[should_panic(expected = "RowArity")]
    fn insert_wrong_arity() {
        let mut table = people();
        table.insert(vec![Value::Int(1)]).unwrap();
    }

    #[test]
    fn table_without_key_accepts_repeats() {
        let columns = vec![Column::new("n", ColumnType::Int)];
        let mut table = Table::new("bag", columns, &[] as &[&str]).unwrap();
        table.insert(vec![Value::Int(1)]).unwrap();
        table.insert(vec![Value::Int(1)]).unwrap();
        table.insert(vec![Value::Null]).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.index_len(), 0);
        assert_eq!(table.find_by_key(&["1"]), None);
    }

    #[test]
    #[should_panic(expected = "UnknownPrimaryKey")]
    fn unknown_primary_key_column() {
        let columns = vec![Column::new("a", ColumnType::Int)];
        Table::new("t", columns, &["b"]).unwrap();
    }

    #[test]
    fn composite_key_overrides_column_flags() {
        let columns = vec![
            Column::new("user_id", ColumnType::Int).primary_key(),
            Column::new("order_id", ColumnType::Int),
        ];
        let mut table = Table::new("orders", columns, &["user_id", "order_id"]).unwrap();
        assert_eq!(table.primary_key(), &[0, 1]);

        table.insert(vec![Value::Int(1), Value::Int(1)]).unwrap();
        table.insert(vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert!(table.insert(vec![Value::Int(1), Value::Int(2)]).is_err());

        assert!(table.find_by_key(&["1", "2"]).is_some());
        assert!(table.find_by_key(&["1"]).is_none());
    }

    #[test]
    fn escaped_components_do_not_collide() {
        let columns = vec![
            Column::new("a", ColumnType::Varchar).with_capacity(10),
            Column::new("b", ColumnType::Varchar).with_capacity(10),
        ];
        let mut table = Table::new("t", columns, &["a", "b"]).unwrap();

        table
            .insert(vec![Value::from("x|y"), Value::from("z")])
            .unwrap();
        table
            .insert(vec![Value::from("x"), Value::from("y|z")])
            .unwrap();
        table
            .insert(vec![Value::from("x\\"), Value::from("|z")])
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_consistent(&table);
        assert_eq!(encode_key(["a|b", "c\\"]), "a\\|b|c\\\\");
    }

    #[test]
    fn update_in_place_and_rekey() {
        let mut table = people();
        table.insert(row(1, "ada")).unwrap();
        table.insert(row(2, "grace")).unwrap();

        table.update(0, row(1, "ada lovelace")).unwrap();
        assert_eq!(table.find_by_key(&["1"]), Some(&row(1, "ada lovelace")));

        table.update(0, row(3, "ada lovelace")).unwrap();
        assert_eq!(table.find_by_key(&["1"]), None);
        assert_eq!(table.position_by_key(&["3"]), Some(0));
        assert_consistent(&table);
    }

    #[test]
    fn update_colliding_key_is_rejected() {
        let mut table = people();
        table.insert(row(1, "ada")).unwrap();
        table.insert(row(2, "grace")).unwrap();

        let err = table.update(0, row(2, "ada")).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { .. }));
        assert_eq!(table.row(0), Some(&row(1, "ada")));
        assert_consistent(&table);
    }

    #[test]
    fn update_out_of_range() {
        let mut table = people();
        let err = table.update(0, row(1, "ada")).unwrap_err();
        assert!(matches!(err, StorageError::RowOutOfRange { .. }));
    }

    #[test]
    fn delete_many_keeps_index_consistent() {
        let mut table = people();
        for id in 0..10 {
            table.insert(row(id, "n")).unwrap();
        }

        let removed = table.delete_many(vec![1, 8, 3, 3, 42]);
        assert_eq!(removed, 3);
        assert_eq!(table.len(), 7);
        assert_consistent(&table);

        for gone in ["1", "3", "8"] {
            assert!(table.find_by_key(&[gone]).is_none());
        }
        for kept in ["0", "2", "4", "5", "6", "7", "9"] {
            assert!(table.find_by_key(&[kept]).is_some());
        }
    }

    #[test]
    fn delete_everything_empties_index() {
        let mut table = people();
        for id in 0..5 {
            table.insert(row(id, "n")).unwrap();
        }
        let all = (0..table.len()).collect();

        assert_eq!(table.delete_many(all), 5);
        assert!(table.is_empty());
        assert_eq!(table.index_len(), 0);
    }

    #[test]
    fn delete_by_key() {
        let mut table = people();
        table.insert(row(1, "ada")).unwrap();
        table.insert(row(2, "grace")).unwrap();
        table.insert(row(3, "alan")).unwrap();

        assert_eq!(table.delete_by_key(&["1"]), Some(row(1, "ada")));
        assert_eq!(table.delete_by_key(&["1"]), None);
        assert_eq!(table.len(), 2);
        assert_consistent(&table);
    }

    #[test]
    fn mixed_mutations_keep_index_consistent() {
        let mut table = people();
        for id in 0..20 {
            table.insert(row(id, "n")).unwrap();
        }
        table.delete_many(vec![0, 5, 19]);
        table.update(3, row(100, "moved")).unwrap();
        table.insert(row(0, "back")).unwrap();
        table.delete_many(vec![table.len() - 1, 2]);
        table.update(0, row(200, "first")).unwrap();

        assert_consistent(&table);
    }
}
