//! Results of executing a statement and their human-readable rendering.
use std::fmt;

use crate::value::Value;

/// Rows produced by a SELECT, with one header per projected column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the named result column, top to bottom.
    pub fn column(&self, header: &str) -> Option<Vec<&Value>> {
        let i = self.columns.iter().position(|c| c == header)?;
        Some(self.rows.iter().map(|row| &row[i]).collect())
    }
}

fn write_line<T: fmt::Display>(f: &mut fmt::Formatter<'_>, cells: &[T]) -> fmt::Result {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            f.write_str(" | ")?;
        }
        write!(f, "{cell}")?;
    }
    writeln!(f)
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(f, &self.columns)?;
        for row in self.rows.iter() {
            write_line(f, row)?;
        }
        write!(f, "\n{} row(s) returned", self.rows.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Created(String),
    Inserted(usize),
    Updated(usize),
    Deleted(usize),
    Rows(ResultSet),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Created(table) => write!(f, "Table '{table}' created"),
            Output::Inserted(1) => write!(f, "1 row inserted"),
            Output::Inserted(n) => write!(f, "{n} rows inserted"),
            Output::Updated(n) => write!(f, "{n} row(s) updated"),
            Output::Deleted(n) => write!(f, "{n} row(s) deleted"),
            Output::Rows(rows) => write!(f, "{rows}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let inputs = vec![
            (Output::Created("users".into()), "Table 'users' created"),
            (Output::Inserted(1), "1 row inserted"),
            (Output::Updated(0), "0 row(s) updated"),
            (Output::Deleted(3), "3 row(s) deleted"),
        ];

        for (output, expected) in inputs {
            assert_eq!(output.to_string(), expected);
        }
    }

    #[test]
    fn result_set() {
        let mut rows = ResultSet::new(vec!["id".into(), "gpa".into()]);
        rows.rows.push(vec![Value::Int(1), Value::Double(3.5)]);
        rows.rows.push(vec![Value::Int(2), Value::Null]);

        assert_eq!(
            Output::Rows(rows.clone()).to_string(),
            "id | gpa\n1 | 3.50\n2 | NULL\n\n2 row(s) returned"
        );
        assert_eq!(rows.column("id"), Some(vec![&Value::Int(1), &Value::Int(2)]));
        assert_eq!(rows.column("name"), None);
    }
}
