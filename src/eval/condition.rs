//! Single-comparison conditions used by WHERE clauses.
use std::{cmp::Ordering, fmt};

use log::debug;

use crate::{
    error::QueryError,
    statement::{
        StatementError, lexer,
        literal::{Quoting, parse_literal},
    },
    storage::{Row, Table},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

/// Probe order when locating the operator. Two-character operators come
/// before `=`, `>` and `<` so they aren't split in half.
const PROBE_ORDER: [(&str, CompareOp); 6] = [
    ("!=", CompareOp::NotEq),
    (">=", CompareOp::GtEq),
    ("<=", CompareOp::LtEq),
    ("=", CompareOp::Eq),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
];

impl CompareOp {
    pub fn apply(&self, left: &Value, right: &Value) -> bool {
        let ord = left.partial_cmp(right);
        match self {
            Self::Eq => ord == Some(Ordering::Equal),
            Self::NotEq => ord != Some(Ordering::Equal),
            Self::Gt => ord == Some(Ordering::Greater),
            Self::Lt => ord == Some(Ordering::Less),
            Self::GtEq => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            Self::LtEq => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Splits `lhs <op> rhs` on the first operator in probe order found outside
/// quotes. Both sides are trimmed.
pub fn split_comparison(s: &str) -> Option<(&str, CompareOp, &str)> {
    PROBE_ORDER.iter().find_map(|(symbol, op)| {
        lexer::find_unquoted(s, symbol, 0)
            .map(|pos| (s[..pos].trim(), *op, s[pos + symbol.len()..].trim()))
    })
}

/// `<column> <op> <literal>` as written in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub literal: String,
}

impl TryFrom<&str> for Condition {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (column, op, literal) = split_comparison(value)
            .ok_or_else(|| StatementError::MissingOperator(value.trim().to_string()))?;

        if column.is_empty() || literal.is_empty() {
            return Err(StatementError::Malformed {
                clause: "WHERE",
                reason: format!("incomplete condition '{}'", value.trim()),
            });
        }

        Ok(Self {
            column: column.to_string(),
            op,
            literal: literal.to_string(),
        })
    }
}

impl Condition {
    /// Resolves the column and types the literal for `table`.
    ///
    /// An unknown column yields [`Predicate::Never`] rather than an error.
    pub fn bind(&self, table: &Table) -> Result<Predicate, QueryError> {
        let Some(ordinal) = table.column_index(&self.column) else {
            debug!(
                "[{}] condition on unknown column '{}' matches nothing",
                table.name(),
                self.column
            );
            return Ok(Predicate::Never);
        };

        let column_type = table.columns()[ordinal].column_type;
        let value = parse_literal(&self.literal, column_type, Quoting::Optional)?;

        Ok(Predicate::Compare {
            ordinal,
            op: self.op,
            value,
        })
    }
}

/// A condition resolved against a table's schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    Never,
    Compare {
        ordinal: usize,
        op: CompareOp,
        value: Value,
    },
}

impl Predicate {
    /// Binds an optional WHERE condition; no condition matches every row.
    pub fn from_condition(
        condition: Option<&Condition>,
        table: &Table,
    ) -> Result<Self, QueryError> {
        match condition {
            Some(condition) => condition.bind(table),
            None => Ok(Self::Always),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Compare { ordinal, op, value } => op.apply(&row[*ordinal], value),
        }
    }

    /// Positions of the rows in `table` that satisfy the predicate.
    pub fn positions(&self, table: &Table) -> Vec<usize> {
        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| self.matches(row))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        storage::{Column, ColumnType},
        value::Date,
    };

    fn table() -> Table {
        let columns = vec![
            Column::new("id", ColumnType::Int).primary_key(),
            Column::new("name", ColumnType::Varchar).with_capacity(20),
            Column::new("gpa", ColumnType::Double),
            Column::new("born", ColumnType::Date),
        ];
        let mut table = Table::new("students", columns, &[] as &[&str]).unwrap();
        let rows = vec![
            (1, "ada", Some(3.9), Date::new(2001, 5, 1)),
            (2, "bob", Some(2.5), Date::new(2000, 1, 9)),
            (3, "cy", None, Date::new(2002, 12, 31)),
        ];
        for (id, name, gpa, born) in rows {
            table
                .insert(vec![
                    Value::Int(id),
                    Value::from(name),
                    gpa.map_or(Value::Null, Value::Double),
                    Value::Date(born),
                ])
                .unwrap();
        }
        table
    }

    fn select(table: &Table, condition: &str) -> Vec<usize> {
        let condition = Condition::try_from(condition).unwrap();
        condition.bind(table).unwrap().positions(table)
    }

    #[test]
    fn operator_probe_order() {
        let inputs = vec![
            ("a != 1", ("a", CompareOp::NotEq, "1")),
            ("a >= 1", ("a", CompareOp::GtEq, "1")),
            ("a<=1", ("a", CompareOp::LtEq, "1")),
            ("a = 1", ("a", CompareOp::Eq, "1")),
            ("a > 1", ("a", CompareOp::Gt, "1")),
            ("a < 1", ("a", CompareOp::Lt, "1")),
            ("name = 'x>=y'", ("name", CompareOp::Eq, "'x>=y'")),
        ];

        for (raw, expected) in inputs {
            assert_eq!(split_comparison(raw), Some(expected), "{raw}");
        }
        assert_eq!(split_comparison("name 'a=b'"), None);
    }

    #[test]
    fn compares_by_column_type() {
        let table = table();
        assert_eq!(select(&table, "id = 2"), vec![1]);
        assert_eq!(select(&table, "id != 2"), vec![0, 2]);
        assert_eq!(select(&table, "gpa > 3.0"), vec![0]);
        assert_eq!(select(&table, "gpa >= 2.5"), vec![0, 1]);
        assert_eq!(select(&table, "name = 'bob'"), vec![1]);
        assert_eq!(select(&table, "name <= \"bob\""), vec![0, 1]);
        assert_eq!(select(&table, "born < '2001-01-01'"), vec![1]);
        assert_eq!(select(&table, "born >= 2001-05-01"), vec![0, 2]);
    }

    #[test]
    fn nulls_order_first() {
        let table = table();
        assert_eq!(select(&table, "gpa = NULL"), vec![2]);
        assert_eq!(select(&table, "gpa < 1.0"), vec![2]);
        assert_eq!(select(&table, "gpa != NULL"), vec![0, 1]);
    }

    #[test]
    fn unknown_column_matches_nothing() {
        let table = table();
        assert!(select(&table, "missing = 1").is_empty());
        assert!(select(&table, "Name = 'ada'").is_empty());
    }

    #[test]
    fn bad_literal_is_a_syntax_error() {
        let table = table();
        let condition = Condition::try_from("id = abc").unwrap();
        let err = condition.bind(&table).unwrap_err();
        assert!(matches!(err, QueryError::Syntax(StatementError::InvalidLiteral { .. })));
    }

    #[test]
    fn malformed_conditions() {
        assert_eq!(
            Condition::try_from("id 5").unwrap_err(),
            StatementError::MissingOperator("id 5".into())
        );
        assert!(Condition::try_from("= 5").is_err());
        assert!(Condition::try_from("id =").is_err());
    }
}
