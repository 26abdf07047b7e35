//! SQL-like statement parsing.
//!
//! Each statement kind has its own module holding the parsed form and its
//! [`TryFrom<&str>`] parser. [`Statement`] dispatches on the leading keyword.
//!
//! Parsing is purely syntactic; names are resolved against the catalog when
//! the statement is executed by [`Database`](crate::Database).
//!
//! # Example
//! ```rust
//! use minidb::statement::Statement;
//!
//! let stmt: Statement = "select * from users where id = 1;".try_into().unwrap();
//! assert!(matches!(stmt, Statement::Select(ref s) if s.table == "users"));
//! ```
pub mod create;
pub mod delete;
pub mod insert;
pub mod lexer;
pub mod literal;
pub mod select;
pub mod update;

use thiserror::Error;

pub use create::CreateTable;
pub use delete::Delete;
pub use insert::Insert;
pub use select::{Projection, Select, SelectItem};
pub use update::{Assignment, Operand, SetExpr, Update};

use crate::storage::ColumnType;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatementError {
    #[error("empty statement")]
    Empty,

    #[error("unsupported statement '{0}'")]
    Unsupported(String),

    #[error("expected keyword '{0}'")]
    MissingKeyword(&'static str),

    #[error("missing table name")]
    MissingTableName,

    #[error("invalid table name '{0}': use letters, digits and '_', not starting with a digit")]
    InvalidTableName(String),

    #[error("unbalanced parentheses or quotes")]
    Unbalanced,

    #[error("missing parenthesized {0}")]
    MissingParens(&'static str),

    #[error("empty {0}")]
    EmptyList(&'static str),

    #[error("invalid column definition '{0}'")]
    InvalidColumn(String),

    #[error("unsupported column type '{0}'")]
    UnknownType(String),

    #[error("condition '{0}' has no comparison operator")]
    MissingOperator(String),

    #[error("value {0} must be enclosed in single or double quotes")]
    Unquoted(String),

    #[error("value {literal} is not a valid {expected}")]
    InvalidLiteral {
        literal: String,
        expected: ColumnType,
    },

    #[error("invalid assignment '{0}'")]
    InvalidAssignment(String),

    #[error("invalid {clause} clause: {reason}")]
    Malformed {
        clause: &'static str,
        reason: String,
    },
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Create(CreateTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    /// Parses one statement. Keywords are matched case-insensitively and a
    /// trailing `;` is optional.
    pub fn parse(sql: &str) -> Result<Self, StatementError> {
        sql.try_into()
    }
}

impl TryFrom<&str> for Statement {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = lexer::strip_terminator(value);
        if s.is_empty() {
            return Err(StatementError::Empty);
        }

        match s.split_whitespace().next().map(str::to_lowercase).as_deref() {
            Some("create") => Ok(Statement::Create(s.try_into()?)),
            Some("insert") => Ok(Statement::Insert(s.try_into()?)),
            Some("select") => Ok(Statement::Select(s.try_into()?)),
            Some("update") => Ok(Statement::Update(s.try_into()?)),
            Some("delete") => Ok(Statement::Delete(s.try_into()?)),
            _ => Err(StatementError::Unsupported(s.to_string())),
        }
    }
}

/// Reads the identifier that starts at byte `from`, skipping leading
/// whitespace. Returns the identifier and the offset just past it.
pub(crate) fn identifier_at(s: &str, from: usize) -> Option<(&str, usize)> {
    let rest = &s[from..];
    let start = from + (rest.len() - rest.trim_start().len());
    let len = s[start..]
        .find(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .unwrap_or(s.len() - start);

    if len == 0 {
        return None;
    }
    Some((&s[start..start + len], start + len))
}

/// Whether `name` is a plain identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reads a table name at `from`. Table names become directory names under
/// the data root, so only plain identifiers are accepted.
pub(crate) fn table_name_at(s: &str, from: usize) -> Result<(&str, usize), StatementError> {
    let (name, pos) = identifier_at(s, from).ok_or(StatementError::MissingTableName)?;
    if !is_identifier(name) {
        return Err(StatementError::InvalidTableName(name.to_string()));
    }
    Ok((name, pos))
}

/// Consumes `keyword` (case-insensitively, as a whole word) after optional
/// whitespace, returning the offset just past it.
pub(crate) fn expect_keyword(
    s: &str,
    from: usize,
    keyword: &'static str,
) -> Result<usize, StatementError> {
    let rest = &s[from..];
    let start = from + (rest.len() - rest.trim_start().len());

    if lexer::find_keyword(s, keyword, start) == Some(start) {
        Ok(start + keyword.len())
    } else {
        Err(StatementError::MissingKeyword(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "Unsupported")]
    fn unsupported_statement() {
        let _: Statement = "drop table users".try_into().unwrap();
    }

    #[test]
    #[should_panic(expected = "Empty")]
    fn empty_statement() {
        let _: Statement = "  ;".try_into().unwrap();
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let inputs = vec![
            "CREATE TABLE t (id INT)",
            "Insert Into t Values (1)",
            "sElEcT * FrOm t",
            "UPDATE t SET id = 2",
            "delete from t;",
        ];

        let kinds: Vec<&str> = inputs
            .into_iter()
            .map(|sql| match Statement::parse(sql).unwrap() {
                Statement::Create(_) => "create",
                Statement::Insert(_) => "insert",
                Statement::Select(_) => "select",
                Statement::Update(_) => "update",
                Statement::Delete(_) => "delete",
            })
            .collect();
        assert_eq!(kinds, vec!["create", "insert", "select", "update", "delete"]);
    }

    #[test]
    fn identifiers() {
        assert_eq!(identifier_at("from  users where", 4), Some(("users", 11)));
        assert_eq!(identifier_at("table t(id int)", 5), Some(("t", 7)));
        assert_eq!(identifier_at("from   ", 4), None);
    }

    #[test]
    fn table_names() {
        let inputs = vec![
            ("users", true),
            ("_tmp2", true),
            ("Order_Items", true),
            ("../escape", false),
            ("a/b", false),
            ("..", false),
            ("2fast", false),
            ("na-me", false),
            ("'users'", false),
        ];

        for (name, expected) in inputs {
            assert_eq!(is_identifier(name), expected, "{name}");
        }
    }

    #[test]
    fn statements_reject_path_like_table_names() {
        let inputs = vec![
            ("CREATE TABLE ../escape (id INT)", "../escape"),
            ("create table a/b (id int)", "a/b"),
            ("INSERT INTO ../t VALUES (1)", "../t"),
            ("SELECT * FROM /etc/t", "/etc/t"),
            ("UPDATE a.b SET x = 1", "a.b"),
            ("DELETE FROM ..", ".."),
        ];

        for (sql, name) in inputs {
            assert_eq!(
                Statement::parse(sql),
                Err(StatementError::InvalidTableName(name.to_string())),
                "{sql}"
            );
        }
    }

    #[test]
    fn keywords() {
        assert_eq!(expect_keyword("insert  INTO t", 6, "into"), Ok(12));
        assert_eq!(
            expect_keyword("insert intot", 6, "into"),
            Err(StatementError::MissingKeyword("into"))
        );
    }
}
