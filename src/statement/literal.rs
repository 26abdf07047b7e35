//! Typing of raw literal text against a column type.
use super::{StatementError, lexer};
use crate::{
    storage::ColumnType,
    value::{Date, Value},
};

/// How strictly quotes are enforced when typing a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Stored values (INSERT, UPDATE SET): text and dates must be quoted and
    /// numbers must not be; an empty quoted string is NULL.
    Required,
    /// Comparison operands (WHERE): quotes are stripped when present.
    Optional,
}

fn invalid(raw: &str, expected: ColumnType) -> StatementError {
    StatementError::InvalidLiteral {
        literal: raw.to_string(),
        expected,
    }
}

/// Converts a raw literal into a value of `column_type`. Unquoted `NULL` in
/// any case is always [`Value::Null`].
pub fn parse_literal(
    raw: &str,
    column_type: ColumnType,
    quoting: Quoting,
) -> Result<Value, StatementError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }

    let inner = match (lexer::unquote(raw), quoting) {
        (Some(inner), Quoting::Optional) => inner,
        (Some(inner), Quoting::Required) if column_type.is_quoted() => inner,
        (Some(_), Quoting::Required) => return Err(invalid(raw, column_type)),
        (None, Quoting::Required) if column_type.is_quoted() => {
            return Err(StatementError::Unquoted(raw.to_string()));
        }
        (None, _) => raw,
    };

    match column_type {
        ColumnType::Int => inner
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| invalid(raw, column_type)),
        ColumnType::Double => inner
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| invalid(raw, column_type)),
        ColumnType::Date => Date::parse(inner)
            .map(Value::Date)
            .ok_or_else(|| invalid(raw, column_type)),
        ColumnType::Varchar if inner.is_empty() && quoting == Quoting::Required => Ok(Value::Null),
        ColumnType::Varchar => Ok(Value::Text(inner.to_string())),
    }
}

/// Types a literal that has no column to guide it, as found on the right
/// side of a HAVING condition: quoted text, `NULL`, integers, then doubles.
pub fn infer_literal(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Some(inner) = lexer::unquote(raw) {
        return Value::Text(inner.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(d) = raw.parse::<f64>() {
        return Value::Double(d);
    }
    Value::Text(raw.to_string())
}

/// Whether `raw` reads as a literal rather than an identifier.
pub fn is_literal(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("null")
        || lexer::unquote(raw).is_some()
        || (raw.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
            && raw.parse::<f64>().is_ok())
}
