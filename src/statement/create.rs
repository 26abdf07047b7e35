use log::trace;

use super::{StatementError, expect_keyword, lexer, table_name_at};
use crate::storage::{Column, ColumnType};

/// Capacity given to a `TEXT` column declared without a length.
pub const TEXT_DEFAULT_CAPACITY: usize = 255;

/// `CREATE TABLE name ( defs [, PRIMARY KEY (cols)] )`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<Column>,
    /// Composite key clause. Empty when the key comes from per-column
    /// `PRIMARY KEY` markers.
    pub primary_key: Vec<String>,
}

impl CreateTable {
    /// Key column names for the table: the composite clause when present,
    /// otherwise the columns marked `PRIMARY KEY`.
    pub fn key_columns(&self) -> Vec<String> {
        if !self.primary_key.is_empty() {
            return self.primary_key.clone();
        }
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Splits `varchar(50)` into `("varchar", Some("50"))`.
fn split_type(token: &str) -> Result<(&str, Option<&str>), StatementError> {
    match token.find('(') {
        None => Ok((token, None)),
        Some(open) => {
            let close = token
                .rfind(')')
                .filter(|&close| close > open)
                .ok_or(StatementError::Unbalanced)?;
            Ok((&token[..open], Some(token[open + 1..close].trim())))
        }
    }
}

fn parse_column(def: &str) -> Result<Column, StatementError> {
    let tokens = lexer::split_whitespace(def);
    if tokens.len() < 2 {
        return Err(StatementError::InvalidColumn(def.to_string()));
    }

    // `price DOUBLE` and `name VARCHAR (20)` are both accepted.
    let mut type_token = tokens[1].clone();
    let mut rest = 2;
    if !type_token.contains('(') && tokens.get(2).is_some_and(|t| t.starts_with('(')) {
        type_token.push_str(&tokens[2]);
        rest = 3;
    }

    let (base, length) = split_type(&type_token)?;
    let column_type: ColumnType = base
        .parse()
        .map_err(|_| StatementError::UnknownType(base.to_string()))?;

    let base = base.to_uppercase();
    let capacity = match length {
        Some(n) => n
            .parse::<usize>()
            .map_err(|_| StatementError::InvalidColumn(def.to_string()))?,
        None if base == "TEXT" => TEXT_DEFAULT_CAPACITY,
        None => 1,
    };

    let mut column = Column::new(tokens[0].as_str(), column_type).with_capacity(capacity);
    if base == "CHAR" {
        column = column.fixed_width();
    }

    let modifiers: Vec<String> = tokens[rest..].iter().map(|t| t.to_lowercase()).collect();
    let mut i = 0;
    while i < modifiers.len() {
        match (modifiers[i].as_str(), modifiers.get(i + 1).map(String::as_str)) {
            ("primary", Some("key")) => {
                column = column.primary_key();
                i += 2;
            }
            ("not", Some("null")) => {
                column = column.not_null();
                i += 2;
            }
            _ => return Err(StatementError::InvalidColumn(def.to_string())),
        }
    }

    Ok(column)
}

impl TryFrom<&str> for CreateTable {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = lexer::strip_terminator(value);
        if !lexer::is_balanced(s) {
            return Err(StatementError::Unbalanced);
        }

        let pos = expect_keyword(s, 0, "create")?;
        let pos = expect_keyword(s, pos, "table")?;
        let (name, pos) = table_name_at(s, pos)?;

        let (open, close) =
            lexer::top_level_parens(&s[pos..]).ok_or(StatementError::MissingParens("column list"))?;
        if !s[pos..pos + open].trim().is_empty() {
            return Err(StatementError::Malformed {
                clause: "CREATE TABLE",
                reason: format!("unexpected '{}' before column list", s[pos..pos + open].trim()),
            });
        }
        if !s[pos + close + 1..].trim().is_empty() {
            return Err(StatementError::Malformed {
                clause: "CREATE TABLE",
                reason: format!("unexpected '{}' after column list", s[pos + close + 1..].trim()),
            });
        }

        let defs = lexer::split_commas(&s[pos + open + 1..pos + close]);
        if defs.is_empty() {
            return Err(StatementError::EmptyList("column list"));
        }

        let mut columns = Vec::new();
        let mut primary_key = Vec::new();

        for def in defs.iter() {
            if def.is_empty() {
                return Err(StatementError::InvalidColumn(def.clone()));
            }

            if let Some((_, end)) = lexer::find_phrase(def, &["primary", "key"], 0)
                .filter(|(start, _)| *start == 0)
            {
                let (k_open, k_close) = lexer::top_level_parens(&def[end..])
                    .ok_or(StatementError::MissingParens("primary key list"))?;
                primary_key = lexer::split_commas(&def[end + k_open + 1..end + k_close]);
                if primary_key.is_empty() {
                    return Err(StatementError::EmptyList("primary key list"));
                }
                continue;
            }

            columns.push(parse_column(def)?);
        }

        if columns.is_empty() {
            return Err(StatementError::EmptyList("column list"));
        }

        let create = CreateTable {
            name: name.to_string(),
            columns,
            primary_key,
        };
        trace!("parsed create: {create:?}");
        Ok(create)
    }
}
