use log::trace;

use super::{StatementError, expect_keyword, lexer, table_name_at};

/// `INSERT INTO name VALUES ( literals )`
///
/// Values are kept as raw literal text; they are typed against the target
/// table's columns at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<String>,
}

impl TryFrom<&str> for Insert {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = lexer::strip_terminator(value);
        if !lexer::is_balanced(s) {
            return Err(StatementError::Unbalanced);
        }

        let pos = expect_keyword(s, 0, "insert")?;
        let pos = expect_keyword(s, pos, "into")?;
        let (table, pos) = table_name_at(s, pos)?;
        let pos = expect_keyword(s, pos, "values")?;

        let (open, close) =
            lexer::top_level_parens(&s[pos..]).ok_or(StatementError::MissingParens("value list"))?;
        if !s[pos + close + 1..].trim().is_empty() {
            return Err(StatementError::Malformed {
                clause: "VALUES",
                reason: format!("unexpected '{}' after value list", s[pos + close + 1..].trim()),
            });
        }

        let values = lexer::split_commas(&s[pos + open + 1..pos + close]);
        if values.is_empty() {
            return Err(StatementError::EmptyList("value list"));
        }

        let insert = Insert {
            table: table.to_string(),
            values,
        };
        trace!("parsed insert: {insert:?}");
        Ok(insert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values() {
        let insert: Insert = "INSERT INTO users VALUES (1, 'Ahmed, Ali', \"x\", NULL, 2.5);"
            .try_into()
            .unwrap();

        assert_eq!(insert.table, "users");
        assert_eq!(insert.values, vec!["1", "'Ahmed, Ali'", "\"x\"", "NULL", "2.5"]);
    }

    #[test]
    fn no_space_before_parens() {
        let insert: Insert = "insert into t values(1,2)".try_into().unwrap();
        assert_eq!(insert.values, vec!["1", "2"]);
    }

    #[test]
    fn syntax_errors() {
        let inputs = vec![
            ("insert t values (1)", StatementError::MissingKeyword("into")),
            ("insert into t (1)", StatementError::MissingKeyword("values")),
            ("insert into t values 1, 2", StatementError::MissingParens("value list")),
            ("insert into t values (1, 'a)", StatementError::Unbalanced),
            ("insert into t values ()", StatementError::EmptyList("value list")),
        ];

        for (sql, expected) in inputs {
            assert_eq!(Insert::try_from(sql).unwrap_err(), expected, "{sql}");
        }
    }
}
