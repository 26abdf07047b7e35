use log::trace;

use super::{StatementError, expect_keyword, lexer, table_name_at};
use crate::eval::Condition;

/// `DELETE FROM name [WHERE cond]`. Without a condition every row goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub selection: Option<Condition>,
}

impl TryFrom<&str> for Delete {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = lexer::strip_terminator(value);
        if !lexer::is_balanced(s) {
            return Err(StatementError::Unbalanced);
        }

        let pos = expect_keyword(s, 0, "delete")?;
        let pos = expect_keyword(s, pos, "from")?;
        let (table, pos) = table_name_at(s, pos)?;

        let selection = if s[pos..].trim().is_empty() {
            None
        } else {
            let pos = expect_keyword(s, pos, "where")?;
            let condition = s[pos..].trim();
            if condition.is_empty() {
                return Err(StatementError::Malformed {
                    clause: "WHERE",
                    reason: "clause is empty".to_string(),
                });
            }
            Some(condition.try_into()?)
        };

        let delete = Delete {
            table: table.to_string(),
            selection,
        };
        trace!("parsed delete: {delete:?}");
        Ok(delete)
    }
}
