use log::trace;

use super::{StatementError, expect_keyword, lexer, literal::is_literal, table_name_at};
use crate::eval::{ArithOp, Condition};

/// Left side of a SET arithmetic expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(String),
    Literal(String),
}

/// Right-hand side of one assignment. Literals stay raw until they are typed
/// against the target column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetExpr {
    Value(String),
    Binary {
        left: Operand,
        op: ArithOp,
        right: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub column: String,
    pub expr: SetExpr,
}

/// Whether the sign at `at` is the exponent sign of a number such as `1e-3`.
fn is_exponent_sign(s: &str, at: usize) -> bool {
    let before = &s[..at];
    before
        .strip_suffix(['e', 'E'])
        .is_some_and(|mantissa| !mantissa.is_empty() && mantissa.trim().parse::<f64>().is_ok())
}

/// Offset of the first arithmetic operator outside quotes. A sign at the
/// very start belongs to the literal.
fn find_operator(s: &str) -> Option<(usize, ArithOp)> {
    let mut quoted: Option<char> = None;

    for (i, c) in s.char_indices() {
        match quoted {
            Some(q) if c == q => quoted = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quoted = Some(c),
            None if i == 0 => {}
            None if matches!(c, '+' | '-') && is_exponent_sign(s, i) => {}
            None => {
                if let Some(op) = ArithOp::from_symbol(c) {
                    return Some((i, op));
                }
            }
        }
    }
    None
}

impl TryFrom<&str> for Assignment {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let part = value.trim();
        let invalid = || StatementError::InvalidAssignment(part.to_string());

        // `col += 5` and friends.
        for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div] {
            let compound = format!("{}=", op.symbol());
            if let Some(pos) = lexer::find_unquoted(part, &compound, 0) {
                let column = part[..pos].trim();
                let right = part[pos + compound.len()..].trim();
                if column.is_empty() || !is_literal(right) {
                    return Err(invalid());
                }
                return Ok(Self {
                    column: column.to_string(),
                    expr: SetExpr::Binary {
                        left: Operand::Column(column.to_string()),
                        op,
                        right: right.to_string(),
                    },
                });
            }
        }

        let eq = lexer::find_unquoted(part, "=", 0).ok_or_else(invalid)?;
        let column = part[..eq].trim();
        let expr = part[eq + 1..].trim();
        if column.is_empty() || expr.is_empty() {
            return Err(invalid());
        }

        let expr = match find_operator(expr) {
            None => SetExpr::Value(expr.to_string()),
            Some((pos, op)) => {
                let left = expr[..pos].trim();
                let right = expr[pos + 1..].trim();
                if !is_literal(right) {
                    return Err(invalid());
                }
                let left = if is_literal(left) {
                    Operand::Literal(left.to_string())
                } else {
                    Operand::Column(left.to_string())
                };
                SetExpr::Binary {
                    left,
                    op,
                    right: right.to_string(),
                }
            }
        };

        Ok(Self {
            column: column.to_string(),
            expr,
        })
    }
}

/// `UPDATE name SET assignments [WHERE cond]`
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Condition>,
}

impl TryFrom<&str> for Update {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = lexer::strip_terminator(value);
        if !lexer::is_balanced(s) {
            return Err(StatementError::Unbalanced);
        }

        let pos = expect_keyword(s, 0, "update")?;
        let (table, pos) = table_name_at(s, pos)?;
        let pos = expect_keyword(s, pos, "set")?;

        let (set, selection) = match lexer::find_keyword(s, "where", pos) {
            Some(at) => {
                let condition = s[at + "where".len()..].trim();
                if condition.is_empty() {
                    return Err(StatementError::Malformed {
                        clause: "WHERE",
                        reason: "clause is empty".to_string(),
                    });
                }
                (&s[pos..at], Some(condition.try_into()?))
            }
            None => (&s[pos..], None),
        };

        let parts = lexer::split_commas(set);
        if parts.is_empty() {
            return Err(StatementError::EmptyList("SET list"));
        }
        let assignments = parts
            .iter()
            .map(|part| Assignment::try_from(part.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let update = Update {
            table: table.to_string(),
            assignments,
            selection,
        };
        trace!("parsed update: {update:?}");
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(s: &str) -> Assignment {
        s.try_into().unwrap()
    }

    #[test]
    fn plain_values() {
        assert_eq!(
            assignment("name = 'a = b + c'"),
            Assignment {
                column: "name".into(),
                expr: SetExpr::Value("'a = b + c'".into()),
            }
        );
        assert_eq!(assignment("age=-5").expr, SetExpr::Value("-5".into()));
        assert_eq!(assignment("x = 1e-3").expr, SetExpr::Value("1e-3".into()));
        assert_eq!(
            assignment("born = '2025-01-01'").expr,
            SetExpr::Value("'2025-01-01'".into())
        );
    }

    #[test]
    fn arithmetic() {
        let inputs = vec![
            ("salary = salary * 1.1", Operand::Column("salary".into()), ArithOp::Mul, "1.1"),
            ("id = id + 1", Operand::Column("id".into()), ArithOp::Add, "1"),
            ("n = 10 / -2", Operand::Literal("10".into()), ArithOp::Div, "-2"),
            ("n = -3 - 4", Operand::Literal("-3".into()), ArithOp::Sub, "4"),
            ("n += 2", Operand::Column("n".into()), ArithOp::Add, "2"),
            ("n /= 4", Operand::Column("n".into()), ArithOp::Div, "4"),
        ];

        for (raw, left, op, right) in inputs {
            assert_eq!(
                assignment(raw).expr,
                SetExpr::Binary {
                    left,
                    op,
                    right: right.into()
                },
                "{raw}"
            );
        }
    }

    #[test]
    fn statement() {
        let update: Update = "UPDATE users SET age = 31, name = 'Al' WHERE id = 1;"
            .try_into()
            .unwrap();

        assert_eq!(update.table, "users");
        assert_eq!(update.assignments.len(), 2);
        assert_eq!(update.assignments[1].column, "name");
        assert_eq!(update.selection.unwrap().column, "id");

        let update: Update = "update t set a = 1".try_into().unwrap();
        assert_eq!(update.selection, None);
    }

    #[test]
    fn syntax_errors() {
        let inputs = vec![
            ("update t a = 1", StatementError::MissingKeyword("set")),
            ("update set a = 1", StatementError::MissingKeyword("set")),
            ("update t set", StatementError::EmptyList("SET list")),
            ("update t set a", StatementError::InvalidAssignment("a".into())),
            ("update t set = 1", StatementError::InvalidAssignment("= 1".into())),
            ("update t set a = b + c", StatementError::InvalidAssignment("a = b + c".into())),
            ("update t set a = 1 where id", StatementError::MissingOperator("id".into())),
        ];

        for (sql, expected) in inputs {
            assert_eq!(Update::try_from(sql).unwrap_err(), expected, "{sql}");
        }
    }
}
