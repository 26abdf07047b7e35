use log::trace;

use super::{StatementError, expect_keyword, lexer, table_name_at};
use crate::eval::{AggregateCall, Condition, Having};

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Column(String),
    Aggregate(AggregateCall),
}

impl SelectItem {
    /// Result column header: the column name, or the call as written.
    pub fn header(&self) -> &str {
        match self {
            Self::Column(name) => name,
            Self::Aggregate(call) => &call.text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Star,
    Items(Vec<SelectItem>),
}

impl Projection {
    pub fn has_aggregate(&self) -> bool {
        match self {
            Self::Star => false,
            Self::Items(items) => items
                .iter()
                .any(|item| matches!(item, SelectItem::Aggregate(_))),
        }
    }
}

/// `SELECT list FROM name [WHERE cond] [GROUP BY cols] [HAVING cond]`
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub projection: Projection,
    pub selection: Option<Condition>,
    pub group_by: Vec<String>,
    pub having: Option<Having>,
}

impl Select {
    /// Whether rows are folded into groups: GROUP BY or any aggregate.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
            || self.projection.has_aggregate()
            || self.having.as_ref().is_some_and(Having::has_aggregate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Clause {
    Where,
    GroupBy,
    Having,
}

impl Clause {
    fn name(&self) -> &'static str {
        match self {
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
        }
    }
}

/// Finds the optional trailing clauses after `from`, returning each clause
/// with the offsets of its keyword and its body, ordered by position.
fn locate_clauses(s: &str, from: usize) -> Vec<(Clause, usize, usize)> {
    let mut clauses: Vec<(Clause, usize, usize)> = [
        lexer::find_keyword(s, "where", from).map(|p| (Clause::Where, p, p + "where".len())),
        lexer::find_phrase(s, &["group", "by"], from).map(|(p, end)| (Clause::GroupBy, p, end)),
        lexer::find_keyword(s, "having", from).map(|p| (Clause::Having, p, p + "having".len())),
    ]
    .into_iter()
    .flatten()
    .collect();

    clauses.sort_by_key(|(_, start, _)| *start);
    clauses
}

fn parse_projection(list: &str) -> Result<Projection, StatementError> {
    if list == "*" {
        return Ok(Projection::Star);
    }

    let mut items = Vec::new();
    for item in lexer::split_commas(list) {
        if item.is_empty() {
            return Err(StatementError::EmptyList("select list"));
        }
        match AggregateCall::parse(&item)? {
            Some(call) => items.push(SelectItem::Aggregate(call)),
            None => items.push(SelectItem::Column(item)),
        }
    }
    Ok(Projection::Items(items))
}

impl TryFrom<&str> for Select {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = lexer::strip_terminator(value);
        if !lexer::is_balanced(s) {
            return Err(StatementError::Unbalanced);
        }

        let pos = expect_keyword(s, 0, "select")?;
        let from = lexer::find_keyword(s, "from", pos).ok_or(StatementError::MissingKeyword("from"))?;

        let list = s[pos..from].trim();
        if list.is_empty() {
            return Err(StatementError::EmptyList("select list"));
        }
        let projection = parse_projection(list)?;

        let (table, pos) = table_name_at(s, from + "from".len())?;

        let clauses = locate_clauses(s, pos);
        let first = clauses.first().map_or(s.len(), |(_, start, _)| *start);
        if !s[pos..first].trim().is_empty() {
            return Err(StatementError::Malformed {
                clause: "FROM",
                reason: format!("unexpected '{}' after table name", s[pos..first].trim()),
            });
        }

        let mut select = Select {
            table: table.to_string(),
            projection,
            selection: None,
            group_by: Vec::new(),
            having: None,
        };

        for (i, (clause, _, body_start)) in clauses.iter().enumerate() {
            if i > 0 && clauses[i - 1].0 >= *clause {
                return Err(StatementError::Malformed {
                    clause: clause.name(),
                    reason: "clause is out of order".to_string(),
                });
            }

            let end = clauses.get(i + 1).map_or(s.len(), |(_, start, _)| *start);
            let body = s[*body_start..end].trim();
            if body.is_empty() {
                return Err(StatementError::Malformed {
                    clause: clause.name(),
                    reason: "clause is empty".to_string(),
                });
            }

            match clause {
                Clause::Where => select.selection = Some(body.try_into()?),
                Clause::GroupBy => {
                    select.group_by = lexer::split_commas(body);
                    if select.group_by.iter().any(String::is_empty) {
                        return Err(StatementError::EmptyList("group by list"));
                    }
                }
                Clause::Having => select.having = Some(body.try_into()?),
            }
        }

        if select.having.is_some() && !select.is_grouped() {
            return Err(StatementError::Malformed {
                clause: "HAVING",
                reason: "requires GROUP BY or an aggregate".to_string(),
            });
        }

        trace!("parsed select: {select:?}");
        Ok(select)
    }
}
