//! GROUP BY partitioning and HAVING filters.
use std::collections::HashMap;

use log::debug;

use super::{
    aggregate::{AggregateCall, AggregateFn, BoundAggregate},
    condition::{CompareOp, split_comparison},
};
use crate::{
    error::QueryError,
    statement::{
        StatementError,
        literal::{Quoting, infer_literal, is_literal, parse_literal},
    },
    storage::{ColumnType, Row, Table},
    value::{Date, Value},
};

/// Exact identity of a grouping value: the type tag and, for doubles, the
/// full bit pattern, so values that print alike stay apart.
#[derive(Debug, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Int(i64),
    Double(u64),
    Char(char),
    Date(Date),
    Text(String),
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Int(i) => Self::Int(*i),
            // -0.0 and 0.0 compare equal
            Value::Double(d) if *d == 0.0 => Self::Double(0),
            Value::Double(d) => Self::Double(d.to_bits()),
            Value::Char(c) => Self::Char(*c),
            Value::Date(d) => Self::Date(*d),
            Value::Text(s) => Self::Text(s.clone()),
        }
    }
}

/// Splits `rows` into groups of identical values at `ordinals`, in order of
/// first appearance. Rows keep their relative order inside a group.
pub fn partition<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    ordinals: &[usize],
) -> Vec<Vec<&'a Row>> {
    let mut slots: HashMap<Vec<GroupKey>, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Row>> = Vec::new();

    for row in rows {
        let key: Vec<GroupKey> = ordinals.iter().map(|&i| GroupKey::from(&row[i])).collect();
        match slots.get(&key) {
            Some(&slot) => groups[slot].push(row),
            None => {
                slots.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }
    groups
}

/// One side of a HAVING comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HavingOperand {
    Aggregate(AggregateCall),
    Column(String),
    Literal(String),
}

impl TryFrom<&str> for HavingOperand {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(StatementError::Malformed {
                clause: "HAVING",
                reason: "missing operand".to_string(),
            });
        }

        if let Some(call) = AggregateCall::parse(value)? {
            return Ok(Self::Aggregate(call));
        }
        if is_literal(value) {
            return Ok(Self::Literal(value.to_string()));
        }
        Ok(Self::Column(value.to_string()))
    }
}

/// `<operand> <op> <operand>`, evaluated once per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Having {
    pub left: HavingOperand,
    pub op: CompareOp,
    pub right: HavingOperand,
}

impl TryFrom<&str> for Having {
    type Error = StatementError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (left, op, right) = split_comparison(value)
            .ok_or_else(|| StatementError::MissingOperator(value.trim().to_string()))?;

        Ok(Self {
            left: left.try_into()?,
            op,
            right: right.try_into()?,
        })
    }
}

impl Having {
    pub fn has_aggregate(&self) -> bool {
        matches!(self.left, HavingOperand::Aggregate(_))
            || matches!(self.right, HavingOperand::Aggregate(_))
    }

    /// Resolves both sides against `table`. A literal facing a column, or a
    /// MIN/MAX over one, is typed like that column; other literals are
    /// inferred from their spelling.
    pub fn bind(&self, table: &Table) -> Result<BoundHaving, QueryError> {
        let left = bind_side(&self.left, &self.right, table)?;
        let right = bind_side(&self.right, &self.left, table)?;
        Ok(BoundHaving {
            left,
            op: self.op,
            right,
        })
    }
}

fn type_hint(operand: &HavingOperand, table: &Table) -> Result<Option<ColumnType>, QueryError> {
    let ordinal = match operand {
        HavingOperand::Column(name) => table.column_index(name),
        HavingOperand::Aggregate(call) => match call.bind(table)? {
            BoundAggregate {
                func: AggregateFn::Min | AggregateFn::Max,
                ordinal,
            } => ordinal,
            _ => None,
        },
        HavingOperand::Literal(_) => None,
    };
    Ok(ordinal.map(|i| table.columns()[i].column_type))
}

fn bind_side(
    operand: &HavingOperand,
    other: &HavingOperand,
    table: &Table,
) -> Result<Option<BoundOperand>, QueryError> {
    let bound = match operand {
        HavingOperand::Aggregate(call) => BoundOperand::Aggregate(call.bind(table)?),
        HavingOperand::Column(name) => match table.column_index(name) {
            Some(ordinal) => BoundOperand::Column(ordinal),
            None => {
                debug!("[{}] HAVING on unknown column '{name}' matches nothing", table.name());
                return Ok(None);
            }
        },
        HavingOperand::Literal(raw) => match type_hint(other, table)? {
            Some(column_type) => {
                BoundOperand::Literal(parse_literal(raw, column_type, Quoting::Optional)?)
            }
            None => BoundOperand::Literal(infer_literal(raw)),
        },
    };
    Ok(Some(bound))
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundOperand {
    Aggregate(BoundAggregate),
    /// Value of the column in the group's first row.
    Column(usize),
    Literal(Value),
}

impl BoundOperand {
    fn evaluate(&self, group: &[&Row]) -> Value {
        match self {
            Self::Aggregate(aggregate) => aggregate.compute(group),
            Self::Column(ordinal) => group
                .first()
                .map_or(Value::Null, |row| row[*ordinal].clone()),
            Self::Literal(value) => value.clone(),
        }
    }
}

/// A HAVING clause resolved against a table. A side that names an unknown
/// column is `None` and makes the filter reject every group.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundHaving {
    left: Option<BoundOperand>,
    op: CompareOp,
    right: Option<BoundOperand>,
}

impl BoundHaving {
    pub fn matches(&self, group: &[&Row]) -> bool {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => self
                .op
                .apply(&left.evaluate(group), &right.evaluate(group)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Column;

    fn employees() -> Table {
        let columns = vec![
            Column::new("name", ColumnType::Varchar).with_capacity(20),
            Column::new("department", ColumnType::Varchar).with_capacity(20),
            Column::new("salary", ColumnType::Int),
        ];
        let mut table = Table::new("employees", columns, &[] as &[&str]).unwrap();
        let rows = vec![
            ("Alice", "Engineering", 80000),
            ("Bob", "Engineering", 70000),
            ("Carol", "Sales", 50000),
            ("Dan", "Sales", 60000),
            ("Eve", "HR", 45000),
        ];
        for (name, dept, salary) in rows {
            table
                .insert(vec![Value::from(name), Value::from(dept), Value::Int(salary)])
                .unwrap();
        }
        table
    }

    fn surviving(table: &Table, having: &str) -> Vec<String> {
        let having = Having::try_from(having).unwrap().bind(table).unwrap();
        partition(table.rows(), &[1])
            .into_iter()
            .filter(|group| having.matches(group))
            .map(|group| group[0][1].to_string())
            .collect()
    }

    #[test]
    fn groups_in_first_appearance_order() {
        let table = employees();
        let groups = partition(table.rows(), &[1]);
        let sizes: Vec<(String, usize)> = groups
            .iter()
            .map(|g| (g[0][1].to_string(), g.len()))
            .collect();

        assert_eq!(
            sizes,
            vec![
                ("Engineering".to_string(), 2),
                ("Sales".to_string(), 2),
                ("HR".to_string(), 1),
            ]
        );
    }

    #[test]
    fn multi_column_keys() {
        let table = employees();
        assert_eq!(partition(table.rows(), &[1, 2]).len(), 5);
        assert_eq!(partition(table.rows(), &[]).len(), 1);
    }

    #[test]
    fn keys_compare_exact_values() {
        let columns = vec![
            Column::new("v", ColumnType::Double),
            Column::new("label", ColumnType::Varchar).with_capacity(10),
        ];
        let mut table = Table::new("m", columns, &[] as &[&str]).unwrap();
        let rows = vec![
            vec![Value::Double(1.001), Value::from("NULL")],
            vec![Value::Double(1.004), Value::Null],
            vec![Value::Double(1.001), Value::Null],
            vec![Value::Double(-0.0), Value::from("NULL")],
            vec![Value::Double(0.0), Value::from("NULL")],
        ];
        for row in rows {
            table.insert(row).unwrap();
        }

        let sizes: Vec<usize> = partition(table.rows(), &[0]).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1, 2]);

        let sizes: Vec<usize> = partition(table.rows(), &[1]).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 2]);
    }

    #[test]
    fn having_on_aggregates() {
        let table = employees();
        assert_eq!(surviving(&table, "AVG(salary) > 55000"), vec!["Engineering"]);
        assert_eq!(surviving(&table, "COUNT(*) >= 2"), vec!["Engineering", "Sales"]);
        assert_eq!(surviving(&table, "MIN(salary) < 50000"), vec!["HR"]);
        assert_eq!(surviving(&table, "SUM(salary) != 150000"), vec!["Sales", "HR"]);
    }

    #[test]
    fn having_on_columns_and_literals() {
        let table = employees();
        assert_eq!(surviving(&table, "department = 'Sales'"), vec!["Sales"]);
        assert_eq!(surviving(&table, "50000 < MAX(salary)"), vec!["Engineering", "Sales"]);
        assert!(surviving(&table, "missing = 1").is_empty());
    }

    #[test]
    fn operands() {
        let having = Having::try_from("COUNT(*) > 1").unwrap();
        assert!(having.has_aggregate());
        assert_eq!(having.right, HavingOperand::Literal("1".into()));

        let having = Having::try_from("department != 'HR'").unwrap();
        assert!(!having.has_aggregate());
        assert_eq!(having.left, HavingOperand::Column("department".into()));

        assert!(matches!(
            Having::try_from("COUNT(*)"),
            Err(StatementError::MissingOperator(_))
        ));
        assert!(Having::try_from("> 5").is_err());
    }

    #[test]
    fn unknown_aggregate_column() {
        let table = employees();
        let having = Having::try_from("SUM(wage) > 1").unwrap();
        assert!(matches!(
            having.bind(&table),
            Err(QueryError::UnknownColumn { .. })
        ));
    }
}
