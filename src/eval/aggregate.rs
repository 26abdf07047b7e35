//! Aggregate functions over a group of rows.
use std::{cmp::Ordering, fmt};

use crate::{
    error::QueryError,
    statement::StatementError,
    storage::{Row, Table},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl TryFrom<&str> for AggregateFn {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateArg {
    Star,
    Column(String),
}

/// A call such as `COUNT(*)` or `avg(salary)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCall {
    pub func: AggregateFn,
    pub arg: AggregateArg,
    /// The call as written, used as the result column header.
    pub text: String,
}

impl AggregateCall {
    /// Recognizes an aggregate call. `Ok(None)` means `s` isn't one and
    /// should be read as a plain column reference.
    pub fn parse(s: &str) -> Result<Option<Self>, StatementError> {
        let s = s.trim();
        let Some(open) = s.find('(') else {
            return Ok(None);
        };
        let Ok(func) = AggregateFn::try_from(s[..open].trim()) else {
            return Ok(None);
        };

        let malformed = |reason: &str| StatementError::Malformed {
            clause: "aggregate",
            reason: format!("{reason} in '{s}'"),
        };

        if !s.ends_with(')') {
            return Err(malformed("missing ')'"));
        }
        let arg = s[open + 1..s.len() - 1].trim();
        let arg = match arg {
            "" => return Err(malformed("missing argument")),
            "*" if func == AggregateFn::Count => AggregateArg::Star,
            "*" => return Err(malformed("'*' is only valid for COUNT")),
            column => AggregateArg::Column(column.to_string()),
        };

        Ok(Some(Self {
            func,
            arg,
            text: s.to_string(),
        }))
    }

    pub fn bind(&self, table: &Table) -> Result<BoundAggregate, QueryError> {
        let ordinal = match &self.arg {
            AggregateArg::Star => None,
            AggregateArg::Column(name) => Some(table.column_index(name).ok_or_else(|| {
                QueryError::UnknownColumn {
                    table: table.name().to_string(),
                    column: name.clone(),
                }
            })?),
        };

        Ok(BoundAggregate {
            func: self.func,
            ordinal,
        })
    }
}

/// An aggregate with its argument resolved to a column ordinal. `None`
/// stands for `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAggregate {
    pub func: AggregateFn,
    pub ordinal: Option<usize>,
}

impl BoundAggregate {
    pub fn compute(&self, rows: &[&Row]) -> Value {
        let Some(ordinal) = self.ordinal else {
            return Value::Int(rows.len() as i64);
        };
        let values = rows.iter().map(|row| &row[ordinal]);

        match self.func {
            AggregateFn::Count => Value::Int(values.filter(|v| !v.is_null()).count() as i64),
            AggregateFn::Sum => sum(values).map_or(Value::Null, |s| s.total),
            AggregateFn::Avg => sum(values).map_or(Value::Null, |s| {
                Value::Double(s.float / s.count as f64)
            }),
            AggregateFn::Min => extreme(values, Ordering::Less),
            AggregateFn::Max => extreme(values, Ordering::Greater),
        }
    }
}

struct Sum {
    total: Value,
    float: f64,
    count: usize,
}

/// Sums the numeric values, ignoring everything else. Stays integral while
/// every input is an integer and the total fits in an `i64`.
fn sum<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Sum> {
    let mut int: Option<i64> = Some(0);
    let mut float = 0.0;
    let mut count = 0;

    for value in values {
        match value {
            Value::Int(i) => int = int.and_then(|acc| acc.checked_add(*i)),
            Value::Double(_) => int = None,
            _ => continue,
        }
        float += value.as_f64().unwrap_or_default();
        count += 1;
    }

    if count == 0 {
        return None;
    }
    let total = int.map_or(Value::Double(float), Value::Int);
    Some(Sum {
        total,
        float,
        count,
    })
}

/// Smallest or largest value by [`Value`] ordering. Values that don't compare
/// with the current best are skipped.
fn extreme<'a>(mut values: impl Iterator<Item = &'a Value>, wanted: Ordering) -> Value {
    let Some(first) = values.next() else {
        return Value::Null;
    };

    values
        .fold(first, |best, v| {
            if v.partial_cmp(best) == Some(wanted) {
                v
            } else {
                best
            }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Column, ColumnType};

    fn table() -> Table {
        let columns = vec![
            Column::new("name", ColumnType::Varchar).with_capacity(10),
            Column::new("dept", ColumnType::Varchar).with_capacity(10),
            Column::new("salary", ColumnType::Int),
            Column::new("bonus", ColumnType::Double),
        ];
        let mut table = Table::new("emp", columns, &[] as &[&str]).unwrap();
        let rows = vec![
            vec![Value::from("a"), Value::from("eng"), Value::Int(100), Value::Double(1.5)],
            vec![Value::from("b"), Value::from("eng"), Value::Int(300), Value::Null],
            vec![Value::from("c"), Value::from("ops"), Value::Null, Value::Double(2.0)],
        ];
        for row in rows {
            table.insert(row).unwrap();
        }
        table
    }

    fn compute(table: &Table, call: &str) -> Value {
        let call = AggregateCall::parse(call).unwrap().unwrap();
        let rows: Vec<&Row> = table.rows().iter().collect();
        call.bind(table).unwrap().compute(&rows)
    }

    #[test]
    fn parse_calls() {
        let call = AggregateCall::parse(" count(*) ").unwrap().unwrap();
        assert_eq!(call.func, AggregateFn::Count);
        assert_eq!(call.arg, AggregateArg::Star);
        assert_eq!(call.text, "count(*)");

        let call = AggregateCall::parse("AVG( salary )").unwrap().unwrap();
        assert_eq!(call.func, AggregateFn::Avg);
        assert_eq!(call.arg, AggregateArg::Column("salary".into()));

        assert_eq!(AggregateCall::parse("salary").unwrap(), None);
        assert_eq!(AggregateCall::parse("upper(name)").unwrap(), None);
        assert!(AggregateCall::parse("sum(*)").is_err());
        assert!(AggregateCall::parse("max()").is_err());
    }

    #[test]
    fn counts() {
        let table = table();
        assert_eq!(compute(&table, "COUNT(*)"), Value::Int(3));
        assert_eq!(compute(&table, "COUNT(salary)"), Value::Int(2));
        assert_eq!(compute(&table, "count(name)"), Value::Int(3));
    }

    #[test]
    fn sums_keep_integers_integral() {
        let table = table();
        assert_eq!(compute(&table, "SUM(salary)"), Value::Int(400));
        assert_eq!(compute(&table, "SUM(bonus)"), Value::Double(3.5));
        assert_eq!(compute(&table, "SUM(name)"), Value::Null);
    }

    #[test]
    fn averages_are_doubles() {
        let table = table();
        assert_eq!(compute(&table, "AVG(salary)"), Value::Double(200.0));
        assert_eq!(compute(&table, "AVG(bonus)"), Value::Double(1.75));
        assert_eq!(compute(&table, "AVG(dept)"), Value::Null);
    }

    #[test]
    fn min_and_max_follow_value_order() {
        let table = table();
        assert_eq!(compute(&table, "MAX(salary)"), Value::Int(300));
        assert_eq!(compute(&table, "MIN(salary)"), Value::Null);
        assert_eq!(compute(&table, "MAX(name)"), Value::from("c"));
        assert_eq!(compute(&table, "MIN(dept)"), Value::from("eng"));
    }

    #[test]
    fn empty_groups() {
        let table = table();
        let rows: Vec<&Row> = Vec::new();
        for (call, expected) in [
            ("COUNT(*)", Value::Int(0)),
            ("SUM(salary)", Value::Null),
            ("AVG(salary)", Value::Null),
            ("MIN(salary)", Value::Null),
        ] {
            let bound = AggregateCall::parse(call)
                .unwrap()
                .unwrap()
                .bind(&table)
                .unwrap();
            assert_eq!(bound.compute(&rows), expected, "{call}");
        }
    }

    #[test]
    fn unknown_argument_column() {
        let table = table();
        let call = AggregateCall::parse("SUM(wage)").unwrap().unwrap();
        assert!(matches!(
            call.bind(&table),
            Err(QueryError::UnknownColumn { ref column, .. }) if column == "wage"
        ));
    }
}
