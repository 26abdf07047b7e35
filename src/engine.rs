//! Statement execution against the catalog and its on-disk mirror.
//!
//! [`Database`] owns every table in memory and a [`DiskStore`] rooted at the
//! data directory. Each call to [`Database::execute`] parses one statement,
//! validates it against the schema, mutates memory and then brings the
//! affected files in line before returning.
//!
//! # Example
//! ```rust
//! use minidb::{Database, Output};
//! # let dir = tempdir::TempDir::new("minidb").unwrap();
//!
//! let mut db = Database::open(dir.path()).unwrap();
//! db.execute("CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(5))").unwrap();
//! db.execute("INSERT INTO t VALUES (1, 'ok')").unwrap();
//!
//! let Output::Rows(rows) = db.execute("SELECT name FROM t WHERE id = 1").unwrap() else {
//!     panic!("expected rows");
//! };
//! assert_eq!(rows.len(), 1);
//! ```
use std::path::Path;

use log::{debug, info};

use crate::{
    error::QueryError,
    eval::{ArithError, ArithOp, BoundAggregate, BoundHaving, Predicate, partition},
    output::{Output, ResultSet},
    statement::{
        Assignment, CreateTable, Delete, Insert, Operand, Projection, Select, SelectItem, SetExpr,
        Statement, Update, lexer,
        literal::{Quoting, parse_literal},
    },
    storage::{Catalog, Column, ColumnType, DiskStore, Row, Table, error::StorageError},
    value::Value,
};

#[derive(Debug)]
pub struct Database {
    catalog: Catalog,
    store: DiskStore,
}

fn lookup<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a Table, QueryError> {
    catalog
        .get(name)
        .ok_or_else(|| QueryError::NotFound(name.to_string()))
}

fn lookup_mut<'a>(catalog: &'a mut Catalog, name: &str) -> Result<&'a mut Table, QueryError> {
    catalog
        .get_mut(name)
        .ok_or_else(|| QueryError::NotFound(name.to_string()))
}

fn ordinal_of(table: &Table, column: &str) -> Result<usize, QueryError> {
    table
        .column_index(column)
        .ok_or_else(|| QueryError::UnknownColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        })
}

/// Enforces NOT NULL and the declared text capacity for a stored value.
fn check_value(column: &Column, value: &Value) -> Result<(), QueryError> {
    if value.is_null() && !column.nullable {
        return Err(QueryError::NotNull(column.name.clone()));
    }

    if let (ColumnType::Varchar, Value::Text(text)) = (column.column_type, value) {
        let length = text.chars().count();
        if length > column.capacity {
            return Err(QueryError::LengthExceeded {
                column: column.name.clone(),
                length,
                capacity: column.capacity,
            });
        }
    }
    Ok(())
}

/// Right-pads text for columns declared as `CHAR(n)`.
fn pad_fixed_width(column: &Column, value: Value) -> Value {
    match value {
        Value::Text(text) if column.fixed_width => {
            let length = text.chars().count();
            let mut padded = text;
            padded.extend(std::iter::repeat_n(' ', column.capacity.saturating_sub(length)));
            Value::Text(padded)
        }
        value => value,
    }
}

/// Converts an arithmetic result into the target column's type.
fn coerce(column: &Column, value: Value) -> Result<Value, QueryError> {
    match (column.column_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ColumnType::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (ColumnType::Double, Value::Int(i)) => Ok(Value::Double(i as f64)),
        (ColumnType::Double, Value::Double(d)) => Ok(Value::Double(d)),
        (column_type, value) => Err(QueryError::Arithmetic {
            column: column.name.clone(),
            reason: format!("result {value} is not a valid {column_type}"),
        }),
    }
}

#[derive(Debug)]
enum BoundOperand {
    Column(usize),
    Literal(Value),
}

#[derive(Debug)]
enum BoundExpr {
    Value(Value),
    Binary {
        left: BoundOperand,
        op: ArithOp,
        right: Value,
    },
}

/// A SET assignment with its target resolved and its literals typed.
#[derive(Debug)]
struct BoundAssignment {
    ordinal: usize,
    expr: BoundExpr,
}

impl BoundAssignment {
    fn bind(assignment: &Assignment, table: &Table) -> Result<Self, QueryError> {
        let ordinal = ordinal_of(table, &assignment.column)?;
        let column_type = table.columns()[ordinal].column_type;
        let typed = |raw: &str| parse_literal(raw, column_type, Quoting::Required);

        let expr = match &assignment.expr {
            SetExpr::Value(raw) => BoundExpr::Value(typed(raw)?),
            SetExpr::Binary { left, op, right } => BoundExpr::Binary {
                left: match left {
                    Operand::Column(name) => BoundOperand::Column(ordinal_of(table, name)?),
                    Operand::Literal(raw) => BoundOperand::Literal(typed(raw)?),
                },
                op: *op,
                right: typed(right)?,
            },
        };
        Ok(Self { ordinal, expr })
    }

    /// Computes the new value from `row`, which already holds the results
    /// of earlier assignments in the same statement.
    fn evaluate(&self, row: &Row, column: &Column) -> Result<Value, QueryError> {
        match &self.expr {
            BoundExpr::Value(value) => Ok(value.clone()),
            BoundExpr::Binary { left, op, right } => {
                let left = match left {
                    BoundOperand::Column(i) => &row[*i],
                    BoundOperand::Literal(value) => value,
                };
                let result = op.apply(left, right).map_err(|e| match e {
                    ArithError::DivisionByZero => QueryError::DivisionByZero(column.name.clone()),
                    e => QueryError::Arithmetic {
                        column: column.name.clone(),
                        reason: e.to_string(),
                    },
                })?;
                coerce(column, result)
            }
        }
    }
}

/// One projected result column of a grouped query.
#[derive(Debug)]
enum GroupItem {
    /// Value from the group's first row.
    Column(usize),
    Aggregate(BoundAggregate),
}

impl Database {
    /// Opens the data root and rebuilds every table stored under it.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, QueryError> {
        let store = DiskStore::open(root)?;
        let catalog = store.load()?;
        info!(
            "opened data root {:?} with {} table(s)",
            store.root(),
            catalog.len()
        );
        Ok(Self { catalog, store })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.catalog.get(name)
    }

    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    /// Parses and runs a single statement.
    pub fn execute(&mut self, sql: &str) -> Result<Output, QueryError> {
        let statement = Statement::parse(sql)?;
        self.run(statement)
    }

    /// Runs an already parsed statement.
    pub fn run(&mut self, statement: Statement) -> Result<Output, QueryError> {
        match statement {
            Statement::Create(create) => self.create(create),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Select(select) => self.select(&select).map(Output::Rows),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
        }
    }

    fn create(&mut self, create: CreateTable) -> Result<Output, QueryError> {
        if self.catalog.contains(&create.name) {
            return Err(StorageError::DuplicateTable(create.name).into());
        }

        let key = create.key_columns();
        let columns: Vec<Column> = create
            .columns
            .into_iter()
            .map(|mut column| {
                column.primary_key = key.contains(&column.name);
                column
            })
            .collect();

        let table = Table::new(create.name.as_str(), columns, &key)?;
        self.store.create(&table)?;
        self.catalog.add(table)?;

        info!("created table '{}' with key {:?}", create.name, key);
        Ok(Output::Created(create.name))
    }

    fn insert(&mut self, insert: Insert) -> Result<Output, QueryError> {
        let table = lookup_mut(&mut self.catalog, &insert.table)?;

        let columns = table.columns();
        if insert.values.len() > columns.len() {
            return Err(QueryError::TooManyValues {
                expected: columns.len(),
                actual: insert.values.len(),
            });
        }

        let mut row = Row::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value = match insert.values.get(i) {
                Some(raw) => parse_literal(raw, column.column_type, Quoting::Required)?,
                None => Value::Null,
            };
            check_value(column, &value)?;
            row.push(pad_fixed_width(column, value));
        }

        let position = table.insert(row)?;
        if let Some(row) = table.row(position) {
            self.store.append(table, row)?;
        }

        debug!("[{}] inserted row at {position}", insert.table);
        Ok(Output::Inserted(1))
    }

    /// Evaluates a SELECT without touching storage.
    pub fn select(&self, select: &Select) -> Result<ResultSet, QueryError> {
        let table = lookup(&self.catalog, &select.table)?;
        let predicate = Predicate::from_condition(select.selection.as_ref(), table)?;
        let rows: Vec<&Row> = table.rows().iter().filter(|r| predicate.matches(r)).collect();
        debug!("[{}] {} row(s) pass the filter", table.name(), rows.len());

        if select.is_grouped() {
            return Self::select_grouped(select, table, rows);
        }

        let ordinals: Vec<usize> = match &select.projection {
            Projection::Star => (0..table.columns().len()).collect(),
            Projection::Items(items) => items
                .iter()
                .map(|item| ordinal_of(table, item.header()))
                .collect::<Result<_, _>>()?,
        };

        let mut result = ResultSet::new(
            ordinals
                .iter()
                .map(|&i| table.columns()[i].name.clone())
                .collect(),
        );
        result.rows = rows
            .into_iter()
            .map(|row| ordinals.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(result)
    }

    fn select_grouped(
        select: &Select,
        table: &Table,
        rows: Vec<&Row>,
    ) -> Result<ResultSet, QueryError> {
        let group_ordinals: Vec<usize> = select
            .group_by
            .iter()
            .map(|name| ordinal_of(table, name))
            .collect::<Result<_, _>>()?;

        let (headers, items): (Vec<String>, Vec<GroupItem>) = match &select.projection {
            Projection::Star if group_ordinals.is_empty() => table
                .columns()
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.clone(), GroupItem::Column(i)))
                .unzip(),
            Projection::Star => group_ordinals
                .iter()
                .map(|&i| (table.columns()[i].name.clone(), GroupItem::Column(i)))
                .unzip(),
            Projection::Items(items) => items
                .iter()
                .map(|item| {
                    let bound = match item {
                        SelectItem::Column(name) => GroupItem::Column(ordinal_of(table, name)?),
                        SelectItem::Aggregate(call) => GroupItem::Aggregate(call.bind(table)?),
                    };
                    Ok((item.header().to_string(), bound))
                })
                .collect::<Result<Vec<_>, QueryError>>()?
                .into_iter()
                .unzip(),
        };

        let having: Option<BoundHaving> = select
            .having
            .as_ref()
            .map(|having| having.bind(table))
            .transpose()?;

        let groups = if group_ordinals.is_empty() {
            vec![rows]
        } else {
            partition(rows, &group_ordinals)
        };
        debug!("[{}] {} group(s) before HAVING", table.name(), groups.len());

        let mut result = ResultSet::new(headers);
        for group in groups {
            if having.as_ref().is_some_and(|h| !h.matches(&group)) {
                continue;
            }
            let row = items
                .iter()
                .map(|item| match item {
                    GroupItem::Column(i) => group.first().map_or(Value::Null, |r| r[*i].clone()),
                    GroupItem::Aggregate(aggregate) => aggregate.compute(&group),
                })
                .collect();
            result.rows.push(row);
        }
        Ok(result)
    }

    fn update(&mut self, update: Update) -> Result<Output, QueryError> {
        let table = lookup_mut(&mut self.catalog, &update.table)?;
        let predicate = Predicate::from_condition(update.selection.as_ref(), table)?;
        let assignments = update
            .assignments
            .iter()
            .map(|a| BoundAssignment::bind(a, table))
            .collect::<Result<Vec<_>, _>>()?;

        let positions = predicate.positions(table);
        let mut updated = 0;
        let mut failure = None;

        for position in positions {
            let Some(current) = table.row(position) else {
                continue;
            };

            let mut row = current.clone();
            let applied = assignments.iter().try_for_each(|assignment| {
                let column = &table.columns()[assignment.ordinal];
                let value = assignment.evaluate(&row, column)?;
                check_value(column, &value)?;
                row[assignment.ordinal] = value;
                Ok::<(), QueryError>(())
            });

            let result = applied.and_then(|_| table.update(position, row).map_err(Into::into));
            if let Err(e) = result {
                failure = Some(e);
                break;
            }
            updated += 1;
        }

        if updated > 0 {
            self.store.rewrite(table)?;
        }
        if let Some(e) = failure {
            debug!("[{}] update stopped after {updated} row(s): {e}", update.table);
            return Err(e);
        }
        Ok(Output::Updated(updated))
    }

    fn delete(&mut self, delete: Delete) -> Result<Output, QueryError> {
        let table = lookup_mut(&mut self.catalog, &delete.table)?;
        let predicate = Predicate::from_condition(delete.selection.as_ref(), table)?;

        let removed = table.delete_many(predicate.positions(table));
        if removed > 0 {
            self.store.rewrite(table)?;
        }

        debug!("[{}] deleted {removed} row(s)", delete.table);
        Ok(Output::Deleted(removed))
    }

    /// Looks up a row by primary key, giving one literal per key column.
    /// Literals may be quoted; they are matched in canonical text form.
    pub fn find_by_key<S: AsRef<str>>(&self, table: &str, literals: &[S]) -> Option<&Row> {
        let table = self.catalog.get(table)?;
        let canonical: Vec<String> = literals
            .iter()
            .zip(table.primary_key())
            .map(|(raw, &i)| {
                let raw = raw.as_ref();
                match parse_literal(raw, table.columns()[i].column_type, Quoting::Optional) {
                    Ok(value) => value.to_string(),
                    Err(_) => lexer::unquote(raw).unwrap_or(raw).to_string(),
                }
            })
            .collect();

        if canonical.len() != literals.len() {
            return None;
        }
        table.find_by_key(&canonical)
    }
}
