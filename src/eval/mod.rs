//! Expression evaluation over table rows: WHERE predicates, aggregates,
//! grouping with HAVING, and UPDATE arithmetic.
//!
//! Parsed clauses are plain data. Each one is bound against a [`Table`]
//! before use, which resolves column names to ordinals and types literals
//! by the column they are compared with.
//!
//! [`Table`]: crate::storage::Table
pub mod aggregate;
pub mod arith;
pub mod condition;
pub mod group;

pub use aggregate::{AggregateArg, AggregateCall, AggregateFn, BoundAggregate};
pub use arith::{ArithError, ArithOp};
pub use condition::{CompareOp, Condition, Predicate};
pub use group::{BoundHaving, Having, HavingOperand, partition};
