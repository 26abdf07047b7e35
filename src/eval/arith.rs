//! Arithmetic for `SET col = a <op> b`.
use std::fmt;

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// Applies the operator. A NULL operand yields NULL; two integers stay
    /// integral, anything else involving a double is computed in `f64`.
    pub fn apply(&self, left: &Value, right: &Value) -> Result<Value, ArithError> {
        match (left, right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(l), Value::Int(r)) => self.apply_int(*l, *r),
            (l, r) => match (l.as_f64(), r.as_f64()) {
                (Some(l), Some(r)) => self.apply_float(l, r),
                _ => Err(ArithError::NonNumeric {
                    left: left.to_string(),
                    op: self.symbol(),
                    right: right.to_string(),
                }),
            },
        }
    }

    fn apply_int(&self, l: i64, r: i64) -> Result<Value, ArithError> {
        let result = match self {
            Self::Add => l.checked_add(r),
            Self::Sub => l.checked_sub(r),
            Self::Mul => l.checked_mul(r),
            Self::Div if r == 0 => return Err(ArithError::DivisionByZero),
            Self::Div => l.checked_div(r),
        };
        result.map(Value::Int).ok_or(ArithError::Overflow)
    }

    fn apply_float(&self, l: f64, r: f64) -> Result<Value, ArithError> {
        let result = match self {
            Self::Add => l + r,
            Self::Sub => l - r,
            Self::Mul => l * r,
            Self::Div if r == 0.0 => return Err(ArithError::DivisionByZero),
            Self::Div => l / r,
        };
        Ok(Value::Double(result))
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArithError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("cannot compute {left} {op} {right}")]
    NonNumeric {
        left: String,
        op: char,
        right: String,
    },
}
