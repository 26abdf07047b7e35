pub mod cli;
pub mod engine;
pub mod error;
pub mod eval;
pub mod output;
pub mod statement;
pub mod storage;
pub mod value;

pub use cli::{Command, prompt};
pub use engine::Database;
pub use error::{ErrorKind, QueryError};
pub use output::{Output, ResultSet};
pub use statement::Statement;
pub use value::Value;
