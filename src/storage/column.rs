use std::{fmt, str::FromStr};

/// Logical column type as persisted in the metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Double,
    Varchar,
    Date,
}

impl ColumnType {
    /// Whether literals for this type must be quote-delimited.
    pub fn is_quoted(&self) -> bool {
        matches!(self, Self::Varchar | Self::Date)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "INT",
            Self::Double => "DOUBLE",
            Self::Varchar => "VARCHAR",
            Self::Date => "DATE",
        };
        f.write_str(name)
    }
}

impl FromStr for ColumnType {
    type Err = String;

    /// Accepts the persisted names plus the `CHAR`/`TEXT` aliases, which
    /// normalize to [`ColumnType::Varchar`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(Self::Int),
            "DOUBLE" => Ok(Self::Double),
            "VARCHAR" | "CHAR" | "TEXT" => Ok(Self::Varchar),
            "DATE" => Ok(Self::Date),
            other => Err(format!("unsupported column type '{other}'")),
        }
    }
}

/// Schema entry for one field of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    /// Declared text capacity, only enforced for `VARCHAR`. Always >= 1.
    pub capacity: usize,
    pub primary_key: bool,
    pub nullable: bool,
    /// Set for columns declared as `CHAR`; inserted values are padded to
    /// `capacity`. Not persisted.
    pub fixed_width: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            capacity: 1,
            primary_key: false,
            nullable: true,
            fixed_width: false,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn fixed_width(mut self) -> Self {
        self.fixed_width = true;
        self
    }
}
