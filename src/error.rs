use thiserror::Error;

/// A table does not have the shape its chart expects.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{schema}: missing required column '{column}'")]
    MissingColumn { schema: &'static str, column: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThemeError {
    #[error("'{value}' is not a #rrggbb colour ({field})")]
    InvalidColor { field: String, value: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoplightError {
    #[error("class year '{0}' appears in one era but not the other")]
    UnmatchedClassYear(String),
    #[error("era '{0}' has no lights")]
    EmptyEra(String),
}
