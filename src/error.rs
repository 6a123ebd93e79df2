use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Malformed delimited file {path}: {details}")]
    MalformedCsv { path: String, details: String },

    #[error("Malformed JSON document {path}: {details}")]
    MalformedJson { path: String, details: String },

    #[error("Required column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Table '{0}' is empty after loading")]
    EmptyTable(String),

    #[error("Invalid configuration value for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Unknown crate type '{0}', expected one of Plastic, Wood, Metal")]
    InvalidCrateType(String),

    #[error("Report target {0} exists and is not a regular file")]
    OutputNotAFile(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
