// ❗ Error types for site-ledger
//
// Library code returns `Result<T>`; the CLI wraps these in anyhow with context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Remote row store rejected or failed a call
    #[error("Remote store error: {0}")]
    Remote(String),

    /// SQLite-backed row store errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A remote row could not be mapped onto an entity
    #[error("Malformed {table} row: {reason}")]
    MalformedRow { table: &'static str, reason: String },

    /// Required import column not found among the detected headers
    #[error("Column '{column}' not found (detected headers: {})", headers.join(", "))]
    MissingColumn { column: String, headers: Vec<String> },

    /// Import file had no data rows
    #[error("No rows to import")]
    EmptyInput,

    /// Unsupported or unreadable import file
    #[error("Import error: {0}")]
    Import(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook write error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using the crate Error
pub type Result<T> = std::result::Result<T, Error>;
