//! Error types for dataset loading and batch generation

use docx_template::TemplateRenderError;
use thiserror::Error;

/// Errors that can occur while loading rows or running a batch
#[derive(Debug, Error)]
pub enum MailMergeError {
    /// IO error reading a dataset file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing JSON rows
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Rows that do not form a table
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Empty dataset or sheet
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// Duplicate column names
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Error reading an Excel workbook
    #[error("XLSX parse error: {0}")]
    XlsxParse(String),

    /// The QR encoder rejected a row's text
    #[error("QR encoding failed: {0}")]
    QrEncode(String),

    /// The template itself could not be rendered
    #[error("Template error: {0}")]
    Render(#[from] TemplateRenderError),

    /// A render worker panicked or the pool shut down
    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Result type for mail merge operations
pub type Result<T> = std::result::Result<T, MailMergeError>;
