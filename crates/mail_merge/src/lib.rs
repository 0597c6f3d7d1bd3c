//! Certificate batches
//!
//! Loads recipient rows from Excel or JSON, maps template placeholders to
//! columns and renders one certificate per row with [`docx_template`].
//!
//! # Example
//!
//! ```rust
//! use mail_merge::{BatchGenerator, BatchOptions, Dataset, FieldMapping, PlaceholderBinding};
//! use docx_template::Renderer;
//!
//! let dataset = Dataset::from_json_rows(
//!     "graduates",
//!     r#"[{"Full Name": "Asha Rao", "CertificateNo": "CERT042"}]"#,
//! ).unwrap();
//! let mapping = FieldMapping::new().with_binding(PlaceholderBinding::new("Name", "Full Name"));
//! let generator = BatchGenerator::new(Renderer::new(), mapping, BatchOptions::default());
//! assert_eq!(generator.options().output_name_pattern, "certificate_{index}.docx");
//! assert_eq!(dataset.row_count(), 1);
//! ```

mod batch;
mod dataset;
mod error;
mod mapping;
mod qr_image;
mod xlsx;

pub use batch::{
    BatchGenerator, BatchOptions, BatchProgress, BatchResult, BatchStatus, CancellationFlag, FixedImage,
    GeneratedCertificate, QrEncoder, RowError,
};
pub use dataset::{Column, DataRow, DataType, Dataset, Value};
pub use error::{MailMergeError, Result};
pub use mapping::{FieldMapping, PlaceholderBinding, QrPattern, TextTransform};
pub use qr_image::QrCodeEncoder;
pub use xlsx::{sheet_names_from_bytes, SheetSelector, XlsxOptions, XlsxParser};

use std::path::Path;

/// Load a dataset, choosing the reader from the file extension
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" => XlsxParser::new().parse_file(path),
        "json" => {
            if !path.exists() {
                return Err(MailMergeError::FileNotFound(path.display().to_string()));
            }
            let id = path.file_stem().and_then(|s| s.to_str()).unwrap_or("rows");
            Dataset::from_json_rows(id, &std::fs::read_to_string(path)?)
        }
        _ => Err(MailMergeError::UnsupportedFormat(format!(
            "Unknown file extension for: {}",
            path.display()
        ))),
    }
}
