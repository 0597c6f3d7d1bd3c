//! Excel workbooks as datasets

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::NaiveDate;

use crate::dataset::{Column, DataRow, DataType, Dataset, Value};
use crate::error::{MailMergeError, Result};

const EMPTY_CELL: &Data = &Data::Empty;

/// Which sheet of a workbook holds the rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SheetSelector {
    #[default]
    First,
    ByName(String),
    /// 0-based
    ByIndex(usize),
}

/// Reading options
#[derive(Debug, Clone)]
pub struct XlsxOptions {
    pub sheet: SheetSelector,
    /// When false, columns are named `Column1`, `Column2`, ...
    pub has_header: bool,
    pub trim_whitespace: bool,
    pub skip_empty_rows: bool,
}

impl Default for XlsxOptions {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::First,
            has_header: true,
            trim_whitespace: true,
            skip_empty_rows: true,
        }
    }
}

impl XlsxOptions {
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet = SheetSelector::ByName(name.into());
        self
    }

    pub fn with_sheet_index(mut self, index: usize) -> Self {
        self.sheet = SheetSelector::ByIndex(index);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

/// Loads recipient rows from `.xlsx` workbooks
#[derive(Debug, Clone, Default)]
pub struct XlsxParser {
    options: XlsxOptions,
}

impl XlsxParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: XlsxOptions) -> Self {
        Self { options }
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MailMergeError::FileNotFound(path.display().to_string()));
        }
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| MailMergeError::XlsxParse(format!("Failed to open workbook: {}", e)))?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("workbook")
            .to_string();
        self.parse_workbook(&mut workbook, id)
    }

    pub fn parse_bytes(&self, data: &[u8], id: impl Into<String>) -> Result<Dataset> {
        let mut workbook = Xlsx::new(Cursor::new(data))
            .map_err(|e| MailMergeError::XlsxParse(format!("Failed to read workbook from bytes: {}", e)))?;
        self.parse_workbook(&mut workbook, id.into())
    }

    fn parse_workbook<RS: Read + Seek>(&self, workbook: &mut Xlsx<RS>, id: String) -> Result<Dataset> {
        let sheet = self.select_sheet(&workbook.sheet_names())?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| MailMergeError::XlsxParse(format!("Failed to read sheet '{}': {}", sheet, e)))?;
        tracing::debug!("Reading sheet '{}' ({} x {})", sheet, range.height(), range.width());
        self.read_range(&range, id)
    }

    fn select_sheet(&self, names: &[String]) -> Result<String> {
        if names.is_empty() {
            return Err(MailMergeError::EmptyDataset("Workbook has no sheets".to_string()));
        }
        match &self.options.sheet {
            SheetSelector::First => Ok(names[0].clone()),
            SheetSelector::ByName(name) => names.iter().find(|n| *n == name).cloned().ok_or_else(|| {
                MailMergeError::XlsxParse(format!("Sheet '{}' not found. Available sheets: {:?}", name, names))
            }),
            SheetSelector::ByIndex(index) => names.get(*index).cloned().ok_or_else(|| {
                MailMergeError::XlsxParse(format!(
                    "Sheet index {} out of range. Workbook has {} sheets",
                    index,
                    names.len()
                ))
            }),
        }
    }

    fn read_range(&self, range: &Range<Data>, id: String) -> Result<Dataset> {
        if range.is_empty() {
            return Err(MailMergeError::EmptyDataset("Excel sheet is empty".to_string()));
        }
        let (height, width) = (range.height(), range.width());

        let headers: Vec<String> = if self.options.has_header {
            (0..width).map(|col| self.header_name(range.get((0, col)), col)).collect()
        } else {
            (0..width).map(|col| format!("Column{}", col + 1)).collect()
        };
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(MailMergeError::DuplicateColumn(header.clone()));
            }
        }

        let first_data_row = usize::from(self.options.has_header);
        let mut cells: Vec<Vec<&Data>> = Vec::new();
        for row in first_data_row..height {
            let line: Vec<&Data> = (0..width)
                .map(|col| range.get((row, col)).unwrap_or(EMPTY_CELL))
                .collect();
            if self.options.skip_empty_rows && line.iter().all(|c| is_blank(c)) {
                continue;
            }
            cells.push(line);
        }

        let mut dataset = Dataset::new(id);
        for (col, header) in headers.iter().enumerate() {
            let column_type = detect_column_type(cells.iter().map(|line| line[col]));
            dataset.push_column(Column::new(header.clone(), column_type));
        }
        for line in cells {
            let row: DataRow = headers
                .iter()
                .zip(line)
                .map(|(header, cell)| (header.clone(), self.cell_value(cell)))
                .collect();
            dataset.push_row(row);
        }
        Ok(dataset)
    }

    fn header_name(&self, cell: Option<&Data>, col: usize) -> String {
        let name = match cell {
            Some(Data::String(s)) if self.options.trim_whitespace => s.trim().to_string(),
            Some(Data::String(s)) => s.clone(),
            Some(Data::Empty) | None => String::new(),
            Some(other) => self.cell_value(other).display_string(),
        };
        if name.is_empty() {
            format!("Column{}", col + 1)
        } else {
            name
        }
    }

    /// Convert one cell. Excel serial dates become calendar dates.
    fn cell_value(&self, cell: &Data) -> Value {
        match cell {
            Data::Empty => Value::Null,
            Data::String(s) => {
                let text = if self.options.trim_whitespace { s.trim() } else { s.as_str() };
                if is_null_text(text) {
                    Value::Null
                } else {
                    Value::Text(text.to_string())
                }
            }
            Data::Int(n) => Value::Number(*n as f64),
            Data::Float(n) => Value::Number(*n),
            Data::Bool(b) => Value::Boolean(*b),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                excel_serial_to_date(serial)
                    .map(Value::Date)
                    .unwrap_or(Value::Number(serial))
            }
            Data::DateTimeIso(s) => parse_iso_date(s).map(Value::Date).unwrap_or_else(|| Value::Text(s.clone())),
            Data::DurationIso(s) => Value::Text(s.clone()),
            Data::Error(e) => {
                tracing::warn!("Cell error {:?} read as text", e);
                Value::Text(format!("#ERROR:{:?}", e))
            }
        }
    }
}

fn is_null_text(text: &str) -> bool {
    text.is_empty() || ["null", "na", "n/a", "#n/a"].iter().any(|n| text.eq_ignore_ascii_case(n))
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text wins over any mix; a column with no values is text
fn detect_column_type<'a>(cells: impl Iterator<Item = &'a Data>) -> DataType {
    let mut found: Option<DataType> = None;
    for cell in cells {
        let kind = match cell {
            Data::Empty => continue,
            Data::String(s) if is_null_text(s.trim()) => continue,
            Data::Int(_) | Data::Float(_) => DataType::Number,
            Data::Bool(_) => DataType::Boolean,
            Data::DateTime(_) | Data::DateTimeIso(_) => DataType::Date,
            Data::String(_) | Data::DurationIso(_) | Data::Error(_) => return DataType::Text,
        };
        match found {
            None => found = Some(kind),
            Some(previous) if previous != kind => return DataType::Text,
            Some(_) => {}
        }
    }
    found.unwrap_or(DataType::Text)
}

/// Days since 1899-12-30. Serials up to 60 precede the phantom 1900-02-29
/// Excel still counts, so they shift by one.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let days = if days <= 60 { days + 1 } else { days };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(chrono::Duration::days(days))
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Sheet names of a workbook held in memory
pub fn sheet_names_from_bytes(data: &[u8]) -> Result<Vec<String>> {
    let workbook = Xlsx::new(Cursor::new(data))
        .map_err(|e| MailMergeError::XlsxParse(format!("Failed to read workbook from bytes: {}", e)))?;
    Ok(workbook.sheet_names())
}
