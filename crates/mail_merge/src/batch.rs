//! Batch certificate generation
//!
//! Renders one certificate per dataset row. A failing row is recorded and the
//! batch moves on; only a template that cannot be read at all fails the whole
//! run.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use docx_template::{extract_from_docx, QrPlacement, RenderContext, Renderer};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::dataset::{DataRow, Dataset};
use crate::error::{MailMergeError, Result};
use crate::mapping::{FieldMapping, QrPattern};

/// Turns a row's QR text into an image payload (data URL or bare base64)
pub trait QrEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<String>;
}

/// Uses the same image for every row
#[derive(Debug, Clone)]
pub struct FixedImage {
    payload: String,
}

impl FixedImage {
    pub fn new(payload: impl Into<String>) -> Self {
        Self { payload: payload.into() }
    }
}

impl QrEncoder for FixedImage {
    fn encode(&self, _text: &str) -> Result<String> {
        Ok(self.payload.clone())
    }
}

/// Batch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// `{index}` is the 1-based row number, `{Column}` a sanitized cell value
    pub output_name_pattern: String,
    pub trim_values: bool,
    /// 0 renders every row
    pub max_records: usize,
    /// Rows rendered at once by [`BatchGenerator::generate_parallel`]
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_name_pattern: "certificate_{index}.docx".to_string(),
            trim_values: true,
            max_records: 0,
            concurrency: 4,
        }
    }
}

impl BatchOptions {
    pub fn with_output_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.output_name_pattern = pattern.into();
        self
    }

    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Shared stop switch for a running batch
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Completed,
    /// Every attempted row failed
    Failed,
    Cancelled,
}

/// A row that could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 0-based
    pub row_index: usize,
    pub message: String,
}

/// One rendered row
#[derive(Debug, Clone)]
pub struct GeneratedCertificate {
    pub row_index: usize,
    pub output_name: String,
    pub data: Vec<u8>,
    pub qr_placement: Option<QrPlacement>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub status: BatchStatus,
    pub total_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub certificates: Vec<GeneratedCertificate>,
    pub errors: Vec<RowError>,
    pub summary: String,
}

impl BatchResult {
    fn new(total_rows: usize) -> Self {
        Self {
            status: BatchStatus::Completed,
            total_rows,
            success_count: 0,
            failure_count: 0,
            certificates: Vec::new(),
            errors: Vec::new(),
            summary: String::new(),
        }
    }

    fn record(&mut self, outcome: std::result::Result<GeneratedCertificate, RowError>) {
        match outcome {
            Ok(certificate) => {
                self.success_count += 1;
                self.certificates.push(certificate);
            }
            Err(error) => {
                tracing::warn!("Row {} failed: {}", error.row_index + 1, error.message);
                self.failure_count += 1;
                self.errors.push(error);
            }
        }
    }

    fn finish(&mut self, cancelled: bool) {
        unique_output_names(&mut self.certificates);
        let attempted = self.success_count + self.failure_count;
        self.status = if cancelled {
            BatchStatus::Cancelled
        } else if attempted > 0 && self.success_count == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        };
        self.summary = format!(
            "Generated {} of {} certificates ({} failed)",
            self.success_count, self.total_rows, self.failure_count
        );
        tracing::info!("{}", self.summary);
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Completed && self.failure_count == 0
    }

    pub fn success_rate(&self) -> f64 {
        let attempted = self.success_count + self.failure_count;
        if attempted == 0 {
            return 0.0;
        }
        self.success_count as f64 / attempted as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Rows finished so far, 1-based
    pub current: usize,
    pub total: usize,
    pub percent: f64,
}

impl BatchProgress {
    pub fn at(current: usize, total: usize) -> Self {
        let percent = if total > 0 { current as f64 / total as f64 * 100.0 } else { 0.0 };
        Self { current, total, percent }
    }
}

type RowOutcome = std::result::Result<GeneratedCertificate, RowError>;

#[derive(Clone)]
struct QrSource {
    pattern: QrPattern,
    /// Names in the pattern, resolved against each row like placeholders
    fields: Vec<String>,
    encoder: Arc<dyn QrEncoder>,
}

/// Renders a template once per dataset row
#[derive(Clone)]
pub struct BatchGenerator {
    renderer: Arc<Renderer>,
    mapping: FieldMapping,
    qr: Option<QrSource>,
    options: BatchOptions,
}

impl BatchGenerator {
    pub fn new(renderer: Renderer, mapping: FieldMapping, options: BatchOptions) -> Self {
        Self {
            renderer: Arc::new(renderer),
            mapping,
            qr: None,
            options,
        }
    }

    /// Give every certificate a QR image encoding `pattern`
    pub fn with_qr(mut self, pattern: QrPattern, encoder: Arc<dyn QrEncoder>) -> Self {
        self.qr = Some(QrSource {
            fields: pattern.placeholders(),
            pattern,
            encoder,
        });
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn generate(&self, template: &[u8], dataset: &Dataset) -> Result<BatchResult> {
        self.generate_with_progress(template, dataset, &CancellationFlag::new(), |_| {})
    }

    /// Render rows one after another, reporting after each row.
    ///
    /// Cancellation is checked before every row.
    pub fn generate_with_progress<F>(
        &self,
        template: &[u8],
        dataset: &Dataset,
        cancel: &CancellationFlag,
        mut on_progress: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(BatchProgress),
    {
        let placeholders = self.template_placeholders(template, dataset)?;
        let rows = self.selected_rows(dataset);
        let mut result = BatchResult::new(rows.len());

        for (done, (index, row)) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            result.record(self.render_row(template, &placeholders, index, row));
            on_progress(BatchProgress::at(done + 1, result.total_rows));
        }
        result.finish(cancel.is_cancelled());
        Ok(result)
    }

    /// Render rows on blocking worker tasks, at most `concurrency` at a time.
    ///
    /// Progress is reported as each row finishes, in completion order; the
    /// result lists rows in dataset order. Once `cancel` is set no further row
    /// starts and rows already rendering are kept.
    pub async fn generate_parallel<F>(
        &self,
        template: Arc<[u8]>,
        dataset: &Dataset,
        cancel: CancellationFlag,
        mut on_progress: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(BatchProgress),
    {
        let placeholders: Arc<[String]> = self.template_placeholders(&template, dataset)?.into();
        let mut rows = self.selected_rows(dataset).into_iter();
        let total = rows.len();
        let concurrency = self.options.concurrency.max(1);

        let mut tasks: JoinSet<(usize, RowOutcome)> = JoinSet::new();
        let mut outcomes = Vec::with_capacity(total);
        loop {
            while tasks.len() < concurrency && !cancel.is_cancelled() {
                let Some((index, row)) = rows.next() else {
                    break;
                };
                let generator = self.clone();
                let template = Arc::clone(&template);
                let placeholders = Arc::clone(&placeholders);
                let row = row.clone();
                tasks.spawn(async move {
                    let outcome = tokio::task::spawn_blocking(move || {
                        generator.render_row(&template, &placeholders, index, &row)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(RowError {
                            row_index: index,
                            message: format!("render task failed: {}", e),
                        })
                    });
                    (index, outcome)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let (index, outcome) = joined.map_err(|e| MailMergeError::Worker(e.to_string()))?;
            outcomes.push((index, outcome));
            on_progress(BatchProgress::at(outcomes.len(), total));
        }

        outcomes.sort_by_key(|(index, _)| *index);
        let mut result = BatchResult::new(total);
        for (_, outcome) in outcomes {
            result.record(outcome);
        }
        result.finish(cancel.is_cancelled());
        Ok(result)
    }

    /// Placeholders of the template, after warning about ones no column feeds
    fn template_placeholders(&self, template: &[u8], dataset: &Dataset) -> Result<Vec<String>> {
        let placeholders = extract_from_docx(template)?;
        let mut unbound = self.mapping.unbound(&placeholders, dataset);
        if let Some(qr) = &self.qr {
            unbound.retain(|p| p != &self.renderer.options().qr_placeholder);
            let missing = self.mapping.unbound(&qr.fields, dataset);
            if !missing.is_empty() {
                tracing::warn!("No column for QR pattern fields {:?}; they will be empty", missing);
            }
        }
        if !unbound.is_empty() {
            tracing::warn!("No column for placeholders {:?}; they will stay as text", unbound);
        }
        Ok(placeholders)
    }

    fn selected_rows<'a>(&self, dataset: &'a Dataset) -> Vec<(usize, &'a DataRow)> {
        let limit = match self.options.max_records {
            0 => dataset.row_count(),
            n => n,
        };
        dataset.rows.iter().enumerate().take(limit).collect()
    }

    fn render_row(
        &self,
        template: &[u8],
        placeholders: &[String],
        index: usize,
        row: &DataRow,
    ) -> RowOutcome {
        let fail = |message: String| RowError { row_index: index, message };
        let values = self.mapping.resolve(placeholders, row, self.options.trim_values);

        let payload = match &self.qr {
            Some(qr) => {
                let fields = self.mapping.resolve(&qr.fields, row, self.options.trim_values);
                let text = qr.pattern.resolve(&fields);
                Some(qr.encoder.encode(&text).map_err(|e| fail(e.to_string()))?)
            }
            None => None,
        };
        let mut ctx = RenderContext::new(template, &values);
        if let Some(payload) = payload.as_deref() {
            ctx = ctx.with_qr_image(payload);
        }

        let rendered = self.renderer.render(&ctx).map_err(|e| fail(e.to_string()))?;
        Ok(GeneratedCertificate {
            row_index: index,
            output_name: output_name(&self.options.output_name_pattern, index, row),
            data: rendered.data,
            qr_placement: rendered.qr_placement,
            unmatched: rendered.unmatched,
        })
    }
}

/// Expand `{index}` and `{Column}` tokens, keeping names filesystem safe
fn output_name(pattern: &str, index: usize, row: &DataRow) -> String {
    let mut name = pattern.replace("{index}", &(index + 1).to_string());
    let cells: HashMap<&str, String> = row.iter().map(|(k, v)| (k.as_str(), v.display_string())).collect();
    for (column, value) in cells {
        let token = format!("{{{}}}", column);
        if name.contains(&token) {
            name = name.replace(&token, &sanitize(value.trim()));
        }
    }
    name
}

/// Suffix repeated output names with the row number so no file overwrites
/// another. Names are compared case-insensitively.
fn unique_output_names(certificates: &mut [GeneratedCertificate]) {
    let mut taken = HashSet::new();
    for certificate in certificates {
        if taken.insert(certificate.output_name.to_lowercase()) {
            continue;
        }
        let name = &certificate.output_name;
        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name.as_str(), ""),
        };
        let mut n = certificate.row_index + 1;
        let unique = loop {
            let candidate = format!("{}_{}{}", stem, n, extension);
            if taken.insert(candidate.to_lowercase()) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(
            "Row {} would overwrite {}, writing {} instead",
            certificate.row_index + 1,
            name,
            unique
        );
        certificate.output_name = unique;
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, DataType, Value};
    use crate::mapping::PlaceholderBinding;
    use docx_template::DocxPackage;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn template(body: &str) -> Vec<u8> {
        let document = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn certificate_template() -> Vec<u8> {
        template("<w:p><w:r><w:t>{{Name}} / {{CertificateNo}}</w:t></w:r></w:p><w:p><w:r><w:t>{{QRCode}}</w:t></w:r></w:p>")
    }

    fn dataset(names: &[&str]) -> Dataset {
        let mut dataset = Dataset::new("people");
        dataset.push_column(Column::new("Full Name", DataType::Text));
        dataset.push_column(Column::new("CertificateNo", DataType::Text));
        for (i, name) in names.iter().enumerate() {
            let mut row = DataRow::new();
            row.insert("Full Name".into(), Value::from(*name));
            row.insert("CertificateNo".into(), Value::from(format!("CERT{:03}", i + 1)));
            dataset.push_row(row);
        }
        dataset
    }

    fn generator() -> BatchGenerator {
        BatchGenerator::new(
            Renderer::new(),
            FieldMapping::new().with_binding(PlaceholderBinding::new("Name", "Full Name")),
            BatchOptions::default().with_output_pattern("{CertificateNo}_{Full Name}.docx"),
        )
    }

    fn body(certificate: &GeneratedCertificate) -> String {
        DocxPackage::from_bytes(&certificate.data)
            .unwrap()
            .read_xml("word/document.xml")
            .unwrap()
    }

    struct Recording(std::sync::Mutex<Vec<String>>);

    impl QrEncoder for Recording {
        fn encode(&self, text: &str) -> Result<String> {
            if text.ends_with("CERT002") {
                return Err(MailMergeError::QrEncode("too long".into()));
            }
            self.0.lock().unwrap().push(text.to_string());
            Ok(PNG.to_string())
        }
    }

    #[test]
    fn test_generate_every_row() {
        let result = generator().generate(&certificate_template(), &dataset(&["Asha Rao", "Ravi"])).unwrap();
        assert!(result.is_success());
        assert_eq!(result.success_count, 2);
        assert_eq!(result.certificates[0].output_name, "CERT001_Asha_Rao.docx");
        assert!(body(&result.certificates[0]).contains("Asha Rao / CERT001"));
        assert!(body(&result.certificates[1]).contains("Ravi / CERT002"));
        assert_eq!(result.certificates[0].unmatched, vec!["QRCode"]);
    }

    #[test]
    fn test_qr_per_row_and_failures_do_not_abort() {
        let encoder = Arc::new(Recording(Default::default()));
        let generator = generator().with_qr(QrPattern::new("https://verify.example/{{CertificateNo}}"), encoder.clone());
        let result = generator
            .generate(&certificate_template(), &dataset(&["Asha", "Ravi", "Meena"]))
            .unwrap();

        assert_eq!(result.status, BatchStatus::Completed);
        assert_eq!((result.success_count, result.failure_count), (2, 1));
        assert_eq!(result.errors[0].row_index, 1);
        assert!(matches!(result.certificates[0].qr_placement, Some(QrPlacement::Inline { count: 1, .. })));
        assert!(!body(&result.certificates[1]).contains("{{QRCode}}"));
        assert_eq!(
            *encoder.0.lock().unwrap(),
            vec!["https://verify.example/CERT001", "https://verify.example/CERT003"]
        );
        assert!((result.success_rate() - 66.66).abs() < 0.1);
    }

    #[test]
    fn test_qr_pattern_reads_columns_the_template_lacks() {
        let encoder = Arc::new(Recording(Default::default()));
        let bytes = template("<w:p><w:r><w:t>{{Name}}</w:t></w:r></w:p><w:p><w:r><w:t>{{QRCode}}</w:t></w:r></w:p>");
        let generator = generator().with_qr(
            QrPattern::new("https://verify.example/{{CertificateNo}}?n={{Name}}"),
            encoder.clone(),
        );

        let result = generator.generate(&bytes, &dataset(&[" Asha "])).unwrap();
        assert!(result.is_success());
        assert_eq!(*encoder.0.lock().unwrap(), vec!["https://verify.example/CERT001?n=Asha"]);
        assert!(!body(&result.certificates[0]).contains("CERT001"));
    }

    #[test]
    fn test_every_row_failing_is_failed() {
        let bad = template("<w:p><w:r><w:t>{{Name}} {{ }}</w:t></w:r></w:p>");
        let result = generator().generate(&bad, &dataset(&["Asha"])).unwrap();
        assert_eq!(result.status, BatchStatus::Failed);
        assert!(result.errors[0].message.contains("empty tag"));
    }

    #[test]
    fn test_unreadable_template_fails_batch() {
        let err = generator().generate(b"not a docx", &dataset(&["Asha"])).unwrap_err();
        assert!(matches!(err, MailMergeError::Render(_)));
    }

    #[test]
    fn test_progress_max_records_and_cancel() {
        let generator = BatchGenerator::new(Renderer::new(), FieldMapping::new(), BatchOptions::default().with_max_records(2));
        let mut seen = Vec::new();
        let result = generator
            .generate_with_progress(&certificate_template(), &dataset(&["a", "b", "c"]), &CancellationFlag::new(), |p| {
                seen.push(p.current)
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.certificates[1].output_name, "certificate_2.docx");

        let cancel = CancellationFlag::new();
        cancel.cancel();
        let result = generator
            .generate_with_progress(&certificate_template(), &dataset(&["a"]), &cancel, |_| {})
            .unwrap();
        assert_eq!(result.status, BatchStatus::Cancelled);
        assert!(result.certificates.is_empty());
    }

    #[tokio::test]
    async fn test_generate_parallel_keeps_row_order() {
        let names: Vec<String> = (0..12).map(|i| format!("Person {}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let generator = generator()
            .with_qr(QrPattern::new("{{CertificateNo}}"), Arc::new(FixedImage::new(PNG)));
        let template: Arc<[u8]> = certificate_template().into();

        let mut progress = 0;
        let result = generator
            .generate_parallel(template, &dataset(&refs), CancellationFlag::new(), |p| progress = p.current)
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(progress, 12);
        let order: Vec<usize> = result.certificates.iter().map(|c| c.row_index).collect();
        assert_eq!(order, (0..12).collect::<Vec<_>>());
        assert!(body(&result.certificates[7]).contains("Person 7 / CERT008"));
    }

    /// Logs encoder calls and progress reports into one timeline
    struct Timeline(Arc<std::sync::Mutex<Vec<String>>>);

    impl QrEncoder for Timeline {
        fn encode(&self, text: &str) -> Result<String> {
            self.0.lock().unwrap().push(format!("encode {}", text));
            Ok(PNG.to_string())
        }
    }

    #[tokio::test]
    async fn test_generate_parallel_reports_each_row_as_it_finishes() {
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let generator = BatchGenerator::new(Renderer::new(), FieldMapping::new(), BatchOptions::default().with_concurrency(1))
            .with_qr(QrPattern::new("{{CertificateNo}}"), Arc::new(Timeline(events.clone())));

        let progress_events = events.clone();
        let result = generator
            .generate_parallel(certificate_template().into(), &dataset(&["a", "b", "c"]), CancellationFlag::new(), |p| {
                progress_events.lock().unwrap().push(format!("progress {}/{}", p.current, p.total))
            })
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "encode CERT001",
                "progress 1/3",
                "encode CERT002",
                "progress 2/3",
                "encode CERT003",
                "progress 3/3",
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_parallel_cancel_mid_batch_keeps_finished_rows() {
        let cancel = CancellationFlag::new();
        let generator = BatchGenerator::new(Renderer::new(), FieldMapping::new(), BatchOptions::default().with_concurrency(1));
        let on_progress = cancel.clone();
        let result = generator
            .generate_parallel(certificate_template().into(), &dataset(&["a", "b", "c"]), cancel, |p| {
                if p.current == 1 {
                    on_progress.cancel();
                }
            })
            .await
            .unwrap();

        assert_eq!(result.status, BatchStatus::Cancelled);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.certificates[0].row_index, 0);
    }

    #[tokio::test]
    async fn test_generate_parallel_cancelled_up_front() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let result = generator()
            .generate_parallel(certificate_template().into(), &dataset(&["a", "b"]), cancel, |_| {})
            .await
            .unwrap();
        assert_eq!(result.status, BatchStatus::Cancelled);
        assert_eq!(result.success_count, 0);
    }

    #[test]
    fn test_output_name_sanitizes() {
        let mut row = DataRow::new();
        row.insert("Name".into(), Value::from(" A/B: C "));
        assert_eq!(output_name("{index}-{Name}.docx", 4, &row), "5-A_B__C.docx");
        assert_eq!(output_name("{Missing}.docx", 0, &row), "{Missing}.docx");
    }

    fn named(row_index: usize, output_name: &str) -> GeneratedCertificate {
        GeneratedCertificate {
            row_index,
            output_name: output_name.to_string(),
            data: Vec::new(),
            qr_placement: None,
            unmatched: Vec::new(),
        }
    }

    #[test]
    fn test_unique_output_names() {
        let mut certificates = vec![
            named(0, "Asha.docx"),
            named(1, "asha.docx"),
            named(2, "Asha.docx"),
            named(3, "Asha_3.docx"),
            named(4, "README"),
            named(5, "README"),
        ];
        unique_output_names(&mut certificates);
        let names: Vec<&str> = certificates.iter().map(|c| c.output_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Asha.docx", "asha_2.docx", "Asha_3.docx", "Asha_3_4.docx", "README", "README_6"]
        );
    }

    #[test]
    fn test_repeated_names_in_a_batch_do_not_collide() {
        let generator = BatchGenerator::new(
            Renderer::new(),
            FieldMapping::new(),
            BatchOptions::default().with_output_pattern("{Full Name}.docx"),
        );
        let result = generator
            .generate(&certificate_template(), &dataset(&["Asha Rao", "Ravi", "Asha Rao"]))
            .unwrap();
        let names: Vec<&str> = result.certificates.iter().map(|c| c.output_name.as_str()).collect();
        assert_eq!(names, vec!["Asha_Rao.docx", "Ravi.docx", "Asha_Rao_3.docx"]);
    }

    #[test]
    fn test_options_serde_defaults() {
        let options: BatchOptions = serde_json::from_str(r#"{"concurrency": 8}"#).unwrap();
        assert_eq!(options.concurrency, 8);
        assert_eq!(options.output_name_pattern, "certificate_{index}.docx");
        assert!(options.trim_values);
    }
}
