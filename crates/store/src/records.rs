//! Records kept about templates, datasets and generation runs

use chrono::{DateTime, Utc};
use mail_merge::{BatchResult, BatchStatus, Dataset};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Anything a [`crate::Repository`] can hold
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in errors and as the file stem of file-backed collections
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

/// An uploaded certificate template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    pub file_name: String,
    /// Placeholder names found after repair
    pub placeholders: Vec<String>,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRecord {
    pub fn new(name: impl Into<String>, file_name: impl Into<String>, placeholders: Vec<String>, size_bytes: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            file_name: file_name.into(),
            placeholders,
            size_bytes,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for TemplateRecord {
    const KIND: &'static str = "template";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// An uploaded recipient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: Uuid,
    pub name: String,
    pub file_name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

impl DatasetRecord {
    pub fn from_dataset(file_name: impl Into<String>, dataset: &Dataset) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: dataset.id.clone(),
            file_name: file_name.into(),
            columns: dataset.column_names().into_iter().map(String::from).collect(),
            row_count: dataset.row_count(),
            created_at: Utc::now(),
        }
    }
}

impl Record for DatasetRecord {
    const KIND: &'static str = "dataset";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl From<BatchStatus> for JobStatus {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Completed => JobStatus::Completed,
            BatchStatus::Failed => JobStatus::Failed,
            BatchStatus::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// A failed row as remembered by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRowError {
    pub row_index: usize,
    pub message: String,
}

/// One batch run of a template over a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub template_id: Uuid,
    pub dataset_id: Uuid,
    pub status: JobStatus,
    pub total_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    #[serde(default)]
    pub errors: Vec<JobRowError>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(template_id: Uuid, dataset_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_id,
            dataset_id,
            status: JobStatus::Pending,
            total_rows: 0,
            success_count: 0,
            failure_count: 0,
            errors: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self, total_rows: usize) {
        self.status = JobStatus::Running;
        self.total_rows = total_rows;
        self.started_at = Some(Utc::now());
    }

    /// Copy the outcome of a finished batch into the job
    pub fn finish(&mut self, result: &BatchResult) {
        self.status = result.status.into();
        self.total_rows = result.total_rows;
        self.success_count = result.success_count;
        self.failure_count = result.failure_count;
        self.errors = result
            .errors
            .iter()
            .map(|e| JobRowError {
                row_index: e.row_index,
                message: e.message.clone(),
            })
            .collect();
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

impl Record for GenerationJob {
    const KIND: &'static str = "job";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A certificate file produced by a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub row_index: usize,
    pub file_name: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

impl CertificateRecord {
    pub fn new(job_id: Uuid, row_index: usize, file_name: impl Into<String>, size_bytes: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            row_index,
            file_name: file_name.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }
}

impl Record for CertificateRecord {
    const KIND: &'static str = "certificate";

    fn id(&self) -> Uuid {
        self.id
    }
}
