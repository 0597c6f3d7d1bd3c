//! Store - records and settings for certificate generation
//!
//! This crate keeps track of uploaded templates and datasets, generation
//! jobs and the certificates they produced, behind the [`Repository`]
//! contract. It also persists the render and batch settings.

mod error;
mod records;
mod repository;
mod settings;

pub use error::*;
pub use records::{
    CertificateRecord, DatasetRecord, GenerationJob, JobRowError, JobStatus, Record, TemplateRecord,
};
pub use repository::{JsonFileRepository, MemoryRepository, Repository};
pub use settings::{CertificateSettings, SettingsManager};
