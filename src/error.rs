use thiserror::Error;

use crate::version::VersionId;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed revision '{0}': expected four dot-separated numeric components")]
    MalformedRevision(String),

    #[error("Sample for '{name}' build {build} unavailable: {reason}")]
    SampleUnavailable {
        name: String,
        build: VersionId,
        reason: String,
    },

    #[error("No shared record keys between builds {target} and {candidate}")]
    NoSharedKeys {
        target: VersionId,
        candidate: VersionId,
    },

    #[error("Ambiguous mapping for '{column}': {candidates}")]
    AmbiguousMapping { column: String, candidates: String },

    #[error("Column '{column}' is defined but missing from the sample for build {build}")]
    StructuralMismatch { column: String, build: VersionId },

    #[error("Id column '{0}' not found in sample header")]
    MissingIdColumn(String),

    #[error("Invalid record id '{value}'")]
    InvalidRecordId { value: String },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
