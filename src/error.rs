use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures of the referral pipeline.
///
/// Missing foreign-key matches and unparseable timestamps/timezones are not
/// errors; they resolve to nulls or fallbacks during cleaning and joining.
/// Only structural problems abort a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("table '{table}' is missing required column '{column}'")]
    SchemaMismatch { table: String, column: String },

    #[error("referrals table is missing or empty")]
    MissingReferrals,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
