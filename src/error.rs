//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a tabulation run. None of these are recovered.
#[derive(Error, Debug)]
pub enum TabulateError {
    /// Invalid combination of requested outputs and flags.
    #[error("{0}")]
    Config(String),

    #[error("classification database has no `{0}` table")]
    MissingTable(String),

    #[error("database query failed: {0}")]
    Schema(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("metadata map {} has no `specimen` column", path.display())]
    MissingSpecimenColumn { path: PathBuf },

    #[error("specimen map line {line}: expected 2 fields (name, specimen), found {fields}")]
    MalformedSpecimenMap { line: u64, fields: usize },
}

impl TabulateError {
    pub fn is_config(&self) -> bool {
        matches!(self, TabulateError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, TabulateError>;
