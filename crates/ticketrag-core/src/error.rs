use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not find {}. {hint}", path.display())]
    MissingFile { path: PathBuf, hint: String },

    #[error("Column '{column}' is missing from {}. {hint}", path.display())]
    MissingColumn { column: String, path: PathBuf, hint: String },

    #[error("The table at {} has no rows. Verify earlier preprocessing steps produced data.", path.display())]
    EmptyTable { path: PathBuf },

    #[error("The similarity index is empty. Re-run the indexer after preparing data.")]
    EmptyIndex,

    #[error("CSV error in {}: {source}", path.display())]
    Csv { path: PathBuf, #[source] source: csv::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
