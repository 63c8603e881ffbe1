use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolarityError {
    #[error("no input files found in {}", .0.display())]
    NoInputFiles(PathBuf),
    #[error("invalid input path (need a .csv file or a directory): {}", .0.display())]
    InvalidInputPath(PathBuf),
    #[error("no data loaded")]
    NoDataLoaded,
    #[error("{}: missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}: line {line}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
