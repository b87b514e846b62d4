use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::DimensionKind;

/// Failure to bring the source table into memory. Always fatal for a render pass.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{origin} is missing required column `{column}`")]
    MissingColumn { origin: String, column: &'static str },
    #[error("malformed row in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },
}

/// Failure of a single computation. Only the panel that asked for it is affected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashError {
    #[error("unmapped value {value:?} in column `{column}` at row {row}")]
    UnmappedValue {
        column: &'static str,
        row: usize,
        value: String,
    },
    #[error("dimension `{dimension}` is not {expected}")]
    TypeMismatch {
        dimension: &'static str,
        expected: DimensionKind,
    },
    #[error("unknown dimension `{0}`")]
    UnknownDimension(String),
}

pub type Result<T> = std::result::Result<T, DashError>;
