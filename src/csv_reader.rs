use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::dataset::{Record, Table};
use crate::error::LoadError;

const REQUIRED_COLUMNS: &[&str] = &[
    "customerID",
    "gender",
    "CitizensStatus",
    "tenure",
    "Contract",
    "TechSupport",
    "InternetService",
    "PaymentMethod",
    "MonthlyCharges",
    "TotalCharges",
    "Churn",
];

pub fn read_data(path: &Path) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_from_reader(file, &path.display().to_string())
}

/// Reads a delimited table from any reader. `origin` names the source in errors.
pub fn read_from_reader<R: Read>(reader: R, origin: &str) -> Result<Table, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let csv_error = |source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };

    let headers = rdr.headers().map_err(csv_error)?.clone();
    for &column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn {
                origin: origin.to_string(),
                column,
            });
        }
    }

    let mut records = Vec::<Record>::new();
    for result in rdr.deserialize() {
        let record: Record = result.map_err(csv_error)?;
        records.push(record);
    }
    Ok(Table::new(origin, records))
}

/// Blank cells are missing values; anything else must parse as a number.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("expected a number, found {trimmed:?}")))
}
