use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::dataset::Dimension;

/// Which dimensions each dashboard panel is computed over. Every field can be
/// overridden from a JSON file; omitted fields keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub describe: Vec<Dimension>,
    pub segments: Vec<Dimension>,
    pub key_factors: Vec<Dimension>,
    pub heatmap_rows: Dimension,
    pub heatmap_columns: Dimension,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            describe: vec![
                Dimension::Tenure,
                Dimension::MonthlyCharges,
                Dimension::TotalCharges,
            ],
            segments: vec![
                Dimension::Gender,
                Dimension::CitizensStatus,
                Dimension::Contract,
                Dimension::TechSupport,
                Dimension::InternetService,
                Dimension::PaymentMethod,
            ],
            key_factors: vec![
                Dimension::Churn,
                Dimension::CitizensStatus,
                Dimension::Contract,
                Dimension::TechSupport,
                Dimension::InternetService,
            ],
            heatmap_rows: Dimension::TotalChargeRange,
            heatmap_columns: Dimension::Contract,
        }
    }
}

impl PanelConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading panel config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing panel config {}", path.display()))
    }
}
