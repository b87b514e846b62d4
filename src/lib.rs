//! churn_dash: a read-only churn dashboard over a telco customer CSV.
//!
//! The data path is `csv_reader` → `cache` → `derive` → {`aggregate`,
//! `crosstab`, `charts`} → `report`, rendered by `ui` or printed as text/JSON.

pub mod aggregate;
pub mod cache;
pub mod charts;
pub mod cli;
pub mod config;
pub mod crosstab;
pub mod csv_reader;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod report;
pub mod ui;

pub use aggregate::{describe, group_summary, GroupOrder, GroupSummary, NumericSummary, Percent};
pub use cache::{Refresh, SnapshotCache};
pub use cli::Args;
pub use config::PanelConfig;
pub use crosstab::{cross_tab, CrossTab};
pub use dataset::{Dimension, DimensionKind, Record, Table};
pub use derive::{derive, DerivedTable};
pub use error::{DashError, LoadError};
pub use report::{DashboardReport, Panel};
