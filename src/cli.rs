//! Command-line interface definitions

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Terminal dashboard over a telco customer-churn CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the churn CSV file
    #[arg(short, long, default_value = "telecom_churned_data.csv")]
    pub data: PathBuf,

    /// Print every panel as text and exit instead of opening the dashboard
    #[arg(short, long)]
    pub report: bool,

    /// With --report, print JSON instead of text
    #[arg(long, requires = "report")]
    pub json: bool,

    /// JSON file overriding which dimensions each panel uses
    #[arg(short, long)]
    pub panels: Option<PathBuf>,

    /// Milliseconds between refresh ticks; the source file is re-checked on every tick
    #[arg(long, default_value = "200")]
    pub tick_ms: u64,

    /// Log file (the terminal belongs to the dashboard)
    #[arg(long, default_value = "churn_dash.log")]
    pub log_file: PathBuf,

    /// Log filter, e.g. "info" or "churn_dash=debug"
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}
