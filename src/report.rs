//! One render pass: every dashboard panel computed from a derived snapshot.
//!
//! Panels are independent. A computation that fails (a categorical column
//! asked for statistics, a churn value that cannot be mapped) is recorded as
//! [`Panel::Failed`] and the remaining panels are still produced.

use std::fmt::{self, Write};

use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{
    churn_rate, column_mean, describe, distribution, group_summary, GroupOrder, GroupSummary,
    NumericSummary, Percent, ShareRow,
};
use crate::charts::{box_series, count_series, regression, BoxStats, CountSeries, Regression};
use crate::config::PanelConfig;
use crate::crosstab::{cross_tab, CrossTab};
use crate::dataset::Dimension;
use crate::derive::DerivedTable;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Failed(String),
}

impl<T> Panel<T> {
    fn compute(title: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => {
                debug!(panel = title, "panel ready");
                Panel::Ready(value)
            }
            Err(err) => {
                warn!(panel = title, %err, "panel failed");
                Panel::Failed(err.to_string())
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Panel::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Titled<T> {
    pub title: String,
    pub panel: Panel<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_customers: usize,
    pub churn_rate: Panel<Percent>,
    pub avg_monthly_charges: Panel<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeExtremes {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub source: String,
    pub metrics: Metrics,
    pub churn_distribution: Panel<Vec<ShareRow>>,
    pub descriptive: Panel<Vec<NumericSummary>>,
    pub segments: Vec<Titled<GroupSummary>>,
    pub key_factors: Vec<Titled<CountSeries>>,
    pub monthly_by_churn: Panel<Vec<BoxStats>>,
    pub charge_range: Panel<GroupSummary>,
    pub charge_range_counts: Panel<CountSeries>,
    pub churn_vs_charges: Panel<Regression>,
    pub heatmap: Panel<CrossTab>,
    pub total_charges: Panel<ChargeExtremes>,
}

impl DashboardReport {
    pub fn build(table: &DerivedTable, config: &PanelConfig) -> Self {
        let metrics = Metrics {
            total_customers: table.len(),
            churn_rate: Panel::compute("churn rate", churn_rate(table)),
            avg_monthly_charges: Panel::compute(
                "average monthly charges",
                column_mean(table, Dimension::MonthlyCharges),
            ),
        };

        let segments = config
            .segments
            .iter()
            .map(|&dimension| {
                let title = format!("Churn by {}", dimension.label());
                let order = GroupOrder::for_dimension(dimension);
                let panel = Panel::compute(&title, group_summary(table, dimension, order));
                Titled { title, panel }
            })
            .collect();

        let key_factors = config
            .key_factors
            .iter()
            .map(|&dimension| {
                let title = if dimension == Dimension::Churn {
                    "Customers Churn Count".to_string()
                } else {
                    format!("Churn by {}", dimension.label())
                };
                let panel = Panel::compute(&title, count_series(table, dimension));
                Titled { title, panel }
            })
            .collect();

        let total_charges = describe(table, &[Dimension::TotalCharges]).map(|stats| {
            let stats = &stats[0];
            ChargeExtremes {
                min: stats.min,
                max: stats.max,
            }
        });

        DashboardReport {
            source: table.base().origin().to_string(),
            metrics,
            churn_distribution: Panel::compute(
                "churn distribution",
                distribution(table, Dimension::Churn),
            ),
            descriptive: Panel::compute("descriptive statistics", describe(table, &config.describe)),
            segments,
            key_factors,
            monthly_by_churn: Panel::compute(
                "monthly charges vs churn",
                box_series(table, Dimension::MonthlyCharges, Dimension::Churn),
            ),
            charge_range: Panel::compute(
                "churn by monthly charge range",
                group_summary(table, Dimension::ChargeRange, GroupOrder::Natural),
            ),
            charge_range_counts: Panel::compute(
                "monthly charge range counts",
                count_series(table, Dimension::ChargeRange),
            ),
            churn_vs_charges: Panel::compute(
                "churn probability vs monthly charges",
                regression(table, Dimension::MonthlyCharges, Dimension::ChurnBinary),
            ),
            heatmap: Panel::compute(
                "churn heatmap",
                cross_tab(table, config.heatmap_rows, config.heatmap_columns),
            ),
            total_charges: Panel::compute("total charges summary", total_charges),
        }
    }

    pub fn failed_panels(&self) -> usize {
        let fixed = [
            self.metrics.churn_rate.is_failed(),
            self.metrics.avg_monthly_charges.is_failed(),
            self.churn_distribution.is_failed(),
            self.descriptive.is_failed(),
            self.monthly_by_churn.is_failed(),
            self.charge_range.is_failed(),
            self.charge_range_counts.is_failed(),
            self.churn_vs_charges.is_failed(),
            self.heatmap.is_failed(),
            self.total_charges.is_failed(),
        ];
        fixed.iter().filter(|&&failed| failed).count()
            + self.segments.iter().filter(|s| s.panel.is_failed()).count()
            + self.key_factors.iter().filter(|s| s.panel.is_failed()).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn fmt_number(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

/// Left-aligned first column, right-aligned numbers.
fn write_table(f: &mut fmt::Formatter, headers: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    write_row(f, &headers, &widths)?;
    for row in rows {
        write_row(f, row, &widths)?;
    }
    Ok(())
}

fn write_row(f: &mut fmt::Formatter, cells: &[String], widths: &[usize]) -> fmt::Result {
    for (i, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if i == 0 {
            write!(f, "  {cell:<width$}")?;
        } else {
            write!(f, "  {cell:>width$}")?;
        }
    }
    f.write_char('\n')
}

fn write_panel<T>(
    f: &mut fmt::Formatter,
    title: &str,
    panel: &Panel<T>,
    body: impl FnOnce(&mut fmt::Formatter, &T) -> fmt::Result,
) -> fmt::Result {
    writeln!(f, "\n== {title}")?;
    match panel {
        Panel::Ready(value) => body(f, value),
        Panel::Failed(message) => writeln!(f, "  unavailable: {message}"),
    }
}

pub(crate) fn group_rows(summary: &GroupSummary) -> Vec<Vec<String>> {
    summary
        .rows
        .iter()
        .map(|row| {
            vec![
                row.value.clone(),
                row.total.to_string(),
                row.churned.to_string(),
                row.retained.to_string(),
                format!("{:.2}", row.percentage),
            ]
        })
        .collect()
}

pub(crate) const GROUP_HEADERS: [&str; 5] = ["Value", "Total", "Churned", "Not Churned", "Percentage%"];

fn write_group(f: &mut fmt::Formatter, summary: &GroupSummary) -> fmt::Result {
    write_table(f, &GROUP_HEADERS, &group_rows(summary))?;
    if summary.missing > 0 {
        writeln!(f, "  ({} records without a {} value)", summary.missing, summary.dimension)?;
    }
    Ok(())
}

pub(crate) fn describe_rows(stats: &[NumericSummary]) -> Vec<Vec<String>> {
    stats
        .iter()
        .map(|s| {
            vec![
                s.dimension.name().to_string(),
                s.count.to_string(),
                fmt_number(s.mean, 2),
                fmt_number(s.std, 2),
                fmt_number(s.min, 2),
                fmt_number(s.q1, 2),
                fmt_number(s.median, 2),
                fmt_number(s.q3, 2),
                fmt_number(s.max, 2),
            ]
        })
        .collect()
}

pub(crate) const DESCRIBE_HEADERS: [&str; 9] =
    ["Column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Telco Customer Churn Dashboard ({})", self.source)?;
        writeln!(f, "  Total Customers: {}", self.metrics.total_customers)?;
        match &self.metrics.churn_rate {
            Panel::Ready(rate) => writeln!(f, "  Churn Rate: {rate:.2}%")?,
            Panel::Failed(message) => writeln!(f, "  Churn Rate: unavailable ({message})")?,
        }
        match &self.metrics.avg_monthly_charges {
            Panel::Ready(avg) => writeln!(f, "  Avg. Monthly Charges: ${}", fmt_number(*avg, 2))?,
            Panel::Failed(message) => writeln!(f, "  Avg. Monthly Charges: unavailable ({message})")?,
        }

        write_panel(f, "Churn Distribution", &self.churn_distribution, |f, shares| {
            let rows: Vec<Vec<String>> = shares
                .iter()
                .map(|s| vec![s.value.clone(), s.count.to_string(), format!("{:.2}", s.percentage)])
                .collect();
            write_table(f, &["Churn", "Count", "Percentage"], &rows)
        })?;

        write_panel(f, "Descriptive Statistics", &self.descriptive, |f, stats| {
            write_table(f, &DESCRIBE_HEADERS, &describe_rows(stats))
        })?;

        for segment in &self.segments {
            write_panel(f, &segment.title, &segment.panel, write_group)?;
        }

        write_panel(f, "MonthlyCharges vs Churn", &self.monthly_by_churn, |f, boxes| {
            let rows: Vec<Vec<String>> = boxes
                .iter()
                .map(|b| {
                    vec![
                        b.group.clone(),
                        b.count.to_string(),
                        format!("{:.2}", b.lower_whisker),
                        format!("{:.2}", b.q1),
                        format!("{:.2}", b.median),
                        format!("{:.2}", b.q3),
                        format!("{:.2}", b.upper_whisker),
                        b.outliers.to_string(),
                    ]
                })
                .collect();
            write_table(
                f,
                &["Churn", "n", "low", "25%", "50%", "75%", "high", "outliers"],
                &rows,
            )
        })?;

        write_panel(f, "Churn by Monthly Charge Range", &self.charge_range, write_group)?;

        write_panel(f, "Churn Probability vs. Monthly Charges", &self.churn_vs_charges, |f, fit| {
            match (fit.slope, fit.intercept) {
                (Some(slope), Some(intercept)) => writeln!(
                    f,
                    "  P(churn) = {intercept:.4} + {slope:.6} * MonthlyCharges  ({} points)",
                    fit.points.len()
                ),
                _ => writeln!(f, "  no trend line ({} points)", fit.points.len()),
            }
        })?;

        write_panel(f, "Heatmap: Churn %", &self.heatmap, |f, grid| {
            let mut headers = vec![grid.rows.name()];
            headers.extend(grid.column_labels.iter().map(String::as_str));
            let rows: Vec<Vec<String>> = grid
                .observed_rows()
                .map(|r| {
                    let mut cells = vec![grid.row_labels[r].clone()];
                    cells.extend(
                        grid.counts[r]
                            .iter()
                            .zip(&grid.churn_rate[r])
                            .map(|(count, rate)| format!("{rate:.1} ({count})")),
                    );
                    cells
                })
                .collect();
            write_table(f, &headers, &rows)?;
            if grid.outside > 0 {
                writeln!(f, "  ({} records outside the grid)", grid.outside)?;
            }
            Ok(())
        })?;

        write_panel(f, "TotalCharges Summary", &self.total_charges, |f, extremes| {
            write_table(
                f,
                &["Statistic", "TotalCharges"],
                &[
                    vec!["Minimum".to_string(), fmt_number(extremes.min, 2)],
                    vec!["Maximum".to_string(), fmt_number(extremes.max, 2)],
                ],
            )
        })
    }
}
