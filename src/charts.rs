//! Point sets behind the dashboard charts: count bars split by churn, box
//! summaries and a least-squares trend line.

use serde::Serialize;

use crate::aggregate::quantile;
use crate::crosstab::cross_tab;
use crate::dataset::Dimension;
use crate::derive::DerivedTable;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountPoint {
    pub x: String,
    pub hue: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountSeries {
    pub x: Dimension,
    pub hue: Dimension,
    pub points: Vec<CountPoint>,
}

impl CountSeries {
    /// Bars for one hue value, in x order.
    pub fn bars(&self, hue: &str) -> Vec<(&str, u64)> {
        self.points
            .iter()
            .filter(|p| p.hue == hue)
            .map(|p| (p.x.as_str(), p.count as u64))
            .collect()
    }
}

/// Record counts per value of `x`, split by churn outcome.
pub fn count_series(table: &DerivedTable, x: Dimension) -> Result<CountSeries> {
    let grid = cross_tab(table, x, Dimension::Churn)?;
    let mut points = Vec::with_capacity(grid.row_labels.len() * grid.column_labels.len());
    for (r, x_value) in grid.row_labels.iter().enumerate() {
        for (c, hue) in grid.column_labels.iter().enumerate() {
            points.push(CountPoint {
                x: x_value.clone(),
                hue: hue.clone(),
                count: grid.counts[r][c],
            });
        }
    }
    Ok(CountSeries {
        x,
        hue: Dimension::Churn,
        points,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub group: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme values within 1.5 IQR of the box.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: usize,
}

/// Box-plot summary of a numeric dimension for every non-empty group of `by`.
pub fn box_series(table: &DerivedTable, value: Dimension, by: Dimension) -> Result<Vec<BoxStats>> {
    let values = table.numeric_column(value)?;
    let axis = table.axis(by)?;
    let mut groups: Vec<Vec<f64>> = vec![Vec::new(); axis.labels.len()];
    for (v, position) in values.into_iter().zip(&axis.positions) {
        if let (Some(v), Some(index)) = (v, position) {
            groups[*index].push(v);
        }
    }

    Ok(axis
        .labels
        .into_iter()
        .zip(groups)
        .filter_map(|(group, mut sorted)| {
            sorted.sort_by(f64::total_cmp);
            let q1 = quantile(&sorted, 0.25)?;
            let median = quantile(&sorted, 0.5)?;
            let q3 = quantile(&sorted, 0.75)?;
            let reach = 1.5 * (q3 - q1);
            let inside = sorted.iter().filter(|&&v| v >= q1 - reach && v <= q3 + reach);
            let lower_whisker = inside.clone().copied().reduce(f64::min).unwrap_or(q1);
            let upper_whisker = inside.clone().copied().reduce(f64::max).unwrap_or(q3);
            let outliers = sorted.len() - inside.count();
            Some(BoxStats {
                group,
                count: sorted.len(),
                q1,
                median,
                q3,
                lower_whisker,
                upper_whisker,
                outliers,
            })
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regression {
    pub x: Dimension,
    pub y: Dimension,
    pub points: Vec<(f64, f64)>,
    /// Undefined with fewer than two points or no spread in `x`.
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
}

impl Regression {
    pub fn predict(&self, x: f64) -> Option<f64> {
        Some(self.intercept? + self.slope? * x)
    }

    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        let xs = self.points.iter().map(|p| p.0);
        Some((xs.clone().reduce(f64::min)?, xs.reduce(f64::max)?))
    }
}

/// Ordinary least squares of `y` on `x` over rows where both are present.
pub fn regression(table: &DerivedTable, x: Dimension, y: Dimension) -> Result<Regression> {
    let xs = table.numeric_column(x)?;
    let ys = table.numeric_column(y)?;
    let points: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        })
        .collect();

    let n = points.len() as f64;
    let (mut slope, mut intercept) = (None, None);
    if points.len() >= 2 {
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
        let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
        if sxx > 0.0 {
            let b = sxy / sxx;
            slope = Some(b);
            intercept = Some(mean_y - b * mean_x);
        }
    }

    Ok(Regression {
        x,
        y,
        points,
        slope,
        intercept,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dataset::{Record, Table};
    use crate::derive::derive;

    fn derived(rows: &[(&str, f64)]) -> DerivedTable {
        let records = rows
            .iter()
            .map(|&(churn, monthly)| Record {
                churn: churn.into(),
                monthly_charges: Some(monthly),
                ..Record::default()
            })
            .collect();
        derive(Arc::new(Table::new("test", records)))
    }

    #[test]
    fn count_series_splits_by_churn() {
        let table = derived(&[("Yes", 25.0), ("No", 15.0), ("No", 18.0)]);
        let series = count_series(&table, Dimension::ChargeRange).unwrap();
        assert_eq!(series.points.len(), 6 * 2);
        assert_eq!(series.bars("No")[0], ("0-20", 2));
        assert_eq!(series.bars("Yes")[1], ("21-40", 1));
    }

    #[test]
    fn box_series_flags_outliers() {
        let table = derived(&[
            ("No", 10.0),
            ("No", 11.0),
            ("No", 12.0),
            ("No", 13.0),
            ("No", 100.0),
            ("Yes", 70.0),
        ]);
        let boxes = box_series(&table, Dimension::MonthlyCharges, Dimension::Churn).unwrap();
        assert_eq!(boxes.len(), 2);
        let retained = &boxes[0];
        assert_eq!(retained.group, "No");
        assert_eq!(retained.median, 12.0);
        assert_eq!(retained.outliers, 1);
        assert_eq!(retained.upper_whisker, 13.0);
        assert_eq!(boxes[1].count, 1);
    }

    #[test]
    fn regression_fits_churn_probability() {
        let table = derived(&[("No", 20.0), ("No", 40.0), ("Yes", 60.0), ("Yes", 80.0)]);
        let fit = regression(&table, Dimension::MonthlyCharges, Dimension::ChurnBinary).unwrap();
        let slope = fit.slope.unwrap();
        assert!((slope - 0.02).abs() < 1e-12);
        assert!((fit.predict(50.0).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(fit.x_bounds(), Some((20.0, 80.0)));
    }

    #[test]
    fn regression_without_spread_has_no_line() {
        let table = derived(&[("No", 20.0), ("Yes", 20.0)]);
        let fit = regression(&table, Dimension::MonthlyCharges, Dimension::ChurnBinary).unwrap();
        assert_eq!(fit.slope, None);
        assert_eq!(fit.predict(20.0), None);
    }

    #[test]
    fn regression_needs_a_valid_churn_column() {
        let table = derived(&[("No", 20.0), ("Later", 30.0)]);
        assert!(regression(&table, Dimension::MonthlyCharges, Dimension::ChurnBinary).is_err());
    }
}
