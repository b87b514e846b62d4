//! Group summaries, value shares and descriptive statistics.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::dataset::{Dimension, DimensionKind, Record};
use crate::derive::DerivedTable;
use crate::error::Result;

/// A percentage that is explicitly undefined when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percent {
    Value(f64),
    Undefined,
}

impl Percent {
    /// `100 * part / whole`, rounded to `decimals` places with ties to even,
    /// so 1 of 16 at one decimal is 6.2.
    pub fn of(part: usize, whole: usize, decimals: i32) -> Percent {
        if whole == 0 {
            return Percent::Undefined;
        }
        Percent::Value(round_to(100.0 * part as f64 / whole as f64, decimals))
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Percent::Value(v) => Some(v),
            Percent::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        self == Percent::Undefined
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self, f.precision()) {
            (Percent::Value(v), Some(p)) => write!(f, "{v:.p$}"),
            (Percent::Value(v), None) => write!(f, "{v}"),
            (Percent::Undefined, _) => f.write_str("n/a"),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Percent::Value(v) => serializer.serialize_some(v),
            Percent::Undefined => serializer.serialize_none(),
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Row ordering of a [`GroupSummary`]. Chosen by the caller on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupOrder {
    /// Largest groups first, ties broken by label.
    ByCountDesc,
    /// Bucket order, or declared domain order followed by other observed values.
    Natural,
}

impl GroupOrder {
    /// Ordered buckets keep their order; plain categories sort by size.
    pub fn for_dimension(dimension: Dimension) -> GroupOrder {
        match dimension.kind() {
            DimensionKind::Bucketed => GroupOrder::Natural,
            _ => GroupOrder::ByCountDesc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub value: String,
    pub total: usize,
    pub churned: usize,
    pub retained: usize,
    pub percentage: Percent,
}

impl GroupRow {
    fn empty(value: &str) -> Self {
        GroupRow {
            value: value.to_string(),
            total: 0,
            churned: 0,
            retained: 0,
            percentage: Percent::Undefined,
        }
    }

    fn add(&mut self, record: &Record) {
        self.total += 1;
        if record.churned() {
            self.churned += 1;
        } else if record.retained() {
            self.retained += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub dimension: Dimension,
    pub order: GroupOrder,
    pub rows: Vec<GroupRow>,
    /// Records with no value (or no bucket) for the dimension.
    pub missing: usize,
}

impl GroupSummary {
    pub fn row(&self, value: &str) -> Option<&GroupRow> {
        self.rows.iter().find(|row| row.value == value)
    }

    pub fn grouped_total(&self) -> usize {
        self.rows.iter().map(|row| row.total).sum()
    }
}

/// Churn counts and rate per value of a categorical or bucketed dimension.
pub fn group_summary(
    table: &DerivedTable,
    dimension: Dimension,
    order: GroupOrder,
) -> Result<GroupSummary> {
    let axis = table.axis(dimension)?;
    let mut rows: Vec<GroupRow> = axis.labels.iter().map(|l| GroupRow::empty(l)).collect();
    for (record, position) in table.records().iter().zip(&axis.positions) {
        if let Some(index) = *position {
            rows[index].add(record);
        }
    }
    for row in &mut rows {
        row.percentage = Percent::of(row.churned, row.total, 2);
    }
    if order == GroupOrder::ByCountDesc {
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.value.cmp(&b.value)));
    }

    Ok(GroupSummary {
        dimension,
        order,
        rows,
        missing: axis.missing(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub value: String,
    pub count: usize,
    /// Share of the records that have a value for the dimension.
    pub percentage: Percent,
}

/// Value counts with their share of the table, largest first.
pub fn distribution(table: &DerivedTable, dimension: Dimension) -> Result<Vec<ShareRow>> {
    let summary = group_summary(table, dimension, GroupOrder::ByCountDesc)?;
    let observed = summary.grouped_total();
    Ok(summary
        .rows
        .into_iter()
        .map(|row| ShareRow {
            percentage: Percent::of(row.total, observed, 2),
            value: row.value,
            count: row.total,
        })
        .collect())
}

/// Count, mean, standard deviation, min, quartiles and max of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub dimension: Dimension,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

/// Descriptive statistics for each requested dimension; fails on the first
/// dimension that is not numeric.
pub fn describe(table: &DerivedTable, dimensions: &[Dimension]) -> Result<Vec<NumericSummary>> {
    dimensions
        .iter()
        .map(|&dimension| -> Result<NumericSummary> {
            let values = table.numeric_column(dimension)?;
            Ok(summarize(dimension, values.into_iter().flatten().collect()))
        })
        .collect()
}

fn summarize(dimension: Dimension, mut values: Vec<f64>) -> NumericSummary {
    values.sort_by(f64::total_cmp);
    let count = values.len();
    let mean = mean(&values);
    let std = mean.filter(|_| count > 1).map(|m| {
        let squares: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        (squares / (count - 1) as f64).sqrt()
    });

    NumericSummary {
        dimension,
        count,
        mean,
        std,
        min: values.first().copied(),
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values.last().copied(),
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Linearly interpolated quantile of already sorted values.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Share of customers with `ChurnBinary == 1`, in percent with 2 decimals.
pub fn churn_rate(table: &DerivedTable) -> Result<Percent> {
    let flags = table.churn_binary()?;
    let churned = flags.iter().filter(|&&flag| flag == 1).count();
    Ok(Percent::of(churned, flags.len(), 2))
}

/// Mean of a numeric dimension over the rows that have a value.
pub fn column_mean(table: &DerivedTable, dimension: Dimension) -> Result<Option<f64>> {
    let values: Vec<f64> = table.numeric_column(dimension)?.into_iter().flatten().collect();
    Ok(mean(&values))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dataset::Table;
    use crate::derive::derive;
    use crate::error::DashError;

    fn customer(churn: &str, contract: &str, monthly: f64) -> Record {
        Record {
            churn: churn.into(),
            contract: contract.into(),
            monthly_charges: Some(monthly),
            ..Record::default()
        }
    }

    fn derived(records: Vec<Record>) -> DerivedTable {
        derive(Arc::new(Table::new("test", records)))
    }

    #[test]
    fn charge_range_example() {
        let mut records = vec![customer("Yes", "One year", 25.0); 3];
        records.extend(vec![customer("No", "One year", 15.0); 7]);
        let table = derived(records);

        let summary = group_summary(&table, Dimension::ChargeRange, GroupOrder::Natural).unwrap();
        let low = summary.row("0-20").unwrap();
        assert_eq!((low.total, low.churned), (7, 0));
        assert_eq!(low.percentage, Percent::Value(0.0));
        let mid = summary.row("21-40").unwrap();
        assert_eq!((mid.total, mid.churned), (3, 3));
        assert_eq!(mid.percentage, Percent::Value(100.0));

        let labels: Vec<&str> = summary.rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(labels, ["0-20", "21-40", "41-60", "61-80", "81-100", "101-120"]);
        assert_eq!(summary.grouped_total() + summary.missing, 10);
    }

    #[test]
    fn empty_groups_report_undefined_percentage() {
        let table = derived(vec![customer("Yes", "One year", 50.0)]);
        let summary =
            group_summary(&table, Dimension::Contract, GroupOrder::ByCountDesc).unwrap();
        assert_eq!(summary.rows[0].value, "One year");
        let empty = summary.row("Two year").unwrap();
        assert_eq!(empty.total, 0);
        assert!(empty.percentage.is_undefined());
    }

    #[test]
    fn count_order_breaks_ties_by_label() {
        let table = derived(vec![
            customer("No", "Two year", 10.0),
            customer("Yes", "Month-to-month", 70.0),
            customer("Yes", "Month-to-month", 80.0),
            customer("No", "One year", 30.0),
        ]);
        let summary =
            group_summary(&table, Dimension::Contract, GroupOrder::ByCountDesc).unwrap();
        let labels: Vec<&str> = summary.rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(labels, ["Month-to-month", "One year", "Two year"]);
        assert_eq!(summary.rows[0].percentage, Percent::Value(100.0));
    }

    #[test]
    fn percentages_round_to_two_places() {
        let table = derived(vec![
            customer("Yes", "One year", 10.0),
            customer("No", "One year", 10.0),
            customer("No", "One year", 10.0),
        ]);
        let summary = group_summary(&table, Dimension::Contract, GroupOrder::Natural).unwrap();
        let row = summary.row("One year").unwrap();
        assert_eq!(row.percentage, Percent::Value(33.33));
        assert_eq!(row.retained, 2);
    }

    #[test]
    fn percentages_round_half_to_even() {
        assert_eq!(Percent::of(1, 16, 1), Percent::Value(6.2));
        assert_eq!(Percent::of(3, 16, 1), Percent::Value(18.8));
        assert_eq!(Percent::of(1, 8, 1), Percent::Value(12.5));
    }

    #[test]
    fn padded_churn_values_count_as_their_trimmed_outcome() {
        let table = derived(vec![
            customer("Yes ", "One year", 30.0),
            customer("Yes", "One year", 30.0),
            customer(" No", "One year", 30.0),
        ]);
        let churn = group_summary(&table, Dimension::Churn, GroupOrder::Natural).unwrap();
        let yes = churn.row("Yes").unwrap();
        assert_eq!((yes.total, yes.churned), (2, 2));
        assert_eq!(yes.percentage, Percent::Value(100.0));
        let no = churn.row("No").unwrap();
        assert_eq!((no.total, no.retained), (1, 1));

        let contract = group_summary(&table, Dimension::Contract, GroupOrder::Natural).unwrap();
        let one_year = contract.row("One year").unwrap();
        assert_eq!((one_year.churned, one_year.retained), (2, 1));
        assert_eq!(churn_rate(&table).unwrap(), Percent::Value(66.67));
    }

    #[test]
    fn blank_values_are_counted_as_missing() {
        let table = derived(vec![customer("Yes", "", 10.0), customer("No", "Two year", 10.0)]);
        let summary = group_summary(&table, Dimension::Contract, GroupOrder::Natural).unwrap();
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.grouped_total(), 1);
    }

    #[test]
    fn numeric_dimensions_cannot_be_grouped() {
        let table = derived(vec![]);
        let err = group_summary(&table, Dimension::MonthlyCharges, GroupOrder::Natural);
        assert!(matches!(err, Err(DashError::TypeMismatch { .. })));
    }

    #[test]
    fn distribution_shares_sum_to_one_hundred() {
        let table = derived(vec![
            customer("Yes", "One year", 10.0),
            customer("No", "One year", 10.0),
            customer("No", "One year", 10.0),
            customer("No", "One year", 10.0),
        ]);
        let shares = distribution(&table, Dimension::Churn).unwrap();
        assert_eq!(shares[0].value, "No");
        assert_eq!(shares[0].count, 3);
        assert_eq!(shares[0].percentage, Percent::Value(75.0));
        assert_eq!(shares[1].percentage, Percent::Value(25.0));
    }

    #[test]
    fn describe_matches_interpolated_quartiles() {
        let records = [1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .map(|t| Record {
                tenure: Some(t),
                churn: "No".into(),
                ..Record::default()
            })
            .collect();
        let table = derived(records);
        let stats = describe(&table, &[Dimension::Tenure]).unwrap();
        let tenure = &stats[0];
        assert_eq!(tenure.count, 4);
        assert_eq!(tenure.mean, Some(2.5));
        assert_eq!(tenure.min, Some(1.0));
        assert_eq!(tenure.q1, Some(1.75));
        assert_eq!(tenure.median, Some(2.5));
        assert_eq!(tenure.q3, Some(3.25));
        assert_eq!(tenure.max, Some(4.0));
        let std = tenure.std.unwrap();
        assert!((std - 1.290_994).abs() < 1e-6);
    }

    #[test]
    fn describe_skips_missing_values_and_handles_empty_columns() {
        let table = derived(vec![customer("No", "One year", 10.0)]);
        let stats = describe(&table, &[Dimension::TotalCharges, Dimension::MonthlyCharges]).unwrap();
        assert_eq!(stats[0].count, 0);
        assert_eq!(stats[0].mean, None);
        assert_eq!(stats[1].count, 1);
        assert_eq!(stats[1].std, None);
    }

    #[test]
    fn describe_rejects_categorical_dimensions() {
        let table = derived(vec![]);
        let err = describe(&table, &[Dimension::Tenure, Dimension::Contract]).unwrap_err();
        assert_eq!(
            err,
            DashError::TypeMismatch {
                dimension: "Contract",
                expected: DimensionKind::Numeric
            }
        );
    }

    #[test]
    fn churn_rate_is_undefined_for_an_empty_table() {
        assert_eq!(churn_rate(&derived(vec![])).unwrap(), Percent::Undefined);
        let table = derived(vec![customer("Yes", "One year", 1.0), customer("No", "One year", 3.0)]);
        assert_eq!(churn_rate(&table).unwrap(), Percent::Value(50.0));
        assert_eq!(column_mean(&table, Dimension::MonthlyCharges).unwrap(), Some(2.0));
    }

    #[test]
    fn percent_serializes_undefined_as_null() {
        let json = serde_json::to_string(&[Percent::Value(12.5), Percent::Undefined]).unwrap();
        assert_eq!(json, "[12.5,null]");
        assert_eq!(format!("{:.1}", Percent::Value(2.0)), "2.0");
        assert_eq!(Percent::Undefined.to_string(), "n/a");
    }
}
