//! Derived columns computed from a loaded [`Table`].
//!
//! [`derive`] never touches the source table: it returns a new
//! [`DerivedTable`] that shares the records and carries the derived columns
//! alongside them, so every render pass starts from the same snapshot.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::warn;

use crate::dataset::{Dimension, DimensionKind, Record, Table};
use crate::error::{DashError, Result};

/// Fixed numeric intervals used to discretise a continuous column.
///
/// Intervals are right-closed, `(lo, hi]`, except the first which also
/// includes its lower edge. Values outside `[first edge, last edge]` have no
/// bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl Buckets {
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> Self {
        debug_assert_eq!(edges.len(), labels.len() + 1);
        debug_assert!(edges.windows(2).all(|w| w[0] < w[1]));
        Buckets { edges, labels }
    }

    /// `0-20`, `21-40`, ..., `101-120`.
    pub fn monthly_charges() -> Self {
        let edges: Vec<f64> = (0..=120).step_by(20).map(f64::from).collect();
        let labels = (0..120)
            .step_by(20)
            .map(|lo| {
                let start = if lo == 0 { 0 } else { lo + 1 };
                format!("{}-{}", start, lo + 20)
            })
            .collect();
        Buckets::new(edges, labels)
    }

    /// `0-500`, `500-1000`, ..., `9000-9500`.
    pub fn total_charges() -> Self {
        const STEP: u32 = 500;
        let edges: Vec<f64> = (0..=9500).step_by(STEP as usize).map(f64::from).collect();
        let labels = (0..9500)
            .step_by(STEP as usize)
            .map(|lo| format!("{}-{}", lo, lo + STEP))
            .collect();
        Buckets::new(edges, labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Upper edge of bucket `index`. It always re-buckets into `index`.
    pub fn upper_edge(&self, index: usize) -> Option<f64> {
        self.edges.get(index + 1).copied()
    }

    pub fn assign(&self, value: f64) -> Option<usize> {
        let first = *self.edges.first()?;
        let last = *self.edges.last()?;
        if value.is_nan() || value < first || value > last {
            return None;
        }
        if value == first {
            return Some(0);
        }
        // first edge >= value closes the bucket that holds it
        let closing = self.edges.partition_point(|&edge| edge < value);
        Some(closing - 1)
    }

    fn assign_all(&self, values: impl Iterator<Item = Option<f64>>) -> Vec<Option<usize>> {
        values.map(|v| v.and_then(|v| self.assign(v))).collect()
    }
}

/// One grouping axis: its labels in natural order and each row's position on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub dimension: Dimension,
    pub labels: Vec<String>,
    pub positions: Vec<Option<usize>>,
}

impl Axis {
    /// Rows with no position on this axis.
    pub fn missing(&self) -> usize {
        self.positions.iter().filter(|p| p.is_none()).count()
    }
}

/// A loaded table plus its derived columns.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    base: Arc<Table>,
    churn_binary: Result<Vec<u8>>,
    charge_buckets: Buckets,
    charge_range: Vec<Option<usize>>,
    total_charge_buckets: Buckets,
    total_charge_range: Vec<Option<usize>>,
}

pub fn derive(base: Arc<Table>) -> DerivedTable {
    let records = base.records();
    let churn_binary = churn_binary(records);
    if let Err(err) = &churn_binary {
        warn!(origin = base.origin(), %err, "ChurnBinary unavailable");
    }

    let charge_buckets = Buckets::monthly_charges();
    let charge_range = charge_buckets.assign_all(records.iter().map(|r| r.monthly_charges));
    let total_charge_buckets = Buckets::total_charges();
    let total_charge_range =
        total_charge_buckets.assign_all(records.iter().map(|r| r.total_charges));

    DerivedTable {
        base,
        churn_binary,
        charge_buckets,
        charge_range,
        total_charge_buckets,
        total_charge_range,
    }
}

fn churn_binary(records: &[Record]) -> Result<Vec<u8>> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| match record.churn_outcome() {
            Some("Yes") => Ok(1),
            Some("No") => Ok(0),
            _ => Err(DashError::UnmappedValue {
                column: Dimension::Churn.name(),
                row,
                value: record.churn.clone(),
            }),
        })
        .collect()
}

impl DerivedTable {
    pub fn base(&self) -> &Arc<Table> {
        &self.base
    }

    pub fn records(&self) -> &[Record] {
        self.base.records()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Fails with the first unmapped churn value if the column could not be built.
    pub fn churn_binary(&self) -> Result<&[u8]> {
        self.churn_binary.as_deref().map_err(Clone::clone)
    }

    pub fn buckets(&self, dimension: Dimension) -> Option<&Buckets> {
        match dimension {
            Dimension::ChargeRange => Some(&self.charge_buckets),
            Dimension::TotalChargeRange => Some(&self.total_charge_buckets),
            _ => None,
        }
    }

    /// Bucket index per row for a bucketed dimension.
    pub fn bucket_column(&self, dimension: Dimension) -> Option<&[Option<usize>]> {
        match dimension {
            Dimension::ChargeRange => Some(&self.charge_range),
            Dimension::TotalChargeRange => Some(&self.total_charge_range),
            _ => None,
        }
    }

    /// Values of a numeric dimension, one entry per row.
    pub fn numeric_column(&self, dimension: Dimension) -> Result<Vec<Option<f64>>> {
        match dimension {
            Dimension::ChurnBinary => Ok(self
                .churn_binary()?
                .iter()
                .map(|&flag| Some(f64::from(flag)))
                .collect()),
            d if d.kind() == DimensionKind::Numeric => {
                Ok(self.records().iter().map(|r| r.number(d)).collect())
            }
            d => Err(DashError::TypeMismatch {
                dimension: d.name(),
                expected: DimensionKind::Numeric,
            }),
        }
    }

    /// Grouping axis for a categorical or bucketed dimension.
    ///
    /// Bucketed axes list every bucket. Categorical axes list the declared
    /// domain first and then any other observed value in sorted order, so
    /// nothing observed is dropped.
    pub fn axis(&self, dimension: Dimension) -> Result<Axis> {
        match dimension.kind() {
            DimensionKind::Bucketed => {
                let (buckets, column) = self
                    .buckets(dimension)
                    .zip(self.bucket_column(dimension))
                    .ok_or(DashError::TypeMismatch {
                        dimension: dimension.name(),
                        expected: DimensionKind::Bucketed,
                    })?;
                Ok(Axis {
                    dimension,
                    labels: buckets.labels().to_vec(),
                    positions: column.to_vec(),
                })
            }
            DimensionKind::Categorical => Ok(self.categorical_axis(dimension)),
            DimensionKind::Numeric => Err(DashError::TypeMismatch {
                dimension: dimension.name(),
                expected: DimensionKind::Categorical,
            }),
        }
    }

    fn categorical_axis(&self, dimension: Dimension) -> Axis {
        let declared = dimension.declared_domain();
        let extras: BTreeSet<&str> = self
            .records()
            .iter()
            .filter_map(|r| r.category(dimension))
            .filter(|v| !declared.contains(v))
            .collect();

        let labels: Vec<String> = declared
            .iter()
            .map(|v| v.to_string())
            .chain(extras.into_iter().map(str::to_string))
            .collect();
        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();
        let positions = self
            .records()
            .iter()
            .map(|r| r.category(dimension).and_then(|v| index.get(v).copied()))
            .collect();

        Axis {
            dimension,
            labels,
            positions,
        }
    }
}
