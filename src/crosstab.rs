use serde::Serialize;

use crate::aggregate::Percent;
use crate::dataset::Dimension;
use crate::derive::DerivedTable;
use crate::error::Result;

/// Count and churn-rate grids over two dimensions. Both grids are indexed
/// `[row][column]` with the same label order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub rows: Dimension,
    pub columns: Dimension,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
    pub churn_rate: Vec<Vec<Percent>>,
    /// Records missing either coordinate.
    pub outside: usize,
}

impl CrossTab {
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.column_labels.len())
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn cell(&self, row: &str, column: &str) -> Option<(usize, Percent)> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = self.column_labels.iter().position(|l| l == column)?;
        Some((self.counts[r][c], self.churn_rate[r][c]))
    }

    /// Keeps only the rows with at least one record.
    pub fn observed_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&count| count > 0))
            .map(|(index, _)| index)
    }
}

pub fn cross_tab(table: &DerivedTable, rows: Dimension, columns: Dimension) -> Result<CrossTab> {
    let row_axis = table.axis(rows)?;
    let column_axis = table.axis(columns)?;
    let (height, width) = (row_axis.labels.len(), column_axis.labels.len());

    let mut counts = vec![vec![0usize; width]; height];
    let mut churned = vec![vec![0usize; width]; height];
    let mut outside = 0;
    let cells = row_axis.positions.iter().zip(&column_axis.positions);
    for (record, cell) in table.records().iter().zip(cells) {
        match cell {
            (Some(r), Some(c)) => {
                counts[*r][*c] += 1;
                if record.churned() {
                    churned[*r][*c] += 1;
                }
            }
            _ => outside += 1,
        }
    }

    let churn_rate = counts
        .iter()
        .zip(&churned)
        .map(|(count_row, churn_row)| {
            count_row
                .iter()
                .zip(churn_row)
                .map(|(&count, &yes)| Percent::of(yes, count, 1))
                .collect()
        })
        .collect();

    Ok(CrossTab {
        rows,
        columns,
        row_labels: row_axis.labels,
        column_labels: column_axis.labels,
        counts,
        churn_rate,
        outside,
    })
}
