//! Per-column profiling of raw extract tables
//!
//! Produces the summary shown by `refcheck profile`: inferred type, null
//! and distinct percentages, the most frequent value when informative, and
//! min/max for numeric columns. Pure; rendering lives in the console module.

use std::collections::HashMap;

use crate::cleaner::{parse_bool, parse_timestamp};
use crate::loader::RawTable;

/// Profile of one column of one table.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub table: String,
    pub column: String,
    pub data_type: &'static str,
    pub row_count: usize,
    pub null_count: usize,
    pub distinct_count: usize,
    /// Most frequent value and its count, when the column is neither all
    /// nulls nor all-distinct.
    pub top_value: Option<(String, usize)>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl ColumnProfile {
    pub fn null_pct(&self) -> f64 {
        percentage(self.null_count, self.row_count)
    }

    pub fn distinct_pct(&self) -> f64 {
        percentage(self.distinct_count, self.row_count)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn infer_type(values: &[&str]) -> &'static str {
    if values.is_empty() {
        return "unknown";
    }
    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        return "int";
    }
    if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        return "float";
    }
    if values.iter().all(|v| parse_bool(v).is_some()) {
        return "bool";
    }
    if values.iter().all(|v| parse_timestamp(v).is_some()) {
        return "timestamp";
    }
    "string"
}

fn profile_column(table: &RawTable, idx: usize) -> ColumnProfile {
    let row_count = table.rows.len();
    let values: Vec<&str> = table
        .rows
        .iter()
        .filter_map(|row| row.get(idx).and_then(|c| c.as_deref()))
        .collect();
    let null_count = row_count - values.len();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in &values {
        *counts.entry(*v).or_insert(0) += 1;
    }
    let distinct_count = counts.len();

    let top_value = if distinct_count > 0 && distinct_count < values.len() {
        counts
            .iter()
            // Count descending, then value ascending so ties are stable.
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(v, n)| (v.to_string(), *n))
    } else {
        None
    };

    let data_type = infer_type(&values);
    let (min_value, max_value) = if matches!(data_type, "int" | "float") {
        let nums: Vec<f64> = values.iter().filter_map(|v| v.parse().ok()).collect();
        (
            nums.iter().copied().reduce(f64::min),
            nums.iter().copied().reduce(f64::max),
        )
    } else {
        (None, None)
    };

    ColumnProfile {
        table: table.name.clone(),
        column: table.columns[idx].clone(),
        data_type,
        row_count,
        null_count,
        distinct_count,
        top_value,
        min_value,
        max_value,
    }
}

/// Profile every column of a table. Empty tables profile to nothing.
pub fn profile_table(table: &RawTable) -> Vec<ColumnProfile> {
    if table.is_empty() {
        return Vec::new();
    }
    (0..table.columns.len())
        .map(|idx| profile_column(table, idx))
        .collect()
}
