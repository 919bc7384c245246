//! CSV discovery and loading
//!
//! Reads every `*.csv` file in an extract directory into a raw rectangular
//! table keyed by the file stem. Loading is deliberately forgiving: a file
//! that fails to parse is logged and skipped so one bad extract does not
//! take down the run. Schema validation happens later, in the cleaner.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};

/// A rectangular table of named string columns, straight off disk.
///
/// Cells hold `None` for empty or NA-like values; all typing happens in the
/// cleaner.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "na" | "n/a" | "null" | "none" | "nan" => None,
        _ => Some(trimmed.to_string()),
    }
}

fn read_csv(path: &Path, name: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<Option<String>> =
            record.iter().map(parse_cell).collect();
        // Flexible mode can yield short rows; pad so every row is rectangular.
        row.resize(columns.len(), None);
        row.truncate(columns.len());
        rows.push(row);
    }

    Ok(RawTable {
        name: name.to_string(),
        columns,
        rows,
    })
}

/// Load all CSV files from `source` into a map of file stem to raw table.
///
/// Files are visited in sorted order so repeated runs see identical input
/// ordering. Returns an empty map when the directory holds no CSV files.
pub fn load_dir(source: &Path) -> Result<BTreeMap<String, RawTable>> {
    if !source.is_dir() {
        return Err(PipelineError::NotADirectory(source.to_path_buf()));
    }

    let mut csv_paths: Vec<_> = fs::read_dir(source)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    csv_paths.sort();

    if csv_paths.is_empty() {
        warn!("no CSV files found in {}", source.display());
    }

    let mut tables = BTreeMap::new();
    for path in csv_paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match read_csv(&path, stem) {
            Ok(table) => {
                info!(
                    "loaded {} -> {} rows, {} columns",
                    path.display(),
                    table.rows.len(),
                    table.columns.len()
                );
                tables.insert(stem.to_string(), table);
            }
            Err(e) => {
                warn!("failed to load {}: {}", path.display(), e);
            }
        }
    }

    Ok(tables)
}
