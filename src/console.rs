//! Console presentation
//!
//! Pure formatting functions returning `String`; the CLI layer decides
//! where to print. Nulls render as an em dash, previews cap at 30 rows.

use crate::loader::RawTable;
use crate::pipeline::RunSummary;
use crate::profiler::ColumnProfile;

const PREVIEW_ROWS: usize = 30;
const MAX_CELL_WIDTH: usize = 25;

fn clip(value: &str) -> String {
    if value.chars().count() > MAX_CELL_WIDTH {
        let truncated: String = value.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{truncated}…")
    } else {
        value.to_string()
    }
}

/// Render the first rows of a raw table as an aligned text block.
pub fn format_table_preview(table: &RawTable) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Table: {} | {} rows x {} columns\n",
        table.name,
        table.rows.len(),
        table.columns.len()
    ));

    if table.is_empty() {
        output.push_str("(empty)\n");
        return output;
    }

    let preview: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| {
            row.iter()
                .map(|cell| clip(cell.as_deref().unwrap_or("—")))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            preview
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(clip(col).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{:<width$}", clip(col), width = widths[i]))
        .collect();
    output.push_str(&header.join("  "));
    output.push('\n');
    output.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    output.push('\n');

    for row in &preview {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        output.push_str(&line.join("  "));
        output.push('\n');
    }

    if table.rows.len() > PREVIEW_ROWS {
        output.push_str(&format!("... and {} more rows\n", table.rows.len() - PREVIEW_ROWS));
    }
    output
}

/// Render the profile of one table.
pub fn format_profiles(name: &str, profiles: &[ColumnProfile]) -> String {
    if profiles.is_empty() {
        return format!("Table: {name} -> no data\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "Table: {} | {} rows\n",
        name, profiles[0].row_count
    ));
    output.push_str(&format!(
        "{:<28} {:<10} {:>8} {:>11}  {}\n",
        "Column", "Type", "Null %", "Distinct %", "Top Value -> Count"
    ));
    output.push_str(&format!("{}\n", "-".repeat(90)));

    for profile in profiles {
        let top = profile
            .top_value
            .as_ref()
            .map(|(value, count)| format!("{} -> {}", clip(value), count))
            .unwrap_or_else(|| "—".to_string());
        output.push_str(&format!(
            "{:<28} {:<10} {:>7.1}% {:>10.1}%  {}\n",
            clip(&profile.column),
            profile.data_type,
            profile.null_pct(),
            profile.distinct_pct(),
            top
        ));
    }
    output
}

/// Render the end-of-run classification summary.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("Referrals processed: {}\n", summary.total));
    output.push_str(&format!(
        "Valid:   {} ({} success, {} pending/failed)\n",
        summary.valid(),
        summary.valid_success,
        summary.valid_pending_or_failed
    ));
    output.push_str(&format!("Invalid: {}\n", summary.invalid));

    if !summary.reason_counts.is_empty() {
        output.push_str("Invalid reasons:\n");
        for (tag, count) in &summary.reason_counts {
            output.push_str(&format!("  {:<32} {}\n", tag, count));
        }
    }
    output
}
