//! Normalization of raw extract tables into the typed dataset
//!
//! Responsibilities: header normalization, null-tolerant coercion of
//! timestamps, booleans and reward values, exact-duplicate dropping, and
//! schema validation. A present table missing a required column fails the
//! run immediately; silently producing an all-null column would be
//! indistinguishable from missing references downstream and corrupt
//! classification.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::loader::RawTable;
use crate::model::{
    Dataset, LeadLog, Referral, ReferralLog, ReferralStatus, ReferrerProfile, Reward, Transaction,
};

/// Canonical table names expected in the extract directory.
pub const TABLE_REFERRALS: &str = "referrals";
pub const TABLE_REFERRAL_LOGS: &str = "referral_logs";
pub const TABLE_REFERRAL_STATUSES: &str = "referral_statuses";
pub const TABLE_REWARDS: &str = "rewards";
pub const TABLE_TRANSACTIONS: &str = "transactions";
pub const TABLE_REFERRER_PROFILES: &str = "referrer_profiles";
pub const TABLE_LEAD_LOGS: &str = "lead_logs";

/// Normalize header names in place: trim, lowercase, spaces to underscores.
pub fn normalize_headers(table: &mut RawTable) {
    for column in &mut table.columns {
        *column = column.trim().to_lowercase().replace(' ', "_");
    }
}

/// Parse a timestamp cell into a UTC instant.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS` (assumed UTC), and bare
/// dates (midnight UTC). Anything else coerces to absent, like every other
/// unreadable cell.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Parse a boolean cell ("True"/"false"/"1"/"0" and friends).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "1" => Some(true),
        "false" | "f" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Extract the numeric reward value from a cell like `IDR 250` or `250`.
pub fn parse_reward_value(raw: &str) -> Option<i64> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    digits.find(raw).and_then(|m| m.as_str().parse().ok())
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}

/// Resolve required column indices for a table, failing fast when absent.
fn required_columns(table: &RawTable, names: &[&str]) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| PipelineError::SchemaMismatch {
                    table: table.name.clone(),
                    column: (*name).to_string(),
                })
        })
        .collect()
}

fn cell<'a>(row: &'a [Option<String>], idx: usize) -> Option<&'a str> {
    row.get(idx).and_then(|c| c.as_deref())
}

fn dedup_rows(table: &mut RawTable) {
    let before = table.rows.len();
    let mut seen = HashSet::new();
    table.rows.retain(|row| seen.insert(row.clone()));
    let dropped = before - table.rows.len();
    if dropped > 0 {
        debug!("{}: dropped {} duplicate rows", table.name, dropped);
    }
}

fn clean_referrals(table: &RawTable) -> Result<Vec<Referral>> {
    let cols = required_columns(
        table,
        &[
            "id",
            "referrer_id",
            "referee_id",
            "created_at",
            "source",
            "status_code",
        ],
    )?;
    let mut referrals = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    for row in &table.rows {
        // Rows without a usable identity cannot be joined or reported;
        // drop them rather than emit garbage report rows.
        let (Some(id), Some(referrer_id), Some(referee_id)) =
            (cell(row, cols[0]), cell(row, cols[1]), cell(row, cols[2]))
        else {
            dropped += 1;
            continue;
        };
        referrals.push(Referral {
            id: id.to_string(),
            referrer_id: referrer_id.to_string(),
            referee_id: referee_id.to_string(),
            created_at: cell(row, cols[3]).and_then(parse_timestamp),
            source: cell(row, cols[4]).map(str::to_string),
            status_code: cell(row, cols[5]).map(str::to_string),
        });
    }
    if dropped > 0 {
        info!("referrals: dropped {} rows missing critical keys", dropped);
    }
    Ok(referrals)
}

fn clean_referral_logs(table: &RawTable) -> Result<Vec<ReferralLog>> {
    let cols = required_columns(table, &["referral_id", "reward_granted", "logged_at"])?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let referral_id = cell(row, cols[0])?;
            Some(ReferralLog {
                referral_id: referral_id.to_string(),
                reward_granted: cell(row, cols[1]).and_then(parse_bool),
                logged_at: cell(row, cols[2]).and_then(parse_timestamp),
            })
        })
        .collect())
}

fn clean_statuses(table: &RawTable) -> Result<Vec<ReferralStatus>> {
    let cols = required_columns(table, &["code", "description"])?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let code = cell(row, cols[0])?;
            let description = cell(row, cols[1])?;
            Some(ReferralStatus {
                code: code.to_string(),
                description: description.to_string(),
            })
        })
        .collect())
}

fn clean_rewards(table: &RawTable) -> Result<Vec<Reward>> {
    let cols = required_columns(table, &["id", "referral_id", "value"])?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let id = cell(row, cols[0])?;
            Some(Reward {
                id: id.to_string(),
                referral_id: cell(row, cols[1]).map(str::to_string),
                value: cell(row, cols[2]).and_then(parse_reward_value),
            })
        })
        .collect())
}

fn clean_transactions(table: &RawTable) -> Result<Vec<Transaction>> {
    let cols = required_columns(
        table,
        &[
            "id",
            "referral_id",
            "status",
            "type",
            "occurred_at",
            "timezone",
            "amount",
        ],
    )?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let id = cell(row, cols[0])?;
            Some(Transaction {
                id: id.to_string(),
                referral_id: cell(row, cols[1]).map(str::to_string),
                status: cell(row, cols[2]).map(str::to_string),
                kind: cell(row, cols[3]).map(str::to_string),
                occurred_at: cell(row, cols[4]).and_then(parse_timestamp),
                timezone: cell(row, cols[5]).map(str::to_string),
                amount: cell(row, cols[6]).and_then(parse_f64),
            })
        })
        .collect())
}

fn clean_profiles(table: &RawTable) -> Result<Vec<ReferrerProfile>> {
    let cols = required_columns(
        table,
        &["user_id", "membership_expires_at", "is_deleted", "home_timezone"],
    )?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let user_id = cell(row, cols[0])?;
            Some(ReferrerProfile {
                user_id: user_id.to_string(),
                membership_expires_at: cell(row, cols[1]).and_then(parse_timestamp),
                // Deleted-if-unknown: an unreadable flag must not validate
                // a referral for a possibly removed account.
                is_deleted: cell(row, cols[2]).and_then(parse_bool).unwrap_or(true),
                home_timezone: cell(row, cols[3]).map(str::to_string),
            })
        })
        .collect())
}

fn clean_leads(table: &RawTable) -> Result<Vec<LeadLog>> {
    let cols = required_columns(table, &["id", "referral_id", "timezone", "source_category"])?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let id = cell(row, cols[0])?;
            Some(LeadLog {
                id: id.to_string(),
                referral_id: cell(row, cols[1]).map(str::to_string),
                timezone: cell(row, cols[2]).map(str::to_string),
                source_category: cell(row, cols[3]).map(str::to_string),
            })
        })
        .collect())
}

/// Clean all loaded tables into the typed dataset.
///
/// Missing child tables are tolerated (their joins resolve to nulls); a
/// missing or empty referrals table is fatal.
pub fn clean(mut tables: BTreeMap<String, RawTable>) -> Result<Dataset> {
    for table in tables.values_mut() {
        normalize_headers(table);
        dedup_rows(table);
        debug!("cleaned {}: {} rows", table.name, table.rows.len());
    }

    let referrals = match tables.get(TABLE_REFERRALS) {
        Some(table) if !table.is_empty() => clean_referrals(table)?,
        _ => return Err(PipelineError::MissingReferrals),
    };
    if referrals.is_empty() {
        return Err(PipelineError::MissingReferrals);
    }

    let dataset = Dataset {
        referrals,
        logs: tables
            .get(TABLE_REFERRAL_LOGS)
            .map(clean_referral_logs)
            .transpose()?
            .unwrap_or_default(),
        statuses: tables
            .get(TABLE_REFERRAL_STATUSES)
            .map(clean_statuses)
            .transpose()?
            .unwrap_or_default(),
        rewards: tables
            .get(TABLE_REWARDS)
            .map(clean_rewards)
            .transpose()?
            .unwrap_or_default(),
        transactions: tables
            .get(TABLE_TRANSACTIONS)
            .map(clean_transactions)
            .transpose()?
            .unwrap_or_default(),
        profiles: tables
            .get(TABLE_REFERRER_PROFILES)
            .map(clean_profiles)
            .transpose()?
            .unwrap_or_default(),
        leads: tables
            .get(TABLE_LEAD_LOGS)
            .map(clean_leads)
            .transpose()?
            .unwrap_or_default(),
    };

    info!(
        "dataset: {} referrals, {} logs, {} statuses, {} rewards, {} transactions, {} profiles, {} leads",
        dataset.referrals.len(),
        dataset.logs.len(),
        dataset.statuses.len(),
        dataset.rewards.len(),
        dataset.transactions.len(),
        dataset.profiles.len(),
        dataset.leads.len(),
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, columns: &[&str], rows: &[&[Option<&str>]]) -> RawTable {
        RawTable {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    fn referrals_table(rows: &[&[Option<&str>]]) -> RawTable {
        table(
            TABLE_REFERRALS,
            &["id", "referrer_id", "referee_id", "created_at", "source", "status_code"],
            rows,
        )
    }

    #[test]
    fn test_normalize_headers() {
        let mut t = table("t", &["  Referral ID", "Created At ", "source"], &[]);
        normalize_headers(&mut t);
        assert_eq!(t.columns, vec!["referral_id", "created_at", "source"]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-01-15T08:30:00Z").is_some());
        assert!(parse_timestamp("2025-01-15T08:30:00+07:00").is_some());
        assert!(parse_timestamp("2025-01-15 08:30:00").is_some());
        assert!(parse_timestamp("2025-01-15").is_some());
        assert!(parse_timestamp("not a date").is_none());

        let offset = parse_timestamp("2025-01-15T07:00:00+07:00").unwrap();
        let utc = parse_timestamp("2025-01-15T00:00:00Z").unwrap();
        assert_eq!(offset, utc);
    }

    #[test]
    fn test_parse_reward_value_extracts_digits() {
        assert_eq!(parse_reward_value("IDR 250"), Some(250));
        assert_eq!(parse_reward_value("250"), Some(250));
        assert_eq!(parse_reward_value("Rp50.000"), Some(50));
        assert_eq!(parse_reward_value("free"), None);
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let mut tables = BTreeMap::new();
        tables.insert(
            TABLE_REFERRALS.to_string(),
            referrals_table(&[&[
                Some("r1"),
                Some("u1"),
                Some("e1"),
                Some("2025-01-01T00:00:00Z"),
                None,
                None,
            ]]),
        );
        // rewards present but missing its value column
        tables.insert(
            TABLE_REWARDS.to_string(),
            table(TABLE_REWARDS, &["id", "referral_id"], &[]),
        );

        let err = clean(tables).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { table, column } => {
                assert_eq!(table, TABLE_REWARDS);
                assert_eq!(column, "value");
            }
            other => panic!("expected SchemaMismatch, got {other}"),
        }
    }

    #[test]
    fn test_missing_referrals_is_fatal() {
        let err = clean(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingReferrals));
    }

    #[test]
    fn test_referral_rows_missing_critical_keys_are_dropped() {
        let mut tables = BTreeMap::new();
        tables.insert(
            TABLE_REFERRALS.to_string(),
            referrals_table(&[
                &[Some("r1"), Some("u1"), Some("e1"), Some("2025-01-01T00:00:00Z"), None, None],
                &[None, Some("u2"), Some("e2"), Some("2025-01-02T00:00:00Z"), None, None],
            ]),
        );

        let dataset = clean(tables).unwrap();
        assert_eq!(dataset.referrals.len(), 1);
        assert_eq!(dataset.referrals[0].id, "r1");
    }

    #[test]
    fn test_duplicate_rows_are_dropped() {
        let row: &[Option<&str>] = &[
            Some("r1"),
            Some("u1"),
            Some("e1"),
            Some("2025-01-01T00:00:00Z"),
            None,
            None,
        ];
        let mut tables = BTreeMap::new();
        tables.insert(TABLE_REFERRALS.to_string(), referrals_table(&[row, row]));

        let dataset = clean(tables).unwrap();
        assert_eq!(dataset.referrals.len(), 1);
    }

    #[test]
    fn test_profile_bool_defaults_deleted_when_unknown() {
        let mut tables = BTreeMap::new();
        tables.insert(
            TABLE_REFERRALS.to_string(),
            referrals_table(&[&[
                Some("r1"),
                Some("u1"),
                Some("e1"),
                Some("2025-01-01T00:00:00Z"),
                None,
                None,
            ]]),
        );
        tables.insert(
            TABLE_REFERRER_PROFILES.to_string(),
            table(
                TABLE_REFERRER_PROFILES,
                &["user_id", "membership_expires_at", "is_deleted", "home_timezone"],
                &[
                    &[Some("u1"), None, Some("False"), None],
                    &[Some("u2"), None, Some("garbled"), None],
                ],
            ),
        );

        let dataset = clean(tables).unwrap();
        assert!(!dataset.profiles[0].is_deleted);
        assert!(dataset.profiles[1].is_deleted);
    }
}
