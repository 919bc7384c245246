//! Report assembly and writing
//!
//! Projects classified referrals into the fixed reporting schema. Column
//! names and order are a contract with external consumers; they follow the
//! field order of `ReportRow`. The writer emits the whole report atomically
//! via a temp file in the destination directory, so a failed run leaves no
//! partial output.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::classify::{Classification, Verdict};
use super::join::JoinedReferral;
use crate::error::Result;

/// One row of the validation report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportRow {
    pub referral_id: String,
    pub referrer_id: String,
    pub referee_id: String,
    pub referral_at: Option<DateTime<Utc>>,
    pub referral_status: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_status: Option<String>,
    pub transaction_type: Option<String>,
    pub reward_value: Option<i64>,
    pub referee_reward_granted: bool,
    pub referrer_membership_expired: Option<DateTime<Utc>>,
    pub referrer_is_deleted: Option<bool>,
    pub referral_source_category: Option<String>,
    pub is_business_logic_valid: bool,
}

/// Aggregate counts for console output.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub valid_success: usize,
    pub valid_pending_or_failed: usize,
    pub invalid: usize,
    pub reason_counts: BTreeMap<&'static str, usize>,
}

impl RunSummary {
    pub fn valid(&self) -> usize {
        self.valid_success + self.valid_pending_or_failed
    }
}

/// Derive the reporting source category from the raw acquisition channel,
/// falling back to the lead log for lead-sourced referrals.
fn source_category(record: &JoinedReferral) -> Option<String> {
    match record.referral.source.as_deref() {
        Some("User Sign Up") => Some("Online".to_string()),
        Some("Draft Transaction") => Some("Offline".to_string()),
        Some("Lead") => record
            .lead
            .as_ref()
            .and_then(|lead| lead.source_category.clone()),
        _ => None,
    }
}

fn to_row(record: &JoinedReferral, classification: &Classification) -> ReportRow {
    let transaction = record.transaction.as_ref();
    ReportRow {
        referral_id: record.referral.id.clone(),
        referrer_id: record.referral.referrer_id.clone(),
        referee_id: record.referral.referee_id.clone(),
        referral_at: record.referral.created_at,
        referral_status: record.status_description.clone(),
        transaction_id: transaction.map(|t| t.id.clone()),
        transaction_status: transaction.and_then(|t| t.status.clone()),
        transaction_type: transaction.and_then(|t| t.kind.clone()),
        reward_value: record.reward.as_ref().and_then(|r| r.value),
        referee_reward_granted: record
            .log
            .as_ref()
            .and_then(|l| l.reward_granted)
            .unwrap_or(false),
        referrer_membership_expired: record
            .referrer
            .as_ref()
            .and_then(|r| r.membership_expires_at),
        referrer_is_deleted: record.referrer.as_ref().map(|r| r.is_deleted),
        referral_source_category: source_category(record),
        is_business_logic_valid: classification.verdict.is_valid(),
    }
}

/// Project classified records into report rows, preserving input order.
pub fn assemble(classified: &[(JoinedReferral, Classification)]) -> (Vec<ReportRow>, RunSummary) {
    let mut summary = RunSummary {
        total: classified.len(),
        ..Default::default()
    };
    let rows = classified
        .iter()
        .map(|(record, classification)| {
            match classification.verdict {
                Verdict::ValidSuccess => summary.valid_success += 1,
                Verdict::ValidPendingOrFailed => summary.valid_pending_or_failed += 1,
                Verdict::Invalid => summary.invalid += 1,
            }
            for reason in &classification.reasons {
                *summary.reason_counts.entry(reason.tag()).or_insert(0) += 1;
            }
            to_row(record, classification)
        })
        .collect();
    (rows, summary)
}

/// Write the report CSV atomically: serialize to a temp file next to the
/// target, then persist over it.
pub fn write_report(rows: &[ReportRow], output: &Path) -> Result<()> {
    let dir = output.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new()?,
    };

    let mut writer = csv::Writer::from_writer(tmp);
    for row in rows {
        writer.serialize(row)?;
    }
    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.persist(output).map_err(|e| e.error)?;

    info!("wrote {} report rows to {}", rows.len(), output.display());
    Ok(())
}

/// Read a previously written report back, for diffing and tests.
pub fn read_report(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Referral, StatusLabel};
    use crate::pipeline::classify::{Reason, Verdict};
    use chrono::TimeZone;

    fn record(id: &str, source: Option<&str>) -> JoinedReferral {
        JoinedReferral {
            referral: Referral {
                id: id.to_string(),
                referrer_id: "u1".to_string(),
                referee_id: "e1".to_string(),
                created_at: Some(Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()),
                source: source.map(str::to_string),
                status_code: None,
            },
            status_label: StatusLabel::Unknown,
            status_description: None,
            log: None,
            reward: None,
            transaction: None,
            referrer: None,
            lead: None,
        }
    }

    fn invalid() -> Classification {
        Classification {
            verdict: Verdict::Invalid,
            reasons: vec![Reason::Unclassified],
        }
    }

    #[test]
    fn test_report_header_matches_contract() {
        let classified = vec![(record("r1", None), invalid())];
        let (rows, _) = assemble(&classified);

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&rows[0]).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = data.lines().next().unwrap();
        assert_eq!(
            header,
            "referral_id,referrer_id,referee_id,referral_at,referral_status,\
             transaction_id,transaction_status,transaction_type,reward_value,\
             referee_reward_granted,referrer_membership_expired,referrer_is_deleted,\
             referral_source_category,is_business_logic_valid"
        );
    }

    #[test]
    fn test_source_category_mapping() {
        let classified = vec![
            (record("r1", Some("User Sign Up")), invalid()),
            (record("r2", Some("Draft Transaction")), invalid()),
            (record("r3", Some("Lead")), invalid()),
            (record("r4", None), invalid()),
        ];
        let (rows, _) = assemble(&classified);
        assert_eq!(rows[0].referral_source_category.as_deref(), Some("Online"));
        assert_eq!(rows[1].referral_source_category.as_deref(), Some("Offline"));
        // Lead with no lead log resolves to nothing.
        assert_eq!(rows[2].referral_source_category, None);
        assert_eq!(rows[3].referral_source_category, None);
    }

    #[test]
    fn test_lead_category_comes_from_lead_log() {
        let mut rec = record("r1", Some("Lead"));
        rec.lead = Some(crate::model::LeadLog {
            id: "l1".to_string(),
            referral_id: Some("r1".to_string()),
            timezone: None,
            source_category: Some("Walk-in".to_string()),
        });
        let (rows, _) = assemble(&[(rec, invalid())]);
        assert_eq!(rows[0].referral_source_category.as_deref(), Some("Walk-in"));
    }

    #[test]
    fn test_summary_counts() {
        let classified = vec![
            (
                record("r1", None),
                Classification {
                    verdict: Verdict::ValidSuccess,
                    reasons: vec![],
                },
            ),
            (
                record("r2", None),
                Classification {
                    verdict: Verdict::ValidPendingOrFailed,
                    reasons: vec![],
                },
            ),
            (
                record("r3", None),
                Classification {
                    verdict: Verdict::Invalid,
                    reasons: vec![Reason::SuccessWithoutReward, Reason::TransactionBeforeReferral],
                },
            ),
        ];
        let (_, summary) = assemble(&classified);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.valid(), 2);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.reason_counts["success-without-reward"], 1);
        assert_eq!(summary.reason_counts["transaction-before-referral"], 1);
    }

    #[test]
    fn test_write_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let classified = vec![(record("r1", Some("User Sign Up")), invalid())];
        let (rows, _) = assemble(&classified);

        write_report(&rows, &path).unwrap();
        let contents = read_report(&path).unwrap();
        assert!(contents.starts_with("referral_id,"));
        assert!(contents.contains("r1,u1,e1,2025-01-10T09:00:00Z"));
        assert!(contents.contains("false"));
    }
}
