//! Referral validation pipeline
//!
//! The core of the tool: join the cleaned entity tables, resolve one
//! effective timezone per referral, project instants into it, classify
//! every referral against the business-rule set, and assemble the fixed
//! reporting schema. Each run is a pure function of its input tables; the
//! stages share no state between invocations.

pub mod classify;
pub mod join;
pub mod normalize;
pub mod report;
pub mod timezone;

use chrono_tz::Tz;
use tracing::{debug, info};

use crate::model::Dataset;
pub use classify::{Classification, Reason, Verdict};
pub use join::JoinedReferral;
pub use report::{ReportRow, RunSummary};

/// Pipeline configuration. The default timezone is explicit so tests and
/// callers can override the fallback zone.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub default_timezone: Tz,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::Asia::Jakarta,
        }
    }
}

/// Run the full validation pipeline over one cleaned dataset.
pub fn run(data: &Dataset, config: &PipelineConfig) -> (Vec<ReportRow>, RunSummary) {
    info!("validating {} referrals", data.referrals.len());

    let joined = join::join(data);
    let classified: Vec<(JoinedReferral, Classification)> = joined
        .into_iter()
        .map(|record| {
            let tz = timezone::resolve_timezone(&record, config.default_timezone);
            let local = normalize::normalize(&record, tz);
            let classification = classify::classify(&record, &local);
            debug!(
                "referral {}: tz={} verdict={}",
                record.referral.id,
                tz,
                classification.verdict.as_str()
            );
            (record, classification)
        })
        .collect();

    let (rows, summary) = report::assemble(&classified);
    info!(
        "classified {} referrals: {} valid ({} success, {} pending/failed), {} invalid",
        summary.total,
        summary.valid(),
        summary.valid_success,
        summary.valid_pending_or_failed,
        summary.invalid
    );
    (rows, summary)
}
