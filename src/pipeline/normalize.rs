//! Temporal normalization
//!
//! Converts a joined referral's instants into its resolved local timezone.
//! Ordering comparisons ("transaction after referral") stay on the UTC
//! instants; only calendar bucketing ("same month") uses the local fields
//! produced here. Mixing the two would let a zone offset reorder events.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use chrono_tz::Tz;

use super::join::JoinedReferral;

/// Local calendar year-month bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

/// Local-time projections of a joined referral's instants.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimes {
    pub referral_local: Option<NaiveDateTime>,
    pub transaction_local: Option<NaiveDateTime>,
    pub referral_month: Option<YearMonth>,
    pub transaction_month: Option<YearMonth>,
}

fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

fn year_month(local: NaiveDateTime) -> YearMonth {
    YearMonth {
        year: local.year(),
        month: local.month(),
    }
}

/// Project the referral and transaction instants into `tz`.
pub fn normalize(record: &JoinedReferral, tz: Tz) -> LocalTimes {
    let referral_local = record.referral.created_at.map(|t| to_local(t, tz));
    let transaction_local = record
        .transaction
        .as_ref()
        .and_then(|t| t.occurred_at)
        .map(|t| to_local(t, tz));
    LocalTimes {
        referral_local,
        transaction_local,
        referral_month: referral_local.map(year_month),
        transaction_month: transaction_local.map(year_month),
    }
}

impl LocalTimes {
    /// True when both instants fall in the same local calendar month.
    /// Absent instants never match.
    pub fn same_month(&self) -> bool {
        matches!(
            (self.referral_month, self.transaction_month),
            (Some(a), Some(b)) if a == b
        )
    }
}
