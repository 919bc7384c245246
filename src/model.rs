//! Typed entity model for the referral pipeline
//!
//! The cleaner produces one `Dataset` per run: seven normalized entity
//! tables with `Option` for every nullable field. Identifiers are opaque
//! strings regardless of how the extract encodes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked introduction of a referee by a referrer, eligible for reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referee_id: String,
    /// When the referral was created, as a UTC instant.
    pub created_at: Option<DateTime<Utc>>,
    /// Raw acquisition channel (e.g. "User Sign Up", "Draft Transaction", "Lead").
    pub source: Option<String>,
    /// Reference into the referral status table.
    pub status_code: Option<String>,
}

/// Reward-grant log entry for a referral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralLog {
    pub referral_id: String,
    pub reward_granted: Option<bool>,
    pub logged_at: Option<DateTime<Utc>>,
}

/// Status definition row referenced by referrals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralStatus {
    pub code: String,
    pub description: String,
}

/// Resolved status label of a referral.
///
/// The extract carries Indonesian descriptions; anything unrecognized (or a
/// missing/dangling status reference) resolves to `Unknown`, which satisfies
/// neither the success nor the pending/failed predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    Success,
    Pending,
    Failed,
    Unknown,
}

impl StatusLabel {
    pub fn parse(description: &str) -> Self {
        match description.trim() {
            "Berhasil" => StatusLabel::Success,
            "Menunggu" => StatusLabel::Pending,
            "Tidak Berhasil" => StatusLabel::Failed,
            _ => StatusLabel::Unknown,
        }
    }
}

/// Reward definition attached to a referral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub referral_id: Option<String>,
    /// Reward value in currency units; absent or zero means no reward.
    pub value: Option<i64>,
}

/// Payment transaction optionally linked to a referral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub referral_id: Option<String>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// IANA timezone the transaction was recorded in.
    pub timezone: Option<String>,
    pub amount: Option<f64>,
}

/// Referrer account profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferrerProfile {
    pub user_id: String,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    /// Home-club timezone, used as a timezone fallback source.
    pub home_timezone: Option<String>,
}

/// Lead-intake log row optionally linked to a referral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadLog {
    pub id: String,
    pub referral_id: Option<String>,
    pub timezone: Option<String>,
    pub source_category: Option<String>,
}

/// All cleaned input tables for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub referrals: Vec<Referral>,
    pub logs: Vec<ReferralLog>,
    pub statuses: Vec<ReferralStatus>,
    pub rewards: Vec<Reward>,
    pub transactions: Vec<Transaction>,
    pub profiles: Vec<ReferrerProfile>,
    pub leads: Vec<LeadLog>,
}
