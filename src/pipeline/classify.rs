//! Rule classifier
//!
//! Pure, total classification of one joined, time-normalized referral.
//! The policy is an ordered decision table: the valid-success conjunction,
//! then the valid-pending/failed conjunction, then a set of independent
//! invalidity checks whose matching reasons are all recorded. Absent fields
//! are falsy inputs (a null reward value is not `> 0`, a null instant never
//! compares), so the classifier cannot fail.

use serde::Serialize;

use super::join::JoinedReferral;
use super::normalize::LocalTimes;
use crate::model::StatusLabel;

/// Output label for a referral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    ValidSuccess,
    ValidPendingOrFailed,
    Invalid,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::ValidSuccess => "valid-success",
            Verdict::ValidPendingOrFailed => "valid-pending-or-failed",
            Verdict::Invalid => "invalid",
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Verdict::Invalid)
    }
}

/// Why a referral was ruled invalid. Several reasons may co-occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reason {
    RewardWithoutSuccessStatus,
    RewardWithoutTransaction,
    PaidTransactionWithoutReward,
    SuccessWithoutReward,
    TransactionBeforeReferral,
    Unclassified,
}

impl Reason {
    pub fn tag(&self) -> &'static str {
        match self {
            Reason::RewardWithoutSuccessStatus => "reward-without-success-status",
            Reason::RewardWithoutTransaction => "reward-without-transaction",
            Reason::PaidTransactionWithoutReward => "paid-transaction-without-reward",
            Reason::SuccessWithoutReward => "success-without-reward",
            Reason::TransactionBeforeReferral => "transaction-before-referral",
            Reason::Unclassified => "unclassified",
        }
    }
}

/// Verdict plus the reasons justifying it. Reasons are empty exactly when
/// the verdict is one of the two valid labels.
#[derive(Debug, Clone)]
pub struct Classification {
    pub verdict: Verdict,
    pub reasons: Vec<Reason>,
}

/// Per-record predicate snapshot the decision table evaluates against.
struct RuleContext {
    reward_positive: bool,
    status: StatusLabel,
    transaction_exists: bool,
    transaction_paid: bool,
    transaction_new: bool,
    transaction_after_referral: bool,
    transaction_before_referral: bool,
    same_local_month: bool,
    referrer_active: bool,
    reward_granted: bool,
}

impl RuleContext {
    fn build(record: &JoinedReferral, local: &LocalTimes) -> Self {
        let reward_value = record.reward.as_ref().and_then(|r| r.value).unwrap_or(0);
        let transaction = record.transaction.as_ref();
        let transaction_at = transaction.and_then(|t| t.occurred_at);
        let referral_at = record.referral.created_at;

        // Membership: a null expiry means a non-expiring account; otherwise
        // the expiry must postdate the transaction instant. A missing
        // referrer row can never validate (deleted-if-unknown).
        let referrer_active = record.referrer.as_ref().is_some_and(|r| {
            !r.is_deleted
                && match r.membership_expires_at {
                    None => true,
                    Some(expiry) => transaction_at.is_some_and(|t| expiry > t),
                }
        });

        RuleContext {
            reward_positive: reward_value > 0,
            status: record.status_label,
            transaction_exists: transaction.is_some(),
            transaction_paid: transaction
                .and_then(|t| t.status.as_deref())
                .is_some_and(|s| s == "PAID"),
            transaction_new: transaction
                .and_then(|t| t.kind.as_deref())
                .is_some_and(|k| k == "NEW"),
            transaction_after_referral: matches!(
                (transaction_at, referral_at),
                (Some(t), Some(r)) if t > r
            ),
            transaction_before_referral: matches!(
                (transaction_at, referral_at),
                (Some(t), Some(r)) if t < r
            ),
            same_local_month: local.same_month(),
            referrer_active,
            reward_granted: record
                .log
                .as_ref()
                .and_then(|l| l.reward_granted)
                .unwrap_or(false),
        }
    }

    fn valid_success(&self) -> bool {
        self.reward_positive
            && self.status == StatusLabel::Success
            && self.transaction_exists
            && self.transaction_paid
            && self.transaction_new
            && self.transaction_after_referral
            && self.same_local_month
            && self.referrer_active
            && self.reward_granted
    }

    fn valid_pending_or_failed(&self) -> bool {
        matches!(self.status, StatusLabel::Pending | StatusLabel::Failed)
            && !self.reward_positive
    }

    fn invalid_reasons(&self) -> Vec<Reason> {
        let checks = [
            (
                self.reward_positive && self.status != StatusLabel::Success,
                Reason::RewardWithoutSuccessStatus,
            ),
            (
                self.reward_positive && !self.transaction_exists,
                Reason::RewardWithoutTransaction,
            ),
            (
                !self.reward_positive && self.transaction_exists && self.transaction_paid,
                Reason::PaidTransactionWithoutReward,
            ),
            (
                self.status == StatusLabel::Success && !self.reward_positive,
                Reason::SuccessWithoutReward,
            ),
            (
                self.transaction_before_referral,
                Reason::TransactionBeforeReferral,
            ),
        ];
        checks
            .into_iter()
            .filter_map(|(hit, reason)| hit.then_some(reason))
            .collect()
    }
}

/// Classify one record. Total: every record gets exactly one verdict.
pub fn classify(record: &JoinedReferral, local: &LocalTimes) -> Classification {
    let ctx = RuleContext::build(record, local);

    if ctx.valid_success() {
        return Classification {
            verdict: Verdict::ValidSuccess,
            reasons: Vec::new(),
        };
    }
    // A transaction recorded before its referral invalidates no matter what
    // the status and reward say, so it is checked ahead of rule 2.
    if ctx.valid_pending_or_failed() && !ctx.transaction_before_referral {
        return Classification {
            verdict: Verdict::ValidPendingOrFailed,
            reasons: Vec::new(),
        };
    }

    let mut reasons = ctx.invalid_reasons();
    if reasons.is_empty() {
        reasons.push(Reason::Unclassified);
    }
    Classification {
        verdict: Verdict::Invalid,
        reasons,
    }
}
