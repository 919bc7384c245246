//! Entity joiner
//!
//! Left-joins every referral to its (possibly absent) child records using
//! hash indexes keyed by the documented foreign keys. A referral with no
//! matching child yields `None` for that child, never an error and never a
//! dropped row. When a key that should be unique matches several rows the
//! tie-break is deterministic: earliest timestamp first (absent timestamps
//! last), then id, then input order.

use std::collections::HashMap;

use crate::model::{
    Dataset, LeadLog, Referral, ReferralLog, ReferrerProfile, Reward, StatusLabel, Transaction,
};

/// One referral with all related records resolved, the unit the rule
/// classifier consumes. Constructed fresh per run, never persisted.
#[derive(Debug, Clone)]
pub struct JoinedReferral {
    pub referral: Referral,
    pub status_label: StatusLabel,
    /// Raw status description for the report; `None` when the reference is
    /// missing or dangling.
    pub status_description: Option<String>,
    pub log: Option<ReferralLog>,
    pub reward: Option<Reward>,
    pub transaction: Option<Transaction>,
    pub referrer: Option<ReferrerProfile>,
    pub lead: Option<LeadLog>,
}

/// Build a first-wins index over rows with an optional key.
fn index_by<'a, T, F>(rows: &'a [T], key: F) -> HashMap<&'a str, &'a T>
where
    F: Fn(&'a T) -> Option<&'a str>,
{
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(k) = key(row) {
            map.entry(k).or_insert(row);
        }
    }
    map
}

/// Build an index keeping, per key, the row that sorts first under `better`.
fn index_by_min<'a, T, F, C>(rows: &'a [T], key: F, better: C) -> HashMap<&'a str, &'a T>
where
    F: Fn(&'a T) -> Option<&'a str>,
    C: Fn(&'a T, &'a T) -> bool,
{
    let mut map: HashMap<&'a str, &'a T> = HashMap::with_capacity(rows.len());
    for row in rows {
        let Some(k) = key(row) else { continue };
        map.entry(k)
            .and_modify(|current| {
                if better(row, current) {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    map
}

fn earlier_transaction(a: &Transaction, b: &Transaction) -> bool {
    match (a.occurred_at, b.occurred_at) {
        (Some(x), Some(y)) if x != y => x < y,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        _ => a.id < b.id,
    }
}

fn earlier_log(a: &ReferralLog, b: &ReferralLog) -> bool {
    match (a.logged_at, b.logged_at) {
        (Some(x), Some(y)) => x < y,
        (Some(_), None) => true,
        _ => false,
    }
}

fn smaller_reward(a: &Reward, b: &Reward) -> bool {
    a.id < b.id
}

/// Join all input tables into one record per referral, preserving input
/// order. Pure transform; runs in time proportional to input size.
pub fn join(data: &Dataset) -> Vec<JoinedReferral> {
    let statuses = index_by(&data.statuses, |s| Some(s.code.as_str()));
    let logs = index_by_min(&data.logs, |l| Some(l.referral_id.as_str()), earlier_log);
    let rewards = index_by_min(&data.rewards, |r| r.referral_id.as_deref(), smaller_reward);
    let transactions = index_by_min(
        &data.transactions,
        |t| t.referral_id.as_deref(),
        earlier_transaction,
    );
    let profiles = index_by(&data.profiles, |p| Some(p.user_id.as_str()));
    let leads = index_by(&data.leads, |l| l.referral_id.as_deref());

    data.referrals
        .iter()
        .map(|referral| {
            let status = referral
                .status_code
                .as_deref()
                .and_then(|code| statuses.get(code).copied());
            let id = referral.id.as_str();
            JoinedReferral {
                referral: referral.clone(),
                status_label: status
                    .map(|s| StatusLabel::parse(&s.description))
                    .unwrap_or(StatusLabel::Unknown),
                status_description: status.map(|s| s.description.clone()),
                log: logs.get(id).map(|&l| l.clone()),
                reward: rewards.get(id).map(|&r| r.clone()),
                transaction: transactions.get(id).map(|&t| t.clone()),
                referrer: profiles.get(referral.referrer_id.as_str()).map(|&p| p.clone()),
                lead: leads.get(id).map(|&l| l.clone()),
            }
        })
        .collect()
}
