//! Timezone resolution
//!
//! Picks one effective local timezone per referral. Priority, first
//! parseable non-null wins: transaction timezone, lead location timezone,
//! referrer home-club timezone, configured default. Never fails.

use chrono_tz::Tz;
use tracing::warn;

use super::join::JoinedReferral;

fn parse_zone(referral_id: &str, raw: &str) -> Option<Tz> {
    match raw.trim().parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            warn!("referral {}: unparseable timezone {:?}, trying next source", referral_id, raw);
            None
        }
    }
}

/// Resolve the effective timezone for one joined referral.
pub fn resolve_timezone(record: &JoinedReferral, default: Tz) -> Tz {
    let id = record.referral.id.as_str();
    let sources = [
        record.transaction.as_ref().and_then(|t| t.timezone.as_deref()),
        record.lead.as_ref().and_then(|l| l.timezone.as_deref()),
        record.referrer.as_ref().and_then(|r| r.home_timezone.as_deref()),
    ];
    sources
        .into_iter()
        .flatten()
        .find_map(|raw| parse_zone(id, raw))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeadLog, Referral, ReferrerProfile, StatusLabel, Transaction};

    fn bare_record() -> JoinedReferral {
        JoinedReferral {
            referral: Referral {
                id: "r1".to_string(),
                referrer_id: "u1".to_string(),
                referee_id: "e1".to_string(),
                created_at: None,
                source: None,
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

    fn with_zones(
        transaction: Option<&str>,
        lead: Option<&str>,
        referrer: Option<&str>,
    ) -> JoinedReferral {
        let mut record = bare_record();
        if let Some(tz) = transaction {
            record.transaction = Some(Transaction {
                id: "t1".to_string(),
                referral_id: Some("r1".to_string()),
                status: None,
                kind: None,
                occurred_at: None,
                timezone: Some(tz.to_string()),
                amount: None,
            });
        }
        if let Some(tz) = lead {
            record.lead = Some(LeadLog {
                id: "l1".to_string(),
                referral_id: Some("r1".to_string()),
                timezone: Some(tz.to_string()),
                source_category: None,
            });
        }
        if let Some(tz) = referrer {
            record.referrer = Some(ReferrerProfile {
                user_id: "u1".to_string(),
                membership_expires_at: None,
                is_deleted: false,
                home_timezone: Some(tz.to_string()),
            });
        }
        record
    }

    #[test]
    fn test_transaction_zone_wins() {
        let record = with_zones(Some("Asia/Singapore"), Some("Asia/Tokyo"), Some("Asia/Makassar"));
        assert_eq!(
            resolve_timezone(&record, chrono_tz::Asia::Jakarta),
            chrono_tz::Asia::Singapore
        );
    }

    #[test]
    fn test_lead_zone_beats_referrer_zone() {
        let record = with_zones(None, Some("Asia/Tokyo"), Some("Asia/Makassar"));
        assert_eq!(
            resolve_timezone(&record, chrono_tz::Asia::Jakarta),
            chrono_tz::Asia::Tokyo
        );
    }

    #[test]
    fn test_referrer_zone_used_last() {
        let record = with_zones(None, None, Some("Asia/Makassar"));
        assert_eq!(
            resolve_timezone(&record, chrono_tz::Asia::Jakarta),
            chrono_tz::Asia::Makassar
        );
    }

    #[test]
    fn test_default_when_all_sources_absent() {
        let record = bare_record();
        assert_eq!(
            resolve_timezone(&record, chrono_tz::Asia::Jakarta),
            chrono_tz::Asia::Jakarta
        );
    }

    #[test]
    fn test_unparseable_zone_falls_through() {
        let record = with_zones(Some("Mars/Olympus"), Some("Asia/Tokyo"), None);
        assert_eq!(
            resolve_timezone(&record, chrono_tz::Asia::Jakarta),
            chrono_tz::Asia::Tokyo
        );
    }

    #[test]
    fn test_configured_default_is_respected() {
        let record = bare_record();
        assert_eq!(
            resolve_timezone(&record, chrono_tz::UTC),
            chrono_tz::UTC
        );
    }
}
