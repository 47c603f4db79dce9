use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;

use crate::models::RateLimitInfo;

// Usage is counted twice, once per scope. The quota compares the max
// of both, so rotating IPs still pins a caller to their session count
// and clearing the session still pins them to their IP count.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Scope {
    Ip,
    Session,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct UsageKey {
    scope: Scope,
    value: String,
    day: NaiveDate,
}

// Daily counter for one (scope, value, day) key
struct UsageCounter {
    count: u32,
    first_request_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct QuotaDenied {
    pub used: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

// Day-keyed request counters for anonymous callers plus the quota
// check over them. A new calendar day lands on a new key, which is
// what implements the daily reset; stale keys are evicted by sweep().
pub struct UsageLedger {
    store: DashMap<UsageKey, UsageCounter>,
    daily_limit: u32,
}

impl UsageLedger {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            store: DashMap::new(),
            daily_limit,
        }
    }

    fn key(scope: Scope, value: &str, now: DateTime<Utc>) -> UsageKey {
        UsageKey {
            scope,
            value: value.to_string(),
            day: now.date_naive(),
        }
    }

    fn bump(&self, scope: Scope, value: &str, now: DateTime<Utc>) -> u32 {
        let mut entry = self
            .store
            .entry(Self::key(scope, value, now))
            .or_insert_with(|| UsageCounter {
                count: 0,
                first_request_at: now,
                expires_at: now + Duration::hours(24),
            });
        entry.count += 1;
        entry.count
    }

    fn count_at(&self, scope: Scope, value: &str, now: DateTime<Utc>) -> u32 {
        self.store
            .get(&Self::key(scope, value, now))
            .map(|c| c.count)
            .unwrap_or(0)
    }

    fn first_seen_at(&self, scope: Scope, value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.store
            .get(&Self::key(scope, value, now))
            .map(|c| c.first_request_at)
    }

    // Bumps both scopes together; returns (ip_count, session_count)
    pub fn increment_at(
        &self,
        ip: &str,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> (u32, u32) {
        let ip_count = self.bump(Scope::Ip, ip, now);
        let session_count = session_id.map(|s| self.bump(Scope::Session, s, now)).unwrap_or(0);
        (ip_count, session_count)
    }

    pub fn increment(&self, ip: &str, session_id: Option<&str>) -> (u32, u32) {
        self.increment_at(ip, session_id, Utc::now())
    }

    // max of both signals; neither alone is trusted
    pub fn combined_usage_at(&self, ip: &str, session_id: Option<&str>, now: DateTime<Utc>) -> u32 {
        let ip_count = self.count_at(Scope::Ip, ip, now);
        let session_count = session_id
            .map(|s| self.count_at(Scope::Session, s, now))
            .unwrap_or(0);
        ip_count.max(session_count)
    }

    pub fn combined_usage(&self, ip: &str, session_id: Option<&str>) -> u32 {
        self.combined_usage_at(ip, session_id, Utc::now())
    }

    // Rolling window: the limit clears 24h after the caller's earliest
    // first request, not at a fixed midnight cutoff.
    pub fn reset_time_at(
        &self,
        ip: &str,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let ip_first = self.first_seen_at(Scope::Ip, ip, now);
        let session_first = session_id.and_then(|s| self.first_seen_at(Scope::Session, s, now));
        let first = match (ip_first, session_first) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        first.unwrap_or(now) + Duration::hours(24)
    }

    // Must run before increment on the request path so rejected
    // requests are never charged.
    pub fn check_at(
        &self,
        ip: &str,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaDenied> {
        let used = self.combined_usage_at(ip, session_id, now);
        if used >= self.daily_limit {
            return Err(QuotaDenied {
                used,
                limit: self.daily_limit,
                reset_at: self.reset_time_at(ip, session_id, now),
            });
        }
        Ok(())
    }

    pub fn check(&self, ip: &str, session_id: Option<&str>) -> Result<(), QuotaDenied> {
        self.check_at(ip, session_id, Utc::now())
    }

    pub fn info_at(&self, ip: &str, session_id: Option<&str>, now: DateTime<Utc>) -> RateLimitInfo {
        let used = self.combined_usage_at(ip, session_id, now);
        RateLimitInfo {
            limit: self.daily_limit,
            remaining: self.daily_limit.saturating_sub(used),
            reset: self.reset_time_at(ip, session_id, now).timestamp(),
            used,
        }
    }

    pub fn info(&self, ip: &str, session_id: Option<&str>) -> RateLimitInfo {
        self.info_at(ip, session_id, Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.store.len();
        self.store.retain(|_, counter| counter.expires_at > now);
        before - self.store.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn combined_usage_is_max_of_both_scopes() {
        let ledger = UsageLedger::new(10);
        let now = t0();
        ledger.increment_at("ip1", None, now);
        ledger.increment_at("ip1", None, now);
        ledger.increment_at("ip1", Some("sid"), now);

        assert_eq!(ledger.combined_usage_at("ip1", Some("sid"), now), 3);
        assert_eq!(ledger.combined_usage_at("ip1", None, now), 3);
        assert_eq!(ledger.combined_usage_at("other", Some("sid"), now), 1);
    }

    #[test]
    fn combined_usage_is_monotonic_within_a_day() {
        let ledger = UsageLedger::new(10);
        let now = t0();
        let mut last = 0;
        for _ in 0..5 {
            ledger.increment_at("ip1", Some("sid"), now);
            let used = ledger.combined_usage_at("ip1", Some("sid"), now);
            assert!(used >= last);
            last = used;
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn quota_denies_at_the_limit_and_clears_on_day_rollover() {
        let ledger = UsageLedger::new(3);
        let now = t0();
        for _ in 0..3 {
            assert!(ledger.check_at("ip1", Some("sid"), now).is_ok());
            ledger.increment_at("ip1", Some("sid"), now);
        }
        let denied = ledger.check_at("ip1", Some("sid"), now).unwrap_err();
        assert_eq!(denied.used, 3);
        assert_eq!(denied.limit, 3);

        // a new calendar day lands on fresh keys
        let tomorrow = now + Duration::hours(24);
        assert_eq!(ledger.combined_usage_at("ip1", Some("sid"), tomorrow), 0);
        assert!(ledger.check_at("ip1", Some("sid"), tomorrow).is_ok());
    }

    #[test]
    fn session_count_survives_ip_rotation() {
        let ledger = UsageLedger::new(3);
        let now = t0();
        ledger.increment_at("ip1", None, now);
        ledger.increment_at("ip1", None, now);
        ledger.increment_at("ip1", Some("sid"), now);

        // caller switches to a proxy but presents the same session
        assert_eq!(ledger.combined_usage_at("ip2", Some("sid"), now), 1);
    }

    #[test]
    fn ip_count_survives_session_rotation() {
        let ledger = UsageLedger::new(3);
        let now = t0();
        ledger.increment_at("ip1", None, now);
        ledger.increment_at("ip1", None, now);
        ledger.increment_at("ip1", Some("sid"), now);

        // caller clears their token and shows up with a fresh identity
        assert_eq!(ledger.combined_usage_at("ip1", Some("fresh-sid"), now), 3);
    }

    #[test]
    fn reset_time_is_earliest_first_request_plus_24h() {
        let ledger = UsageLedger::new(10);
        let early = t0();
        let later = early + Duration::minutes(30);
        ledger.increment_at("ip1", None, early);
        ledger.increment_at("ip1", Some("sid"), later);

        // the session counter was first seen later; the IP wins
        assert_eq!(
            ledger.reset_time_at("ip1", Some("sid"), later),
            early + Duration::hours(24)
        );
    }

    #[test]
    fn reset_time_defaults_to_now_plus_24h_for_unseen_callers() {
        let ledger = UsageLedger::new(10);
        let now = t0();
        assert_eq!(ledger.reset_time_at("ip1", None, now), now + Duration::hours(24));
    }

    #[test]
    fn info_reports_remaining_and_used() {
        let ledger = UsageLedger::new(3);
        let now = t0();
        ledger.increment_at("ip1", Some("sid"), now);
        let info = ledger.info_at("ip1", Some("sid"), now);
        assert_eq!(info.limit, 3);
        assert_eq!(info.used, 1);
        assert_eq!(info.remaining, 2);
        assert_eq!(info.reset, (now + Duration::hours(24)).timestamp());
    }

    #[test]
    fn sweep_evicts_expired_counters_only() {
        let ledger = UsageLedger::new(10);
        let now = t0();
        ledger.increment_at("old", None, now);
        let later = now + Duration::hours(25);
        ledger.increment_at("new", None, later);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.sweep_at(later), 1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.combined_usage_at("new", None, later), 1);
    }
}
