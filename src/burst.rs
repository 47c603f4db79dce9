use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

// Per-IP sliding 60 second window, independent of the daily quota.
// Blunts rapid-fire bursts that would otherwise drain a day's quota
// in a fraction of a second.
pub struct BurstGuard {
    store: DashMap<String, Vec<DateTime<Utc>>>,
    limit_per_minute: usize,
}

impl BurstGuard {
    pub fn new(limit_per_minute: usize) -> Self {
        Self {
            store: DashMap::new(),
            limit_per_minute,
        }
    }

    // true means the window is full; trims old entries as it reads
    pub fn check_at(&self, ip: &str, now: DateTime<Utc>) -> bool {
        let cutoff = now - Duration::seconds(60);
        let mut entry = self.store.entry(ip.to_string()).or_default();
        entry.retain(|t| *t > cutoff);
        entry.len() >= self.limit_per_minute
    }

    pub fn check(&self, ip: &str) -> bool {
        self.check_at(ip, Utc::now())
    }

    pub fn record_at(&self, ip: &str, now: DateTime<Utc>) {
        self.store.entry(ip.to_string()).or_default().push(now);
    }

    pub fn record(&self, ip: &str) {
        self.record_at(ip, Utc::now());
    }

    // drops IPs whose windows have fully drained
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::seconds(60);
        let before = self.store.len();
        self.store.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        before - self.store.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn window_fills_per_ip() {
        let guard = BurstGuard::new(10);
        let now = t0();
        for i in 0..10 {
            guard.record_at("ip1", now + Duration::milliseconds(i * 100));
        }
        assert!(guard.check_at("ip1", now + Duration::seconds(1)));
        assert!(!guard.check_at("ip2", now + Duration::seconds(1)));
    }

    #[test]
    fn window_clears_after_sixty_seconds() {
        let guard = BurstGuard::new(10);
        let now = t0();
        for _ in 0..10 {
            guard.record_at("ip1", now);
        }
        assert!(guard.check_at("ip1", now));
        assert!(!guard.check_at("ip1", now + Duration::seconds(61)));
    }

    #[test]
    fn partial_window_stays_under_the_limit() {
        let guard = BurstGuard::new(3);
        let now = t0();
        guard.record_at("ip1", now);
        guard.record_at("ip1", now + Duration::seconds(1));
        assert!(!guard.check_at("ip1", now + Duration::seconds(2)));
        guard.record_at("ip1", now + Duration::seconds(2));
        assert!(guard.check_at("ip1", now + Duration::seconds(3)));
    }

    #[test]
    fn sweep_drops_drained_ips() {
        let guard = BurstGuard::new(10);
        let now = t0();
        guard.record_at("stale", now);
        guard.record_at("active", now + Duration::seconds(50));

        assert_eq!(guard.sweep_at(now + Duration::seconds(70)), 1);
        // the active window is untouched
        assert!(!guard.check_at("active", now + Duration::seconds(70)));
    }
}
