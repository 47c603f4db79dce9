use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

struct GlobalCounter {
    count: u32,
    reset_day: NaiveDate,
}

// One ceiling shared by all anonymous callers. Caps aggregate spend no
// matter how traffic is spread across IPs and sessions, so it is
// checked before any per-caller gate.
pub struct GlobalCapGuard {
    counter: Mutex<GlobalCounter>,
    daily_limit: u32,
}

impl GlobalCapGuard {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            counter: Mutex::new(GlobalCounter {
                count: 0,
                reset_day: Utc::now().date_naive(),
            }),
            daily_limit,
        }
    }

    // true means the service-wide budget is exhausted for today
    pub fn check_at(&self, now: DateTime<Utc>) -> bool {
        let mut counter = self.counter.lock().unwrap();
        let today = now.date_naive();
        if counter.reset_day != today {
            counter.count = 0;
            counter.reset_day = today;
        }
        counter.count >= self.daily_limit
    }

    pub fn check(&self) -> bool {
        self.check_at(Utc::now())
    }

    pub fn increment_at(&self, now: DateTime<Utc>) {
        let mut counter = self.counter.lock().unwrap();
        let today = now.date_naive();
        if counter.reset_day != today {
            counter.count = 0;
            counter.reset_day = today;
        }
        counter.count += 1;
    }

    pub fn increment(&self) {
        self.increment_at(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn denies_once_the_daily_budget_is_spent() {
        let guard = GlobalCapGuard::new(2);
        let now = t0();
        assert!(!guard.check_at(now));
        guard.increment_at(now);
        assert!(!guard.check_at(now));
        guard.increment_at(now);
        assert!(guard.check_at(now));
    }

    #[test]
    fn counter_resets_on_a_new_day() {
        let guard = GlobalCapGuard::new(1);
        let now = t0();
        guard.increment_at(now);
        assert!(guard.check_at(now));

        let tomorrow = now + Duration::hours(24);
        assert!(!guard.check_at(tomorrow));
        guard.increment_at(tomorrow);
        assert!(guard.check_at(tomorrow));
    }
}
