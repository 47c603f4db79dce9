use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use crate::models::CostStats;

// Cost per 1K tokens in dollars
#[derive(Clone, Copy, Debug)]
struct ModelRates {
    input_per_1k: f64,
    output_per_1k: f64,
}

// gpt-4o-mini: $0.15 per 1M input, $0.60 per 1M output
const GPT_4O_MINI: ModelRates = ModelRates {
    input_per_1k: 0.00015,
    output_per_1k: 0.0006,
};

// gpt-4o: $2.50 per 1M input, $10 per 1M output
const GPT_4O: ModelRates = ModelRates {
    input_per_1k: 0.0025,
    output_per_1k: 0.01,
};

// unknown models price as gpt-4o-mini rather than failing
fn rates_for(model: &str) -> ModelRates {
    match model {
        "gpt-4o" => GPT_4O,
        _ => GPT_4O_MINI,
    }
}

pub fn estimate_cents(input_tokens: u32, output_tokens: u32, model: &str) -> f64 {
    let rates = rates_for(model);
    let dollars = (input_tokens as f64 / 1000.0) * rates.input_per_1k
        + (output_tokens as f64 / 1000.0) * rates.output_per_1k;
    dollars * 100.0
}

struct CostEntry {
    day: NaiveDate,
    cost_cents: f64,
    requests: u32,
}

impl CostEntry {
    fn fresh(day: NaiveDate) -> Self {
        Self {
            day,
            cost_cents: 0.0,
            requests: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CostDenied {
    pub message: String,
    pub limit_cents: f64,
    pub remaining_cents: f64,
}

// Per-IP daily spend ledger for metered endpoints. check() is a
// pre-flight gate against an estimate; record() adds the true cost
// computed from the tokens the call actually consumed. The estimate
// is never persisted as spend, and a failed call records nothing.
pub struct CostMeter {
    store: DashMap<String, CostEntry>,
    daily_limit_cents: f64,
}

impl CostMeter {
    pub fn new(daily_limit_cents: f64) -> Self {
        Self {
            store: DashMap::new(),
            daily_limit_cents,
        }
    }

    pub fn check_at(
        &self,
        ip: &str,
        estimated_cents: f64,
        now: DateTime<Utc>,
    ) -> Result<(), CostDenied> {
        let today = now.date_naive();
        let mut entry = self
            .store
            .entry(ip.to_string())
            .or_insert_with(|| CostEntry::fresh(today));
        if entry.day != today {
            *entry = CostEntry::fresh(today);
        }

        if entry.cost_cents + estimated_cents > self.daily_limit_cents {
            let remaining = (self.daily_limit_cents - entry.cost_cents).max(0.0);
            return Err(CostDenied {
                message: format!(
                    "Daily limit exceeded. Used: ${:.4} of ${:.2}. Remaining: ${:.4}",
                    entry.cost_cents / 100.0,
                    self.daily_limit_cents / 100.0,
                    remaining / 100.0
                ),
                limit_cents: self.daily_limit_cents,
                remaining_cents: remaining,
            });
        }
        Ok(())
    }

    pub fn check(&self, ip: &str, estimated_cents: f64) -> Result<(), CostDenied> {
        self.check_at(ip, estimated_cents, Utc::now())
    }

    pub fn record_at(
        &self,
        ip: &str,
        input_tokens: u32,
        output_tokens: u32,
        model: &str,
        now: DateTime<Utc>,
    ) {
        let today = now.date_naive();
        let cost = estimate_cents(input_tokens, output_tokens, model);
        let mut entry = self
            .store
            .entry(ip.to_string())
            .or_insert_with(|| CostEntry::fresh(today));
        if entry.day != today {
            *entry = CostEntry::fresh(today);
        }
        entry.cost_cents += cost;
        entry.requests += 1;
    }

    pub fn record(&self, ip: &str, input_tokens: u32, output_tokens: u32, model: &str) {
        self.record_at(ip, input_tokens, output_tokens, model, Utc::now());
    }

    pub fn stats_at(&self, ip: &str, now: DateTime<Utc>) -> CostStats {
        let today = now.date_naive();
        let (cost_cents, requests) = match self.store.get(ip) {
            Some(entry) if entry.day == today => (entry.cost_cents, entry.requests),
            _ => (0.0, 0),
        };
        CostStats {
            ip: ip.to_string(),
            date: today.format("%Y-%m-%d").to_string(),
            cost_cents: round4(cost_cents),
            requests,
            limit_cents: self.daily_limit_cents,
            remaining_cents: round4((self.daily_limit_cents - cost_cents).max(0.0)),
        }
    }

    pub fn stats(&self, ip: &str) -> CostStats {
        self.stats_at(ip, Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let today = now.date_naive();
        let before = self.store.len();
        self.store.retain(|_, entry| entry.day == today);
        before - self.store.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }
}

fn round4(cents: f64) -> f64 {
    (cents * 10_000.0).round() / 10_000.0
}
