use std::sync::Arc;

use crate::auth::AuthVerifier;
use crate::burst::BurstGuard;
use crate::config::Args;
use crate::cost::CostMeter;
use crate::global_cap::GlobalCapGuard;
use crate::ledger::UsageLedger;
use crate::session::IdentityIssuer;
use crate::upstream::AgentBackend;

// App's shared state. Every ledger is owned here and handed to
// handlers by Arc; nothing lives in ambient globals, so the whole
// guard stack can be built fresh in tests.
pub struct AppState {
    pub ledger: UsageLedger,
    pub burst: BurstGuard,
    pub global_cap: GlobalCapGuard,
    pub cost: CostMeter,
    pub sessions: IdentityIssuer,
    pub auth: Arc<dyn AuthVerifier>,
    pub backend: Arc<dyn AgentBackend>,
}

impl AppState {
    pub fn new(args: &Args, auth: Arc<dyn AuthVerifier>, backend: Arc<dyn AgentBackend>) -> Self {
        Self {
            ledger: UsageLedger::new(args.anonymous_daily_limit),
            burst: BurstGuard::new(args.burst_limit_per_minute),
            global_cap: GlobalCapGuard::new(args.global_daily_limit),
            cost: CostMeter::new(args.daily_cost_limit_cents),
            sessions: IdentityIssuer::new(&args.session_secret),
            auth,
            backend,
        }
    }
}
