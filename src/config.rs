use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "quota-gateway")]
#[command(about = "Anonymous quota and rate limiting gateway for AI agent endpoints")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // AI agent backend base URL
    #[arg(short, long, default_value = "http://localhost:9000")]
    pub upstream_url: String,

    // Auth service validation endpoint; unset means every caller is anonymous
    #[arg(long)]
    pub auth_url: Option<String>,

    // Per-caller daily request limit for anonymous users
    #[arg(long, default_value_t = 3)]
    pub anonymous_daily_limit: u32,

    // Service-wide daily request limit across all anonymous users
    #[arg(long, default_value_t = 1000)]
    pub global_daily_limit: u32,

    // Max requests per IP in any 60 second window
    #[arg(long, default_value_t = 10)]
    pub burst_limit_per_minute: usize,

    // HMAC secret for anonymous session tokens
    #[arg(long, default_value = "anon-session-secret-change-in-production!")]
    pub session_secret: String,

    // Daily spend ceiling per IP for metered endpoints, in cents
    #[arg(long, default_value_t = 20.0)]
    pub daily_cost_limit_cents: f64,

    // Seconds between ledger cleanup sweeps
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,
}
