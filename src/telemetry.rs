// src/telemetry.rs
//! Metrics registration and tracing setup.

use metrics::{describe_counter, Unit};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "CLOUD_WATCHER_LOG_JSON";

/// One-time metrics registration (so series carry descriptions once a recorder is installed).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dashboard_refresh_total", Unit::Count, "Full data refreshes run.");
        describe_counter!(
            "dashboard_fetch_errors_total",
            Unit::Count,
            "Backend calls that failed during refresh, by endpoint."
        );
        describe_counter!(
            "dashboard_toggle_rollbacks_total",
            Unit::Count,
            "Optimistic save toggles reverted after a backend failure."
        );
        describe_counter!("scan_polls_total", Unit::Count, "Scan status polls performed.");
        describe_counter!("scan_completed_total", Unit::Count, "Scans observed to completion.");
        describe_counter!("scan_failed_total", Unit::Count, "Scan lifecycles ended by a poll error.");
        describe_counter!("chat_requests_total", Unit::Count, "Advisor questions sent.");
        describe_counter!("chat_errors_total", Unit::Count, "Advisor questions that failed.");
    });
}

/// Install the global subscriber. Filter comes from `RUST_LOG`; JSON output when
/// `CLOUD_WATCHER_LOG_JSON=1`. Safe to call twice (second call is a no-op).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cloud_watcher=info,warn"));

    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
