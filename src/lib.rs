// src/lib.rs
// Public library surface for the console binary and integration tests.

pub mod chat;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod filters;
pub mod model;
pub mod scan;
pub mod telemetry;
pub mod theme;

// ---- Re-exports for stable public API ----
pub use crate::chat::{ChatRole, ChatSession, ChatTurn, SendOutcome};
pub use crate::client::{DashboardApi, DynApi, HttpClient, ScriptedClient};
pub use crate::config::DashboardConfig;
pub use crate::dashboard::{DashboardState, DashboardView, Tab, ToggleOutcome};
pub use crate::display::{DisplayClock, DisplayLocale, Timestamps};
pub use crate::error::{ApiError, ApiResult, Endpoint};
pub use crate::filters::{Choice, FilterCriteria};
pub use crate::model::{
    ImpactLevel, NewsId, NewsItem, Provider, ScanState, StatsSnapshot, ToggleAck, TriggerReply,
};
pub use crate::scan::{ScanMonitor, ScanObserver, ScanPhase, TriggerOutcome};
pub use crate::theme::{Theme, ThemeStore};

use tracing::info;

/// Build a dashboard from `config/dashboard.toml` / env and run its startup
/// sequence (theme, first refresh, scan resume).
///
/// ```ignore
/// let dash = cloud_watcher::boot().await?;
/// println!("{} items", dash.filtered_news().len());
/// ```
pub async fn boot() -> anyhow::Result<DashboardState> {
    let cfg = DashboardConfig::load_default()?;
    info!(api = %cfg.api_base_url, timezone = %cfg.timezone, "booting dashboard");
    let dash = DashboardState::from_config(&cfg)?;
    dash.start().await;
    Ok(dash)
}
