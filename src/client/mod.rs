// src/client/mod.rs
//! Typed access to the scanning backend.

pub mod http;
pub mod scripted;

use std::sync::Arc;

use crate::error::ApiResult;
use crate::model::{ChatReply, NewsId, NewsItem, ScanState, StatsSnapshot, ToggleAck, TriggerReply};

pub use http::HttpClient;
pub use scripted::ScriptedClient;

/// The six backend calls the dashboard makes. No retries happen at this layer.
#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_news(&self) -> ApiResult<Vec<NewsItem>>;
    async fn fetch_stats(&self) -> ApiResult<StatsSnapshot>;
    async fn fetch_scan_status(&self) -> ApiResult<ScanState>;
    async fn trigger_scan(&self) -> ApiResult<TriggerReply>;
    async fn toggle_save(&self, id: &NewsId) -> ApiResult<ToggleAck>;
    async fn send_chat(&self, question: &str) -> ApiResult<ChatReply>;
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by the controller parts.
pub type DynApi = Arc<dyn DashboardApi>;
