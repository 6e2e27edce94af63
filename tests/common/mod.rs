// tests/common/mod.rs
// Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use cloud_watcher::scan::DEFAULT_POLL_INTERVAL;
use cloud_watcher::{
    ChatSession, DashboardState, DisplayClock, DynApi, ImpactLevel, NewsId, NewsItem, Provider,
    ScanMonitor, ScanState, ScriptedClient,
};

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn item(id: u64, provider: Provider, impact: ImpactLevel, category: &str, title: &str) -> NewsItem {
    NewsItem {
        id: NewsId::from(id),
        title: title.to_string(),
        summary: format!("details for {title}"),
        provider,
        category: category.to_string(),
        impact_level: impact,
        created_at: at(2024, 3, 2, 14, 5),
        is_saved: false,
        link: None,
    }
}

/// Newest first, as the backend returns it.
pub fn feed() -> Vec<NewsItem> {
    vec![
        item(1, Provider::Aws, ImpactLevel::Critical, "Security", "S3 bucket policy change"),
        item(2, Provider::Azure, ImpactLevel::Minor, "Compute", "New VM sizes"),
        item(3, Provider::Gcp, ImpactLevel::Major, "Database", "Cloud SQL maintenance"),
        item(5, Provider::Aws, ImpactLevel::Major, "Compute", "EC2 pricing update"),
    ]
}

pub fn scan(progress: u8, is_scanning: bool, new_added: u32) -> ScanState {
    ScanState {
        is_scanning,
        progress,
        last_execution: Some(at(2024, 3, 2, 13, 0)),
        new_added,
        total_found: new_added,
        message: None,
    }
}

pub fn dashboard(client: &Arc<ScriptedClient>) -> DashboardState {
    let api: DynApi = client.clone();
    DashboardState::new(
        api.clone(),
        ScanMonitor::new(api.clone(), DEFAULT_POLL_INTERVAL),
        ChatSession::new(api),
        DisplayClock::default(),
    )
}
