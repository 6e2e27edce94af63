// src/dashboard.rs
//! Central store: loaded entities, filters, UI flags and the refresh sequence.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::chat::{ChatSession, SendOutcome};
use crate::client::{DynApi, HttpClient};
use crate::config::DashboardConfig;
use crate::display::{DisplayClock, Timestamps};
use crate::error::ApiError;
use crate::filters::{self, FilterCriteria};
use crate::model::{NewsId, NewsItem, ScanState, StatsSnapshot};
use crate::scan::{ScanMonitor, ScanObserver, TriggerOutcome};
use crate::telemetry::ensure_metrics_described;
use crate::theme::{Theme, ThemeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Saved,
    Analytics,
    Advisor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Backend accepted; `is_saved` is the value now shown.
    Confirmed { is_saved: bool },
    /// Backend call failed; the local flip was reverted.
    RolledBack,
    /// No loaded item carries that id.
    NotFound,
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub news: Vec<NewsItem>,
    pub stats: StatsSnapshot,
    pub filters: FilterCriteria,
    pub timestamps: Timestamps,
    pub loading: bool,
    pub has_new_data: bool,
    pub active_tab: Tab,
    pub selected: Option<NewsId>,
    pub theme: Theme,
}

#[derive(Default)]
struct Store {
    view: DashboardView,
    refreshes_in_flight: u32,
}

/// Keeps `loading` raised while at least one refresh is alive, including
/// refreshes whose future is dropped before finishing.
struct RefreshGuard<'a>(&'a RwLock<Store>);

impl<'a> RefreshGuard<'a> {
    fn enter(store: &'a RwLock<Store>) -> Self {
        let mut s = store.write();
        s.refreshes_in_flight += 1;
        s.view.loading = true;
        s.view.has_new_data = false;
        drop(s);
        Self(store)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut s = self.0.write();
        s.refreshes_in_flight = s.refreshes_in_flight.saturating_sub(1);
        s.view.loading = s.refreshes_in_flight > 0;
    }
}

/// Part of the state the scan poll task also needs.
struct Core {
    client: DynApi,
    clock: DisplayClock,
    store: RwLock<Store>,
}

impl Core {
    async fn refresh(&self) {
        counter!("dashboard_refresh_total").increment(1);
        let _loading = RefreshGuard::enter(&self.store);

        // Order matters: timestamps read the news that was just loaded.
        match self.client.fetch_news().await {
            Ok(news) => {
                debug!(target: "dashboard", count = news.len(), "news loaded");
                self.store.write().view.news = news;
            }
            Err(e) => fetch_failed(&e),
        }
        match self.client.fetch_stats().await {
            Ok(stats) => {
                self.store.write().view.stats = stats;
            }
            Err(e) => fetch_failed(&e),
        }
        self.update_timestamps().await;
    }

    async fn update_timestamps(&self) {
        match self.client.fetch_scan_status().await {
            Ok(status) => self.apply_scan_time(&status),
            Err(e) => fetch_failed(&e),
        }

        let mut s = self.store.write();
        let newest = s
            .view
            .news
            .first()
            .map(|item| self.clock.article_time(item.created_at));
        if let Some(text) = newest {
            s.view.timestamps.last_article = text;
        }
    }

    fn apply_scan_time(&self, status: &ScanState) {
        if let Some(ts) = status.last_execution {
            self.store.write().view.timestamps.last_scan = self.clock.scan_time(ts);
        }
    }

    async fn toggle_save(&self, id: &NewsId) -> ToggleOutcome {
        let tentative = {
            let mut s = self.store.write();
            match s.view.news.iter_mut().find(|n| &n.id == id) {
                Some(item) => {
                    item.is_saved = !item.is_saved;
                    item.is_saved
                }
                None => return ToggleOutcome::NotFound,
            }
        };

        match self.client.toggle_save(id).await {
            Ok(ack) => {
                let is_saved = ack.is_saved.unwrap_or(tentative);
                if is_saved != tentative {
                    debug!(target: "dashboard", %id, is_saved, "backend disagreed with optimistic toggle");
                }
                let mut s = self.store.write();
                if let Some(item) = s.view.news.iter_mut().find(|n| &n.id == id) {
                    item.is_saved = is_saved;
                }
                ToggleOutcome::Confirmed { is_saved }
            }
            Err(e) => {
                warn!(target: "dashboard", %id, error = %e, "toggle save failed; reverting");
                counter!("dashboard_toggle_rollbacks_total").increment(1);
                let mut s = self.store.write();
                // Look the item up again: the list may have been reloaded meanwhile.
                if let Some(item) = s.view.news.iter_mut().find(|n| &n.id == id) {
                    if item.is_saved == tentative {
                        item.is_saved = !tentative;
                    }
                }
                ToggleOutcome::RolledBack
            }
        }
    }
}

fn fetch_failed(e: &ApiError) {
    warn!(target: "dashboard", endpoint = %e.endpoint(), error = %e, "fetch failed; keeping previous data");
    counter!("dashboard_fetch_errors_total", "endpoint" => e.endpoint().label()).increment(1);
}

#[async_trait::async_trait]
impl ScanObserver for Core {
    fn status_polled(&self, status: &ScanState) {
        self.apply_scan_time(status);
    }

    async fn scan_completed(&self, status: &ScanState) {
        self.refresh().await;
        // Raised after the refresh, which clears it on entry.
        if status.new_added > 0 {
            info!(target: "dashboard", new_added = status.new_added, "new data available");
            self.store.write().view.has_new_data = true;
        }
    }
}

pub struct DashboardState {
    core: Arc<Core>,
    monitor: ScanMonitor,
    chat: ChatSession,
    theme_store: Option<ThemeStore>,
}

impl DashboardState {
    pub fn new(client: DynApi, monitor: ScanMonitor, chat: ChatSession, clock: DisplayClock) -> Self {
        ensure_metrics_described();
        Self {
            core: Arc::new(Core {
                client,
                clock,
                store: RwLock::new(Store::default()),
            }),
            monitor,
            chat,
            theme_store: None,
        }
    }

    pub fn with_theme_store(mut self, store: ThemeStore) -> Self {
        self.theme_store = Some(store);
        self
    }

    /// HTTP client, monitor, chat and theme store wired from configuration.
    pub fn from_config(cfg: &DashboardConfig) -> anyhow::Result<Self> {
        let client: DynApi = Arc::new(HttpClient::new(cfg).context("building backend client")?);
        let clock = cfg.display_clock()?;
        let monitor = ScanMonitor::new(client.clone(), cfg.poll_interval());
        let chat = ChatSession::new(client.clone());
        Ok(Self::new(client, monitor, chat, clock).with_theme_store(ThemeStore::new(&cfg.prefs_path)))
    }

    fn observer(&self) -> Arc<dyn ScanObserver> {
        self.core.clone()
    }

    /// Load the theme, run the first refresh and attach to a running scan.
    pub async fn start(&self) {
        if let Some(store) = &self.theme_store {
            let theme = store.load();
            self.core.store.write().view.theme = theme;
        }
        let (_, scanning) = tokio::join!(self.refresh(), self.monitor.resume(self.observer()));
        info!(
            target: "dashboard",
            backend = self.core.client.name(),
            scanning,
            "dashboard started"
        );
    }

    /// News, then stats, then timestamps. Never fails; failed slices keep their value.
    pub async fn refresh(&self) {
        self.core.refresh().await;
    }

    /// Start a scan; when the backend is already scanning, follow that one instead.
    pub async fn trigger_scan(&self) -> TriggerOutcome {
        let outcome = self.monitor.trigger(self.observer()).await;
        if outcome == TriggerOutcome::Busy {
            self.monitor.resume(self.observer()).await;
        }
        outcome
    }

    pub async fn resume_scan(&self) -> bool {
        self.monitor.resume(self.observer()).await
    }

    pub async fn toggle_save(&self, id: &NewsId) -> ToggleOutcome {
        self.core.toggle_save(id).await
    }

    pub async fn send_chat(&self, question: &str) -> SendOutcome {
        self.chat.send(question).await
    }

    pub fn monitor(&self) -> &ScanMonitor {
        &self.monitor
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn clock(&self) -> DisplayClock {
        self.core.clock
    }

    // --- derived views (recomputed on every call) ---

    pub fn filtered_news(&self) -> Vec<NewsItem> {
        let s = self.core.store.read();
        filters::filter_news(&s.view.news, &s.view.filters)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn saved_news(&self) -> Vec<NewsItem> {
        let s = self.core.store.read();
        filters::saved_news(&s.view.news).into_iter().cloned().collect()
    }

    pub fn unique_categories(&self) -> BTreeSet<String> {
        filters::unique_categories(&self.core.store.read().view.news)
    }

    // --- filters ---

    pub fn filters(&self) -> FilterCriteria {
        self.core.store.read().view.filters.clone()
    }

    pub fn set_filters(&self, criteria: FilterCriteria) {
        self.core.store.write().view.filters = criteria;
    }

    pub fn update_filters(&self, f: impl FnOnce(&mut FilterCriteria)) {
        f(&mut self.core.store.write().view.filters);
    }

    pub fn reset_filters(&self) {
        self.core.store.write().view.filters = FilterCriteria::default();
    }

    // --- plain state ---

    pub fn news(&self) -> Vec<NewsItem> {
        self.core.store.read().view.news.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.store.read().view.stats.clone()
    }

    pub fn timestamps(&self) -> Timestamps {
        self.core.store.read().view.timestamps.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.core.store.read().view.loading
    }

    pub fn has_new_data(&self) -> bool {
        self.core.store.read().view.has_new_data
    }

    pub fn snapshot(&self) -> DashboardView {
        self.core.store.read().view.clone()
    }

    // --- UI flags ---

    pub fn active_tab(&self) -> Tab {
        self.core.store.read().view.active_tab
    }

    pub fn switch_tab(&self, tab: Tab) {
        self.core.store.write().view.active_tab = tab;
    }

    /// Select an item for the detail view. Returns false when the id is unknown.
    pub fn open_item(&self, id: &NewsId) -> bool {
        let mut s = self.core.store.write();
        if s.view.news.iter().any(|n| &n.id == id) {
            s.view.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn close_item(&self) {
        self.core.store.write().view.selected = None;
    }

    pub fn selected_item(&self) -> Option<NewsItem> {
        let s = self.core.store.read();
        let id = s.view.selected.as_ref()?;
        s.view.news.iter().find(|n| &n.id == id).cloned()
    }

    pub fn theme(&self) -> Theme {
        self.core.store.read().view.theme
    }

    /// Flip and persist the theme. A failed write is logged; the flip stays.
    pub fn toggle_theme(&self) -> Theme {
        let theme = {
            let mut s = self.core.store.write();
            s.view.theme = s.view.theme.toggled();
            s.view.theme
        };
        if let Some(store) = &self.theme_store {
            if let Err(e) = store.save(theme) {
                warn!(target: "dashboard", error = %format!("{e:#}"), "could not persist theme");
            }
        }
        theme
    }

    /// Stop scan polling; used on view teardown.
    pub fn shutdown(&self) {
        self.monitor.dispose();
    }
}
