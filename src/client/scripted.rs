// src/client/scripted.rs
//! Deterministic in-memory backend for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;

use super::DashboardApi;
use crate::error::{ApiError, ApiResult, Endpoint};
use crate::model::{ChatReply, NewsId, NewsItem, ScanState, StatsSnapshot, ToggleAck, TriggerReply};

/// Queue of scripted answers. Once drained to one entry, that entry repeats.
struct Script<T> {
    queue: VecDeque<ApiResult<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self, endpoint: Endpoint) -> ApiResult<T> {
        if self.queue.len() > 1 {
            if let Some(v) = self.queue.pop_front() {
                return v;
            }
        }
        self.queue
            .front()
            .cloned()
            .unwrap_or_else(|| Err(ApiError::network(endpoint, "no scripted response")))
    }
}

#[derive(Default)]
struct ScriptState {
    news: Script<Vec<NewsItem>>,
    stats: Script<StatsSnapshot>,
    scan_status: Script<ScanState>,
    trigger: Script<TriggerReply>,
    toggle: Script<ToggleAck>,
    chat: Script<ChatReply>,
    calls: HashMap<Endpoint, usize>,
    latency: HashMap<Endpoint, Duration>,
    toggled: Vec<NewsId>,
    questions: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedClient {
    state: Mutex<ScriptState>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_news(&self, r: ApiResult<Vec<NewsItem>>) -> &Self {
        self.state.lock().news.queue.push_back(r);
        self
    }

    pub fn push_stats(&self, r: ApiResult<StatsSnapshot>) -> &Self {
        self.state.lock().stats.queue.push_back(r);
        self
    }

    pub fn push_scan_status(&self, r: ApiResult<ScanState>) -> &Self {
        self.state.lock().scan_status.queue.push_back(r);
        self
    }

    pub fn push_trigger(&self, r: ApiResult<TriggerReply>) -> &Self {
        self.state.lock().trigger.queue.push_back(r);
        self
    }

    pub fn push_toggle(&self, r: ApiResult<ToggleAck>) -> &Self {
        self.state.lock().toggle.queue.push_back(r);
        self
    }

    pub fn push_chat(&self, r: ApiResult<ChatReply>) -> &Self {
        self.state.lock().chat.queue.push_back(r);
        self
    }

    /// Delay every answer from `endpoint` by `delay` (tokio time, so paused clocks apply).
    pub fn set_latency(&self, endpoint: Endpoint, delay: Duration) -> &Self {
        self.state.lock().latency.insert(endpoint, delay);
        self
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.state.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn toggled_ids(&self) -> Vec<NewsId> {
        self.state.lock().toggled.clone()
    }

    pub fn chat_questions(&self) -> Vec<String> {
        self.state.lock().questions.clone()
    }

    async fn answer<T>(
        &self,
        endpoint: Endpoint,
        pick: impl FnOnce(&mut ScriptState) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let (out, delay) = {
            let mut g = self.state.lock();
            *g.calls.entry(endpoint).or_insert(0) += 1;
            let delay = g.latency.get(&endpoint).copied();
            (pick(&mut *g), delay)
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        out
    }
}

#[async_trait::async_trait]
impl DashboardApi for ScriptedClient {
    async fn fetch_news(&self) -> ApiResult<Vec<NewsItem>> {
        self.answer(Endpoint::News, |s| s.news.next(Endpoint::News))
            .await
    }

    async fn fetch_stats(&self) -> ApiResult<StatsSnapshot> {
        self.answer(Endpoint::Stats, |s| s.stats.next(Endpoint::Stats))
            .await
    }

    async fn fetch_scan_status(&self) -> ApiResult<ScanState> {
        self.answer(Endpoint::ScanStatus, |s| {
            s.scan_status.next(Endpoint::ScanStatus)
        })
        .await
    }

    async fn trigger_scan(&self) -> ApiResult<TriggerReply> {
        self.answer(Endpoint::TriggerScan, |s| {
            s.trigger.next(Endpoint::TriggerScan)
        })
        .await
    }

    async fn toggle_save(&self, id: &NewsId) -> ApiResult<ToggleAck> {
        let id = id.clone();
        self.answer(Endpoint::ToggleSave, move |s| {
            s.toggled.push(id);
            s.toggle.next(Endpoint::ToggleSave)
        })
        .await
    }

    async fn send_chat(&self, question: &str) -> ApiResult<ChatReply> {
        let q = question.to_string();
        self.answer(Endpoint::Chat, move |s| {
            s.questions.push(q);
            s.chat.next(Endpoint::Chat)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_answer_repeats_and_calls_are_counted() {
        let client = ScriptedClient::new();
        client
            .push_chat(Ok(ChatReply {
                response: "one".into(),
            }))
            .push_chat(Ok(ChatReply {
                response: "two".into(),
            }));

        assert_eq!(client.send_chat("a").await.unwrap().response, "one");
        assert_eq!(client.send_chat("b").await.unwrap().response, "two");
        assert_eq!(client.send_chat("c").await.unwrap().response, "two");
        assert_eq!(client.calls(Endpoint::Chat), 3);
        assert_eq!(client.chat_questions(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn unscripted_endpoint_fails_as_network_error() {
        let client = ScriptedClient::new();
        let err = client.fetch_stats().await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.endpoint(), Endpoint::Stats);
    }
}
