// src/client/http.rs
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::DashboardApi;
use crate::config::DashboardConfig;
use crate::error::{ApiError, ApiResult, Endpoint};
use crate::model::{ChatReply, NewsId, NewsItem, ScanState, StatsSnapshot, ToggleAck, TriggerReply};

const USER_AGENT: &str = concat!("cloud-watcher/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed client for the scanning backend.
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    base_url: String,
    chat_context_limit: Option<u32>,
}

#[derive(Serialize)]
struct ChatReq<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_limit: Option<u32>,
}

impl HttpClient {
    pub fn new(cfg: &DashboardConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| ApiError::network(Endpoint::News, format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            chat_context_limit: cfg.chat_context_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: Endpoint,
        resp: reqwest::Response,
    ) -> ApiResult<T> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::network(endpoint, format!("reading body: {e}")))?;
        serde_json::from_str(body.trim()).map_err(|e| ApiError::malformed(endpoint, e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint, path: &str) -> ApiResult<T> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::network(endpoint, e.to_string()))?;
        Self::read_json(endpoint, resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let mut req = self.http.post(self.url(path));
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::network(endpoint, e.to_string()))?;
        Self::read_json(endpoint, resp).await
    }
}

#[async_trait::async_trait]
impl DashboardApi for HttpClient {
    async fn fetch_news(&self) -> ApiResult<Vec<NewsItem>> {
        self.get(Endpoint::News, "/news").await
    }

    async fn fetch_stats(&self) -> ApiResult<StatsSnapshot> {
        self.get(Endpoint::Stats, "/stats").await
    }

    async fn fetch_scan_status(&self) -> ApiResult<ScanState> {
        self.get(Endpoint::ScanStatus, "/scan-status").await
    }

    async fn trigger_scan(&self) -> ApiResult<TriggerReply> {
        self.post::<(), _>(Endpoint::TriggerScan, "/trigger-scan", None)
            .await
    }

    async fn toggle_save(&self, id: &NewsId) -> ApiResult<ToggleAck> {
        let path = format!("/news/{}/toggle-save", urlencoding::encode(id.as_str()));
        self.post::<(), _>(Endpoint::ToggleSave, &path, None).await
    }

    async fn send_chat(&self, question: &str) -> ApiResult<ChatReply> {
        let body = ChatReq {
            question,
            context_limit: self.chat_context_limit,
        };
        self.post(Endpoint::Chat, "/chat", Some(&body)).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
