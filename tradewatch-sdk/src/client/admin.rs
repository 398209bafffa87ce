//! Operator API client (operator tooling → Tradewatch server).
//!
//! When the server has an admin token configured, every request must carry
//! it as `Authorization: Bearer <token>`.

use reqwest::{Client, RequestBuilder};
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::admin::{
    DeadLetterResponse, MarkFailedRequest, MetricsSnapshot, QueueStatsResponse, ReplayResponse,
    RpcHealthResponse, SweepResponse, TradeResponse,
};

/// Typed HTTP client for the `/admin` routes.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(base_url: Url, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// `GET /admin/trades/{trade_id}`
    pub async fn get_trade(&self, trade_id: &str) -> Result<TradeResponse, ClientError> {
        let url = self.endpoint(&format!("/admin/trades/{trade_id}"))?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /admin/trades/{trade_id}/fail`
    pub async fn mark_trade_failed(
        &self,
        trade_id: &str,
        reason: impl Into<String>,
    ) -> Result<TradeResponse, ClientError> {
        let url = self.endpoint(&format!("/admin/trades/{trade_id}/fail"))?;
        let body = MarkFailedRequest {
            reason: reason.into(),
        };
        let resp = self.authorize(self.http.post(url)).json(&body).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/dead-letters` – parked entries only.
    pub async fn list_dead_letters(&self) -> Result<Vec<DeadLetterResponse>, ClientError> {
        let url = self.endpoint("/admin/dead-letters")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /admin/dead-letters/{event_id}/replay`
    pub async fn replay_dead_letter(&self, event_id: &str) -> Result<ReplayResponse, ClientError> {
        let url = self.endpoint(&format!("/admin/dead-letters/{event_id}/replay"))?;
        let resp = self.authorize(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /admin/dead-letters/sweep` – replay every parked entry.
    pub async fn sweep_dead_letters(&self) -> Result<SweepResponse, ClientError> {
        let url = self.endpoint("/admin/dead-letters/sweep")?;
        let resp = self.authorize(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/queue`
    pub async fn queue_stats(&self) -> Result<QueueStatsResponse, ClientError> {
        let url = self.endpoint("/admin/queue")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/metrics`
    pub async fn metrics(&self) -> Result<MetricsSnapshot, ClientError> {
        let url = self.endpoint("/admin/metrics")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/rpc/health`
    pub async fn rpc_health(&self) -> Result<RpcHealthResponse, ClientError> {
        let url = self.endpoint("/admin/rpc/health")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }
}
