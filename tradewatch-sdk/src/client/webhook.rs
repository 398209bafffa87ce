//! Webhook client (chain monitor → Tradewatch server).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::webhook::{WebhookAck, WebhookEnvelope};
use crate::signature::{SIGNATURE_HEADER, sign_body};

/// Delivers signed confirmation events to `POST /webhook`.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
    base_url: Url,
    secret: Option<Box<[u8]>>,
}

impl WebhookClient {
    /// * `base_url` – root URL of the Tradewatch server.
    /// * `secret` – shared HMAC secret; `None` sends unsigned requests.
    pub fn new(base_url: Url, secret: Option<&[u8]>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret: secret.map(Box::from),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Serialize and deliver one event.
    pub async fn send(&self, envelope: &WebhookEnvelope) -> Result<WebhookAck, ClientError> {
        let body = serde_json::to_vec(envelope)?;
        self.send_raw(body).await
    }

    /// Deliver an already-encoded body, signing exactly these bytes.
    pub async fn send_raw(&self, body: Vec<u8>) -> Result<WebhookAck, ClientError> {
        let url = self.base_url.join("/webhook")?;

        let mut request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_body(&body, secret));
        }

        let resp = request.body(body).send().await?;
        parse_response(resp).await
    }
}
