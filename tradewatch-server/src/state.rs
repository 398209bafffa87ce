//! Application state shared across all request handlers.

use std::sync::Arc;

use tradewatch_core::processors::{ProcessorHandle, WebhookReceiver};
use tradewatch_core::rpc::RpcClient;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Authenticates, deduplicates and queues inbound webhooks.
    pub receiver: Arc<WebhookReceiver>,
    /// Handle to the running event processor.
    pub processor: ProcessorHandle,
    pub rpc: Arc<RpcClient>,
    /// Bearer token for `/admin`; `None` leaves the operator API open.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        receiver: WebhookReceiver,
        processor: ProcessorHandle,
        rpc: RpcClient,
        admin_token: Option<String>,
    ) -> Self {
        if admin_token.is_none() {
            tracing::warn!("Admin token not configured, the operator API is unauthenticated");
        }
        Self {
            receiver: Arc::new(receiver),
            processor,
            rpc: Arc::new(rpc),
            admin_token: admin_token.map(Arc::from),
        }
    }
}
