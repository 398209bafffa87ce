pub mod admin;
pub mod network;
pub mod webhook;

pub use admin::{
    DeadLetterResponse, HealthStatus, LatestTrade, MarkFailedRequest, MetricsSnapshot,
    QueueStatsResponse, ReplayResponse, RpcHealthResponse, SweepResponse, TradeResponse,
    TradeStatus,
};
pub use network::{Network, UnknownNetwork};
pub use webhook::{
    DEFAULT_EVENT_TYPE, ErrorResponse, EventSummary, FINALITY_EVENT_TYPE, HealthResponse,
    WebhookAck, WebhookEnvelope,
};
