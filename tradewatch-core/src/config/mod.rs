//! Configuration types for Tradewatch.
//!
//! These types represent the validated runtime configuration used by the server
//! and can be shared across crates. The actual config loading/parsing is handled
//! by the server crate.

mod processor;
mod rpc;
mod webhook;

pub use processor::{ProcessorConfig, RetryPolicy};
pub use rpc::{NetworkEndpoint, RpcConfig};
pub use webhook::WebhookConfig;
