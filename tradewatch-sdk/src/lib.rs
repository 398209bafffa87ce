//! Shared types for the Tradewatch confirmation pipeline.
//!
//! Chain monitors and operator tooling depend on this crate to speak the
//! server's wire format. Enable the `client` feature for typed HTTP clients.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
