//! HTTP API surface.
//!
//! - `webhook` – provider ingress (`POST /webhook`)
//! - `admin` – operator API mounted under `/admin`

pub mod admin;
pub mod extractors;
pub mod webhook;
