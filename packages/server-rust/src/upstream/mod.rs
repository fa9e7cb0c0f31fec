//! Outbound HTTP boundary to the Postman API.
//!
//! - [`config`]: base URL, API key and request timeout
//! - [`request`]: transport-independent request description
//! - [`client`]: reqwest implementation of [`Upstream`](crate::traits::Upstream)

pub mod client;
pub mod config;
pub mod request;

pub use client::HttpUpstream;
pub use config::{UpstreamConfig, DEFAULT_BASE_URL};
pub use request::UpstreamRequest;
