//! Resilient client for scraping quote pages.
//!
//! Rotates browser identities, paces and retries requests with exponential
//! backoff, and optionally routes through a scraping proxy.

mod client;
mod errors;
mod retry;
pub mod user_agent;

pub use self::client::{Client, Document, ProxyConfig, DEFAULT_PROXY_ENDPOINT, REQUEST_TIMEOUT};
pub use self::errors::FetchError;
pub use self::retry::RetryPolicy;
pub use self::user_agent::{next_identity, Identity, PacingWindow};
