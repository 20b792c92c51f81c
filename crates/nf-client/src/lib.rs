//! # nf-client
//!
//! HTTP client for the newsfilter article feed. Handles bearer
//! authentication, bounded request timeouts and retry with backoff;
//! pagination is exposed as a cursor-driven `fetch_page`.

pub mod client;
pub mod transport;

pub use client::NewsfilterClient;
pub use transport::{RetryPolicy, Transport};
