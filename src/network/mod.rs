//! HTTP networking module
//!
//! Provides the shared outbound client used by the Supabase store and the restart proxy.

mod client;
mod request;

pub use client::HttpClient;
pub use request::{HttpMethod, HttpResponse, OutboundRequest};
