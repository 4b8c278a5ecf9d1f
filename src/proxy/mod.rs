//! Reverse-proxy engine
//!
//! - [`Dispatcher`]: resolves the target and decides deny / forward
//! - [`Forwarder`]: streams the upstream response back
//! - [`fallback`]: deny page and structured errors

pub mod client_ip;
mod completion;
mod dispatcher;
pub mod fallback;
mod forwarder;

pub use client_ip::{client_ip, extract_client_ip};
pub use completion::CompletionGuard;
pub use dispatcher::{Dispatcher, request_host, strip_port};
pub use forwarder::{Forwarder, build_upstream_url, fallback_url, parse_upstream};
