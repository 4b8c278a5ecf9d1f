//! cdnproxy - domain-based reverse proxy with a traffic analytics pipeline
//!
//! Requests for customer domains are resolved to an upstream, forwarded,
//! and recorded off the response path.
//!
//! # Architecture
//! - `config`: Configuration management
//! - `storage`: SeaORM storage, routing lookups, counter upserts
//! - `services`: Target resolution, traffic classification, GeoIP
//! - `analytics`: Access log writer, traffic aggregator, task queue
//! - `proxy`: Dispatcher, upstream forwarding, fallback responses
//! - `api`: HTTP routes and middleware
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod proxy;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
