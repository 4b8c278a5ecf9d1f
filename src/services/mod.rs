//! Service layer
//!
//! Request-independent logic shared by the proxy handlers and the
//! analytics workers.

pub mod classifier;
pub mod geoip;
mod target_resolver;

pub use classifier::{DeviceType, classify_device, is_bot, is_browser};
pub use geoip::{GeoIpLookup, GeoResolver, Geolocation};
pub use target_resolver::TargetResolver;
