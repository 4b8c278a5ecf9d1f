//! Access log writer: classify, geolocate, persist

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use super::AccessLogSink;
use crate::services::{GeoResolver, classify_device, is_bot};
use crate::storage::AccessLogEntry;

/// What happened to one access record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    SkippedBot,
    SkippedUnknownDevice,
    Written,
}

pub struct AccessLogWriter {
    sink: Arc<dyn AccessLogSink>,
    geo: Arc<GeoResolver>,
}

impl AccessLogWriter {
    pub fn new(sink: Arc<dyn AccessLogSink>, geo: Arc<GeoResolver>) -> Self {
        Self { sink, geo }
    }

    /// Record one proxied access.
    ///
    /// Bots and unrecognized devices are dropped silently. A failed geo
    /// lookup still writes the row, with every geo column empty.
    pub async fn record(
        &self,
        routing_target_id: i64,
        client_ip: &str,
        user_agent: &str,
    ) -> anyhow::Result<RecordOutcome> {
        if is_bot(user_agent) {
            trace!("Skipping bot access from {}: {}", client_ip, user_agent);
            return Ok(RecordOutcome::SkippedBot);
        }

        let device = classify_device(user_agent);
        if !device.is_known() {
            trace!("Skipping unknown device from {}: {}", client_ip, user_agent);
            return Ok(RecordOutcome::SkippedUnknownDevice);
        }

        let geo = match self.geo.resolve(client_ip).await {
            Ok(geo) => Some(geo),
            Err(e) => {
                debug!("Geolocation unavailable for {}: {}", client_ip, e);
                None
            }
        };

        let entry = AccessLogEntry {
            routing_target_id,
            client_ip: client_ip.to_string(),
            user_agent: user_agent.to_string(),
            device_type: device.to_string(),
            country_code: geo.as_ref().map(|g| g.country_code.clone()),
            country_name: geo.as_ref().map(|g| g.country_name.clone()),
            city: geo.as_ref().map(|g| g.city.clone()),
            latitude: geo.as_ref().map(|g| g.latitude),
            longitude: geo.as_ref().map(|g| g.longitude),
            created_at: Utc::now(),
        };

        self.sink.write_access_log(entry).await?;
        Ok(RecordOutcome::Written)
    }
}
