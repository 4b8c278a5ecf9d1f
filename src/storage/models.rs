use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Active upstream mapping for one customer domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTarget {
    pub id: i64,
    pub domain_id: i64,
    pub owner_user_id: i64,
    pub upstream_url: String,
    pub active: bool,
}

/// Customer domain as configured by the admin subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: i64,
    pub host_name: String,
    pub owner_user_id: i64,
    pub target_url: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub routing_target_id: i64,
    pub client_ip: String,
    pub user_agent: String,
    pub device_type: String,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Monthly counter row for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyUsage {
    pub owner_user_id: i64,
    pub month: u32,
    pub year: i32,
    pub download_bytes: i64,
    pub upload_bytes: i64,
    pub bandwidth_bytes: i64,
    pub request_count: i64,
}
