use sea_orm::ActiveValue::Set;

use crate::storage::{AccessLogEntry, DomainRecord, MonthlyUsage, RoutingTarget};
use migration::entities::{domain, monthly_traffic, streaming_access_log, streaming_proxy};

/// Routing target rows carry no owner; it comes from the joined domain.
pub fn model_to_routing_target(model: streaming_proxy::Model, owner_user_id: i64) -> RoutingTarget {
    RoutingTarget {
        id: model.id,
        domain_id: model.domain_id,
        owner_user_id,
        upstream_url: model.upstream_url,
        active: model.active,
    }
}

pub fn model_to_domain(model: domain::Model) -> DomainRecord {
    DomainRecord {
        id: model.id,
        host_name: model.host_name,
        owner_user_id: model.owner_user_id,
        target_url: model.target_url,
        active: model.active,
    }
}

pub fn access_log_to_active_model(entry: &AccessLogEntry) -> streaming_access_log::ActiveModel {
    streaming_access_log::ActiveModel {
        streaming_proxy_id: Set(entry.routing_target_id),
        client_ip: Set(non_empty(&entry.client_ip)),
        user_agent: Set(non_empty(&entry.user_agent)),
        device_type: Set(non_empty(&entry.device_type)),
        country_code: Set(entry.country_code.clone()),
        country_name: Set(entry.country_name.clone()),
        city: Set(entry.city.clone()),
        latitude: Set(entry.latitude),
        longitude: Set(entry.longitude),
        created_at: Set(entry.created_at),
        ..Default::default()
    }
}

pub fn model_to_access_log(model: streaming_access_log::Model) -> AccessLogEntry {
    AccessLogEntry {
        routing_target_id: model.streaming_proxy_id,
        client_ip: model.client_ip.unwrap_or_default(),
        user_agent: model.user_agent.unwrap_or_default(),
        device_type: model.device_type.unwrap_or_default(),
        country_code: model.country_code,
        country_name: model.country_name,
        city: model.city,
        latitude: model.latitude,
        longitude: model.longitude,
        created_at: model.created_at,
    }
}

pub fn model_to_monthly_usage(model: monthly_traffic::Model) -> MonthlyUsage {
    MonthlyUsage {
        owner_user_id: model.owner_user_id,
        month: model.month.max(0) as u32,
        year: model.year,
        download_bytes: model.download_bytes,
        upload_bytes: model.upload_bytes,
        bandwidth_bytes: model.bandwidth_bytes,
        request_count: model.request_count,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    #[test]
    fn test_routing_target_takes_owner_from_domain() {
        let now = Utc::now();
        let model = streaming_proxy::Model {
            id: 3,
            domain_id: 9,
            upstream_url: "http://origin.example.com/".to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        let target = model_to_routing_target(model, 42);
        assert_eq!(target.owner_user_id, 42);
        assert_eq!(target.domain_id, 9);
        assert!(target.active);
    }

    #[test]
    fn test_access_log_empty_strings_become_null() {
        let entry = AccessLogEntry {
            routing_target_id: 1,
            client_ip: String::new(),
            user_agent: "VLC/3.0 (Linux)".to_string(),
            device_type: "Linux".to_string(),
            country_code: None,
            country_name: None,
            city: None,
            latitude: None,
            longitude: None,
            created_at: Utc::now(),
        };
        let am = access_log_to_active_model(&entry);
        assert!(matches!(am.client_ip, ActiveValue::Set(None)));
        assert!(matches!(
            &am.user_agent,
            ActiveValue::Set(Some(ua)) if ua == "VLC/3.0 (Linux)"
        ));
        assert!(matches!(am.id, ActiveValue::NotSet));
    }
}
