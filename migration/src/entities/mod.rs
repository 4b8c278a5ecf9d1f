pub mod daily_traffic;
pub mod domain;
pub mod monthly_traffic;
pub mod streaming_access_log;
pub mod streaming_proxy;

pub use daily_traffic::Entity as DailyTrafficEntity;
pub use domain::Entity as DomainEntity;
pub use monthly_traffic::Entity as MonthlyTrafficEntity;
pub use streaming_access_log::Entity as StreamingAccessLogEntity;
pub use streaming_proxy::Entity as StreamingProxyEntity;
