pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20251101_000001_domains_and_proxies;
mod m20251101_000002_access_logs;
mod m20251101_000003_traffic_counters;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251101_000001_domains_and_proxies::Migration),
            Box::new(m20251101_000002_access_logs::Migration),
            Box::new(m20251101_000003_traffic_counters::Migration),
        ]
    }
}
