//! domains + streaming_proxies
//!
//! `domains` belongs to the admin subsystem; it is created here only when
//! missing so the proxy core can run against a fresh database.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Domains::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domains::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domains::HostName).string_len(255).not_null())
                    .col(ColumnDef::new(Domains::OwnerUserId).big_integer().not_null())
                    .col(ColumnDef::new(Domains::TargetUrl).text().not_null())
                    .col(
                        ColumnDef::new(Domains::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Domains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Domains::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_domains_host_name")
                    .table(Domains::Table)
                    .col(Domains::HostName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StreamingProxies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StreamingProxies::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StreamingProxies::DomainId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StreamingProxies::UpstreamUrl).text().not_null())
                    .col(
                        ColumnDef::new(StreamingProxies::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(StreamingProxies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StreamingProxies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One routing target per domain; lazy creation relies on this to
        // stay idempotent under concurrent first requests.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_streaming_proxies_domain_id")
                    .table(StreamingProxies::Table)
                    .col(StreamingProxies::DomainId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_streaming_proxies_domain_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(StreamingProxies::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_domains_host_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Domains::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Domains {
    #[sea_orm(iden = "domains")]
    Table,
    Id,
    HostName,
    OwnerUserId,
    TargetUrl,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StreamingProxies {
    #[sea_orm(iden = "streaming_proxies")]
    Table,
    Id,
    DomainId,
    UpstreamUrl,
    Active,
    CreatedAt,
    UpdatedAt,
}
