//! streaming_access_logs
//!
//! Append-only; bulk deletion is an external maintenance job.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StreamingAccessLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StreamingAccessLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StreamingAccessLogs::StreamingProxyId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StreamingAccessLogs::ClientIp)
                            .string_len(45)
                            .null(),
                    )
                    .col(ColumnDef::new(StreamingAccessLogs::UserAgent).text().null())
                    .col(
                        ColumnDef::new(StreamingAccessLogs::DeviceType)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StreamingAccessLogs::CountryCode)
                            .string_len(8)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StreamingAccessLogs::CountryName)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StreamingAccessLogs::City)
                            .string_len(100)
                            .null(),
                    )
                    .col(ColumnDef::new(StreamingAccessLogs::Latitude).double().null())
                    .col(ColumnDef::new(StreamingAccessLogs::Longitude).double().null())
                    .col(
                        ColumnDef::new(StreamingAccessLogs::CreatedAt)
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
                    .name("idx_access_logs_proxy_id")
                    .table(StreamingAccessLogs::Table)
                    .col(StreamingAccessLogs::StreamingProxyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_access_logs_created_at")
                    .table(StreamingAccessLogs::Table)
                    .col(StreamingAccessLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_access_logs_created_at").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_access_logs_proxy_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(StreamingAccessLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StreamingAccessLogs {
    #[sea_orm(iden = "streaming_access_logs")]
    Table,
    Id,
    StreamingProxyId,
    ClientIp,
    UserAgent,
    DeviceType,
    CountryCode,
    CountryName,
    City,
    Latitude,
    Longitude,
    CreatedAt,
}
