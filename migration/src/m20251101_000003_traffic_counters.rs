//! daily_traffics + monthly_traffic
//!
//! Both tables carry a unique key so increments can be written as a
//! single `INSERT ... ON CONFLICT DO UPDATE`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyTraffics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyTraffics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DailyTraffics::Date).date().not_null())
                    .col(
                        ColumnDef::new(DailyTraffics::HitCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyTraffics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyTraffics::UpdatedAt)
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
                    .name("idx_daily_traffics_date")
                    .table(DailyTraffics::Table)
                    .col(DailyTraffics::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MonthlyTraffic::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MonthlyTraffic::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MonthlyTraffic::OwnerUserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MonthlyTraffic::Month).integer().not_null())
                    .col(ColumnDef::new(MonthlyTraffic::Year).integer().not_null())
                    .col(
                        ColumnDef::new(MonthlyTraffic::DownloadBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyTraffic::UploadBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyTraffic::BandwidthBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyTraffic::RequestCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MonthlyTraffic::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MonthlyTraffic::UpdatedAt)
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
                    .name("idx_monthly_traffic_user_period")
                    .table(MonthlyTraffic::Table)
                    .col(MonthlyTraffic::OwnerUserId)
                    .col(MonthlyTraffic::Month)
                    .col(MonthlyTraffic::Year)
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
                    .name("idx_monthly_traffic_user_period")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MonthlyTraffic::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_daily_traffics_date").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(DailyTraffics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DailyTraffics {
    #[sea_orm(iden = "daily_traffics")]
    Table,
    Id,
    Date,
    HitCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MonthlyTraffic {
    #[sea_orm(iden = "monthly_traffic")]
    Table,
    Id,
    OwnerUserId,
    Month,
    Year,
    DownloadBytes,
    UploadBytes,
    BandwidthBytes,
    RequestCount,
    CreatedAt,
    UpdatedAt,
}
