//! Customer domain entity (owned by the admin subsystem, read-only here)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "domains")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub host_name: String,
    pub owner_user_id: i64,
    #[sea_orm(column_type = "Text")]
    pub target_url: String,
    pub active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::streaming_proxy::Entity")]
    StreamingProxy,
}

impl Related<super::streaming_proxy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StreamingProxy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
