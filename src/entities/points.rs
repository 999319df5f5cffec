use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "point_type")]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    #[sea_orm(string_value = "ride")]
    Ride,
    #[sea_orm(string_value = "event")]
    Event,
    #[sea_orm(string_value = "referral")]
    Referral,
    #[sea_orm(string_value = "correction")]
    Correction,
}

/// Append-only ledger entry; never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "points")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub point_id: i64,
    pub user_id: String,
    pub point: i64,
    pub point_type: PointType,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
