use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Static tier table. Must always contain a zero-threshold baseline tier.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "levels")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub level_no: i32,
    pub name: String,
    pub required_point: i64,
    pub coupon_group_id: Option<String>,
    pub coupon_quantity: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
