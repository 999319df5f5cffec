use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A verified license is bound to the exact (realname, birthday) pair it was
/// validated against; profile edits to either field invalidate it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "licenses")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub license_id: String,
    pub user_id: String,
    pub realname: String,
    pub birthday: Date,
    pub license_str: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
