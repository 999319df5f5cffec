use sea_orm::entity::prelude::*;
use serde::Serialize;

/// One verification attempt. `used_at` set means consumed: the row can never
/// again satisfy a verification or attach lookup.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "phones")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub phone_id: String,
    pub phone_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub used_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
