use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "pass_programs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pass_program_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_sale: bool,
    pub allow_renew: bool,
    pub price: Option<i64>,
    /// Validity duration in seconds; `None` means passes never expire.
    pub validity: Option<i64>,
    pub coupon_group_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::passes::Entity")]
    Passes,
}

impl Related<super::passes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Passes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
