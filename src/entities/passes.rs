use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A user's instance of a pass program.
///
/// There is no status column; the pass is Active-unlimited (`expired_at`
/// null), Active-expiring (`expired_at` in the future), Expired (`expired_at`
/// in the past), or Non-renewing (`auto_renew` false), judged at read time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "passes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pass_id: String,
    pub user_id: String,
    pub pass_program_id: String,
    pub coupon_group_id: Option<String>,
    pub coupon_id: Option<String>,
    pub auto_renew: bool,
    pub expired_at: Option<DateTimeUtc>,
    /// Last time the renewal workflow touched this pass; rate-limits the
    /// extension scheduler's candidate query.
    pub requested_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pass_programs::Entity",
        from = "Column::PassProgramId",
        to = "super::pass_programs::Column::PassProgramId"
    )]
    PassProgram,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::UserId"
    )]
    User,
}

impl Related<super::pass_programs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PassProgram.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
