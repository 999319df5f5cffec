use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notification_type")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[sea_orm(string_value = "info")]
    Info,
    #[sea_orm(string_value = "advertising")]
    Advertising,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "notifications")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub notification_id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub visible: bool,
    pub readed_at: Option<DateTimeUtc>,
    /// Set once the push transport accepts the message.
    pub sended_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
