use crate::entities::{NotificationType, PointType};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentercoinRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPointRequest {
    #[serde(default = "default_point")]
    pub point: i64,
    pub point_type: PointType,
}

fn default_point() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub notification_type: NotificationType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Hidden notifications push but never appear in the user's listing.
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecessionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}
