use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::PaginationParams;
use crate::services::NotificationService;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn notifications_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(get_notifications))
            .route("/{notificationId}/read", web::post().to(read_notification))
            .route("/{notificationId}", web::delete().to(delete_notification)),
    );
}

async fn get_notifications(
    current: CurrentUser,
    notifications: web::Data<NotificationService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let notifications = notifications
        .get_notifications(&current.user.user_id, &query)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "notifications": notifications,
    })))
}

async fn read_notification(
    current: CurrentUser,
    notifications: web::Data<NotificationService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    notifications
        .read_notification(&current.user.user_id, &path)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn delete_notification(
    current: CurrentUser,
    notifications: web::Data<NotificationService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    notifications
        .delete_notification(&current.user.user_id, &path)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}
