use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::PaginationParams;
use crate::services::{LevelService, PointService};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;

pub fn points_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/points", web::get().to(get_points))
        .route("/level", web::get().to(get_my_level))
        .route("/levels", web::get().to(get_levels));
}

async fn get_points(
    current: CurrentUser,
    points: web::Data<PointService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let user_id = &current.user.user_id;
    let entries = points.get_points(user_id, &query).await?;
    let current_month = points.sum_current_month(user_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "points": entries,
        "currentMonthPoint": current_month,
    })))
}

async fn get_my_level(
    current: CurrentUser,
    levels: web::Data<LevelService>,
) -> Result<HttpResponse, AppError> {
    let level = levels.get_level(current.user.level_no).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "level": level,
    })))
}

async fn get_levels(levels: web::Data<LevelService>) -> Result<HttpResponse, AppError> {
    let levels = levels.get_levels().await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "levels": levels,
    })))
}
