use crate::database::transaction::run_atomic;
use crate::error::AppError;
use crate::models::{
    AddPointRequest, AssignPassRequest, CentercoinRequest, CreateNotificationRequest,
    CreatePassProgramRequest, ModifyPassProgramRequest, PaginationParams, SecessionRequest,
};
use crate::services::{
    CentercoinService, NotificationService, PassProgramService, PassService, PointService,
    SessionService, UserService,
};
use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde_json::json;

pub fn internal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/internal")
            .route("/users", web::get().to(get_users))
            .route("/users/{userId}", web::get().to(get_user))
            .route("/users/{userId}/secession", web::post().to(secession))
            .route("/users/{userId}/sessions", web::get().to(get_sessions))
            .route("/users/{userId}/sessions", web::delete().to(revoke_sessions))
            .route("/users/{userId}/centercoin/set", web::post().to(centercoin_set))
            .route(
                "/users/{userId}/centercoin/increase",
                web::post().to(centercoin_increase),
            )
            .route(
                "/users/{userId}/centercoin/decrease",
                web::post().to(centercoin_decrease),
            )
            .route("/users/{userId}/points", web::post().to(add_point))
            .route(
                "/users/{userId}/notifications",
                web::post().to(send_notification),
            )
            .route("/users/{userId}/passes", web::post().to(assign_pass))
            .route(
                "/users/{userId}/passes/{passId}/extend",
                web::post().to(extend_pass),
            )
            .route("/passPrograms", web::get().to(get_pass_programs))
            .route("/passPrograms", web::post().to(create_pass_program))
            .route("/passPrograms/{passProgramId}", web::get().to(get_pass_program))
            .route(
                "/passPrograms/{passProgramId}",
                web::post().to(modify_pass_program),
            )
            .route(
                "/passPrograms/{passProgramId}",
                web::delete().to(delete_pass_program),
            ),
    );
}

async fn get_users(
    users: web::Data<UserService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let users = users.get_users(&query).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "users": users,
    })))
}

async fn get_user(
    users: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "user": user,
    })))
}

async fn secession(
    users: web::Data<UserService>,
    path: web::Path<String>,
    body: web::Json<SecessionRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    users.secession_user(&user, body.reason.clone()).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn get_sessions(
    users: web::Data<UserService>,
    sessions: web::Data<SessionService>,
    path: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let sessions = sessions.get_sessions(&user.user_id, &query).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "sessions": sessions,
    })))
}

async fn revoke_sessions(
    users: web::Data<UserService>,
    sessions: web::Data<SessionService>,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    run_atomic(&db, vec![sessions.delete_all_for_user(&user.user_id)]).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn centercoin_set(
    users: web::Data<UserService>,
    centercoin: web::Data<CentercoinService>,
    path: web::Path<String>,
    body: web::Json<CentercoinRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let balance = centercoin.set_balance(&user, body.amount).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "balance": balance,
    })))
}

async fn centercoin_increase(
    users: web::Data<UserService>,
    centercoin: web::Data<CentercoinService>,
    path: web::Path<String>,
    body: web::Json<CentercoinRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let balance = centercoin.increase(&user, body.amount).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "balance": balance,
    })))
}

async fn centercoin_decrease(
    users: web::Data<UserService>,
    centercoin: web::Data<CentercoinService>,
    path: web::Path<String>,
    body: web::Json<CentercoinRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let balance = centercoin.decrease(&user, body.amount).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "balance": balance,
    })))
}

async fn add_point(
    users: web::Data<UserService>,
    points: web::Data<PointService>,
    path: web::Path<String>,
    body: web::Json<AddPointRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let point = points
        .add_point(&user.user_id, body.point, body.point_type)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "point": point,
    })))
}

async fn send_notification(
    users: web::Data<UserService>,
    notifications: web::Data<NotificationService>,
    path: web::Path<String>,
    body: web::Json<CreateNotificationRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let notification = notifications.send_notification(&user, &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "notification": notification,
    })))
}

async fn assign_pass(
    users: web::Data<UserService>,
    passes: web::Data<PassService>,
    programs: web::Data<PassProgramService>,
    path: web::Path<String>,
    body: web::Json<AssignPassRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.get_user_or_throw(&path).await?;
    let program = programs.get_program_or_throw(&body.pass_program_id).await?;
    let pass = passes
        .purchase(
            &user.user_id,
            &program,
            body.auto_renew.unwrap_or(false),
            body.free.unwrap_or(false),
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "pass": pass,
    })))
}

async fn extend_pass(
    users: web::Data<UserService>,
    passes: web::Data<PassService>,
    programs: web::Data<PassProgramService>,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, pass_id) = path.into_inner();
    let user = users.get_user_or_throw(&user_id).await?;
    let pass = passes.get_pass_or_throw(&pass_id).await?;
    if pass.user_id != user.user_id {
        return Err(AppError::CannotFindPass);
    }

    let program = programs.get_program_or_throw(&pass.pass_program_id).await?;
    let update = passes.extend(&pass, &program, false).await?;
    run_atomic(&db, vec![passes.modify_pass(&pass.pass_id, update)]).await?;

    let pass = passes.get_pass_or_throw(&pass.pass_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "pass": pass,
    })))
}

async fn get_pass_programs(
    programs: web::Data<PassProgramService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let programs = programs.get_programs(&query).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "passPrograms": programs,
    })))
}

async fn get_pass_program(
    programs: web::Data<PassProgramService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let program = programs.get_program_or_throw(&path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "passProgram": program,
    })))
}

async fn create_pass_program(
    programs: web::Data<PassProgramService>,
    body: web::Json<CreatePassProgramRequest>,
) -> Result<HttpResponse, AppError> {
    let program = programs.create_program(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "passProgram": program,
    })))
}

async fn modify_pass_program(
    programs: web::Data<PassProgramService>,
    path: web::Path<String>,
    body: web::Json<ModifyPassProgramRequest>,
) -> Result<HttpResponse, AppError> {
    let program = programs.modify_program(&path, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "passProgram": program,
    })))
}

async fn delete_pass_program(
    programs: web::Data<PassProgramService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    programs.delete_program(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}
