use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::{PaginationParams, PurchasePassRequest};
use crate::services::{PassProgramService, PassService};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn passes_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/passes")
            .route("", web::get().to(get_passes))
            .route("/{passId}", web::get().to(get_pass)),
    )
    .service(
        web::scope("/passPrograms")
            .route("", web::get().to(get_pass_programs))
            .route("/{passProgramId}/purchase", web::post().to(purchase)),
    );
}

async fn get_passes(
    current: CurrentUser,
    passes: web::Data<PassService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let passes = passes.get_passes(&current.user.user_id, &query).await?;
    let passes: Vec<_> = passes
        .into_iter()
        .map(|(pass, program)| json!({ "pass": pass, "passProgram": program }))
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "passes": passes,
    })))
}

async fn get_pass(
    current: CurrentUser,
    passes: web::Data<PassService>,
    programs: web::Data<PassProgramService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let pass = passes.get_pass_or_throw(&path).await?;
    if pass.user_id != current.user.user_id {
        return Err(AppError::CannotFindPass);
    }
    let program = programs.get_program_or_throw(&pass.pass_program_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "pass": pass,
        "passProgram": program,
    })))
}

async fn get_pass_programs(
    programs: web::Data<PassProgramService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let programs = programs.get_programs_on_sale(&query).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "passPrograms": programs,
    })))
}

async fn purchase(
    current: CurrentUser,
    passes: web::Data<PassService>,
    programs: web::Data<PassProgramService>,
    path: web::Path<String>,
    body: web::Json<PurchasePassRequest>,
) -> Result<HttpResponse, AppError> {
    let program = programs.get_program_or_throw(&path).await?;
    let pass = passes
        .purchase(
            &current.user.user_id,
            &program,
            body.auto_renew.unwrap_or(false),
            false,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "pass": pass,
    })))
}
