use crate::database::transaction::run_atomic;
use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::SetLicenseRequest;
use crate::services::LicenseService;
use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde_json::json;

pub fn license_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/license")
            .route("", web::get().to(get_license))
            .route("", web::post().to(set_license))
            .route("", web::delete().to(delete_license)),
    );
}

async fn get_license(
    current: CurrentUser,
    licenses: web::Data<LicenseService>,
) -> Result<HttpResponse, AppError> {
    let license = licenses.get_license_or_throw(&current.user.user_id).await?;
    // A license checked against an earlier name or birthday must be
    // registered again.
    if !LicenseService::matches_user(&license, &current.user) {
        return Err(AppError::RequiredLicense);
    }
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "license": license,
    })))
}

async fn set_license(
    current: CurrentUser,
    licenses: web::Data<LicenseService>,
    db: web::Data<DatabaseConnection>,
    body: web::Json<SetLicenseRequest>,
) -> Result<HttpResponse, AppError> {
    let write = licenses
        .set_license(
            &current.user.user_id,
            &current.user.realname,
            current.user.birthday,
            &body.license_str,
        )
        .await?;
    run_atomic(&db, vec![write]).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn delete_license(
    current: CurrentUser,
    licenses: web::Data<LicenseService>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    licenses.get_license_or_throw(&current.user.user_id).await?;
    let write = licenses.delete_license(&current.user.user_id);
    run_atomic(&db, vec![write]).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}
