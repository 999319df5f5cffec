use crate::database::transaction::run_atomic;
use crate::entities::MethodProvider;
use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::{LoginWithKakaoRequest, SendVerificationRequest, VerifyCodeRequest};
use crate::services::{MethodService, PhoneService, UserService};
use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde_json::json;

pub fn methods_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/methods")
            .route("/phone/verify", web::get().to(send_verification_code))
            .route("/phone/verify", web::post().to(verify_code))
            .route("/kakao/info", web::post().to(kakao_info))
            .route("/kakao", web::post().to(connect_kakao))
            .route("/kakao", web::delete().to(disconnect_kakao))
            .route("", web::get().to(get_methods)),
    );
}

async fn get_methods(
    current: CurrentUser,
    methods: web::Data<MethodService>,
) -> Result<HttpResponse, AppError> {
    let methods = methods.get_methods(&current.user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "methods": methods,
    })))
}

async fn send_verification_code(
    phones: web::Data<PhoneService>,
    query: web::Query<SendVerificationRequest>,
) -> Result<HttpResponse, AppError> {
    let phone = phones.send_verification_code(&query.phone_no).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "phoneId": phone.phone_id,
        "phoneNo": phone.phone_no,
    })))
}

async fn verify_code(
    phones: web::Data<PhoneService>,
    users: web::Data<UserService>,
    body: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse, AppError> {
    let phone = phones.verify_code(&body.phone_no, &body.code).await?;
    let registered = users.get_user_by_phone(&phone.phone_no).await?.is_some();

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "phoneId": phone.phone_id,
        "phoneNo": phone.phone_no,
        "isRegistered": registered,
    })))
}

async fn kakao_info(
    methods: web::Data<MethodService>,
    body: web::Json<LoginWithKakaoRequest>,
) -> Result<HttpResponse, AppError> {
    let info = methods.get_user_info_by_kakao(&body.access_token).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "userInfo": info,
    })))
}

async fn connect_kakao(
    current: CurrentUser,
    methods: web::Data<MethodService>,
    db: web::Data<DatabaseConnection>,
    body: web::Json<LoginWithKakaoRequest>,
) -> Result<HttpResponse, AppError> {
    let write = methods
        .connect_kakao(&current.user.user_id, &body.access_token)
        .await?;
    run_atomic(&db, vec![write]).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn disconnect_kakao(
    current: CurrentUser,
    methods: web::Data<MethodService>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let write = methods
        .disconnect(&current.user.user_id, MethodProvider::Kakao)
        .await?;
    run_atomic(&db, vec![write]).await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}
