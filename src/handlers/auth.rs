use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::{
    LoginWithKakaoRequest, LoginWithPhoneRequest, LogoutParams, MessagingTokenRequest,
    ModifyUserRequest, SignupRequest,
};
use crate::services::{MethodService, PhoneService, SessionService, UserService};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(signup))
            .route("/login/phone", web::post().to(login_with_phone))
            .route("/login/kakao", web::post().to(login_with_kakao))
            .route("/messaging", web::get().to(set_messaging_token))
            .route("/logout", web::delete().to(logout))
            .route("", web::get().to(get_me))
            .route("", web::post().to(modify_me)),
    );
}

async fn signup(
    users: web::Data<UserService>,
    sessions: web::Data<SessionService>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.signup_user(body.into_inner()).await?;
    let session_id = sessions.create_session(&user.user_id, None).await?;

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "user": user,
        "sessionId": session_id,
    })))
}

async fn login_with_phone(
    phones: web::Data<PhoneService>,
    users: web::Data<UserService>,
    sessions: web::Data<SessionService>,
    body: web::Json<LoginWithPhoneRequest>,
) -> Result<HttpResponse, AppError> {
    let phone = phones.get_phone_or_throw(&body.phone).await?;
    let user = users.get_user_by_phone_or_throw(&phone.phone_no).await?;

    let session_id = sessions.create_session(&user.user_id, None).await?;
    phones.consume_now(&phone).await?;

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "user": user,
        "sessionId": session_id,
    })))
}

async fn login_with_kakao(
    methods: web::Data<MethodService>,
    sessions: web::Data<SessionService>,
    body: web::Json<LoginWithKakaoRequest>,
) -> Result<HttpResponse, AppError> {
    let user = methods.login_with_kakao(&body.access_token).await?;
    let session_id = sessions.create_session(&user.user_id, None).await?;

    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "user": user,
        "sessionId": session_id,
    })))
}

async fn get_me(current: CurrentUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "user": current.user,
    })))
}

async fn modify_me(
    current: CurrentUser,
    users: web::Data<UserService>,
    body: web::Json<ModifyUserRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.modify_user(&current.user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "user": user,
    })))
}

async fn set_messaging_token(
    current: CurrentUser,
    sessions: web::Data<SessionService>,
    query: web::Query<MessagingTokenRequest>,
) -> Result<HttpResponse, AppError> {
    sessions
        .set_messaging_token(&current.session_id, &query.messaging_token)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn logout(
    current: CurrentUser,
    sessions: web::Data<SessionService>,
    query: web::Query<LogoutParams>,
) -> Result<HttpResponse, AppError> {
    sessions
        .logout(
            &current.user.user_id,
            &current.session_id,
            query.all.unwrap_or(false),
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}
