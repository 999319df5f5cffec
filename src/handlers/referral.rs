use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::RegisterReferralRequest;
use crate::services::ReferralService;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn referral_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/referral")
            .route("", web::post().to(register_referral))
            .route("/count", web::get().to(count_referred)),
    );
}

async fn register_referral(
    current: CurrentUser,
    referrals: web::Data<ReferralService>,
    body: web::Json<RegisterReferralRequest>,
) -> Result<HttpResponse, AppError> {
    referrals
        .register(&current.user, &body.referral_code)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "opcode": 0 })))
}

async fn count_referred(
    current: CurrentUser,
    referrals: web::Data<ReferralService>,
) -> Result<HttpResponse, AppError> {
    let count = referrals.count_referred(&current.user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "count": count,
        "referralCode": current.user.referral_code,
    })))
}
