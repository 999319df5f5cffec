use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::RedeemCouponRequest;
use crate::services::CouponService;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn coupons_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("", web::get().to(get_coupons))
            .route("", web::post().to(redeem_coupon)),
    );
}

async fn get_coupons(
    current: CurrentUser,
    coupons: web::Data<CouponService>,
) -> Result<HttpResponse, AppError> {
    let coupons = coupons.get_coupons(&current.user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "coupons": coupons,
    })))
}

async fn redeem_coupon(
    current: CurrentUser,
    coupons: web::Data<CouponService>,
    body: web::Json<RedeemCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let coupon = coupons
        .redeem_by_code(&current.user.user_id, &body.code)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "opcode": 0,
        "coupon": coupon,
    })))
}
