use crate::error::{AppError, AppResult};
use crate::external::{Coupon, PaymentsClient};

/// Coupons are owned by the payments service; this wraps its API and
/// enforces the per-user redemption caps it does not.
#[derive(Clone)]
pub struct CouponService {
    payments: PaymentsClient,
}

impl CouponService {
    pub fn new(payments: PaymentsClient) -> Self {
        Self { payments }
    }

    pub async fn get_coupons(&self, user_id: &str) -> AppResult<Vec<Coupon>> {
        self.payments.get_coupons(user_id).await
    }

    pub async fn issue(&self, user_id: &str, coupon_group_id: &str) -> AppResult<Coupon> {
        self.payments.generate_coupon(user_id, coupon_group_id).await
    }

    /// Redeems a human-entered coupon code, honoring the group's per-user
    /// cap when it has one.
    pub async fn redeem_by_code(&self, user_id: &str, code: &str) -> AppResult<Coupon> {
        let group = self
            .payments
            .get_coupon_group_by_code(code)
            .await
            .map_err(|e| match e {
                AppError::Payments { .. } | AppError::InvalidApi => AppError::CannotFindCoupon,
                other => other,
            })?;

        if let Some(limit) = group.limit.filter(|l| *l > 0) {
            let issued = self
                .payments
                .count_coupons(user_id, &group.coupon_group_id)
                .await?;
            if issued >= limit {
                return Err(AppError::ExcessLimits(format!(
                    "coupon group {} capped at {limit} per user",
                    group.coupon_group_id
                )));
            }
        }

        self.payments
            .generate_coupon(user_id, &group.coupon_group_id)
            .await
    }
}
