use crate::entities::{users, NotificationType};
use crate::error::{AppError, AppResult};
use crate::models::CreateNotificationRequest;
use crate::services::coupon_service::CouponService;
use crate::services::notification_service::NotificationService;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

pub struct ReferralService {
    db: DatabaseConnection,
    coupons: CouponService,
    notifications: NotificationService,
    reward_coupon_group_id: Option<String>,
}

impl Clone for ReferralService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            coupons: self.coupons.clone(),
            notifications: self.notifications.clone(),
            reward_coupon_group_id: self.reward_coupon_group_id.clone(),
        }
    }
}

impl ReferralService {
    pub fn new(
        db: DatabaseConnection,
        coupons: CouponService,
        notifications: NotificationService,
        reward_coupon_group_id: Option<String>,
    ) -> Self {
        Self {
            db,
            coupons,
            notifications,
            reward_coupon_group_id,
        }
    }

    /// Records who referred this user. One referrer per user, forever; the
    /// referrer's reward coupon and notification are best effort.
    pub async fn register(&self, user: &users::Model, referral_code: &str) -> AppResult<()> {
        if user.referrer_user_id.is_some() {
            return Err(AppError::AlreadySelectedReferrer);
        }

        let referrer = users::Entity::find()
            .filter(users::Column::ReferralCode.eq(referral_code))
            .one(&self.db)
            .await?
            .ok_or(AppError::InvalidReferralCode)?;
        if referrer.user_id == user.user_id {
            return Err(AppError::CannotReferralMyself);
        }

        users::Entity::update_many()
            .col_expr(
                users::Column::ReferrerUserId,
                Expr::value(Some(referrer.user_id.clone())),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::UserId.eq(user.user_id.clone()))
            .filter(users::Column::ReferrerUserId.is_null())
            .exec(&self.db)
            .await?;

        if let Some(coupon_group_id) = &self.reward_coupon_group_id {
            if let Err(e) = self.coupons.issue(&referrer.user_id, coupon_group_id).await {
                log::warn!(
                    "referral reward coupon for user {} failed: {e}",
                    referrer.user_id
                );
            }
        }

        let notice = CreateNotificationRequest {
            notification_type: NotificationType::Info,
            title: Some("친구 초대 완료".to_string()),
            description: Some(format!("{}님이 초대코드로 가입했어요.", user.realname)),
            url: None,
            visible: Some(true),
        };
        if let Err(e) = self.notifications.send_notification(&referrer, &notice).await {
            log::warn!(
                "referral notification for user {} failed: {e}",
                referrer.user_id
            );
        }

        Ok(())
    }

    /// How many users this user has referred.
    pub async fn count_referred(&self, user_id: &str) -> AppResult<u64> {
        Ok(users::Entity::find()
            .filter(users::Column::ReferrerUserId.eq(user_id))
            .count(&self.db)
            .await?)
    }
}
