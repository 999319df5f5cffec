use crate::entities::{users, NotificationType};
use crate::error::{AppError, AppResult};
use crate::models::CreateNotificationRequest;
use crate::services::notification_service::NotificationService;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

pub struct CentercoinService {
    db: DatabaseConnection,
    notifications: NotificationService,
}

impl Clone for CentercoinService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            notifications: self.notifications.clone(),
        }
    }
}

impl CentercoinService {
    pub fn new(db: DatabaseConnection, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    pub async fn set_balance(&self, user: &users::Model, amount: i64) -> AppResult<i64> {
        if amount < 0 {
            return Err(AppError::FailedValidate(
                "centercoin balance cannot be negative".to_string(),
            ));
        }
        self.persist(user, amount).await?;
        Ok(amount)
    }

    pub async fn increase(&self, user: &users::Model, amount: i64) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::FailedValidate(
                "increase amount must be positive".to_string(),
            ));
        }
        let balance = user.centercoin_balance + amount;
        self.persist(user, balance).await?;

        let notice = CreateNotificationRequest {
            notification_type: NotificationType::Info,
            title: Some("센터코인 적립".to_string()),
            description: Some(format!("센터코인 {amount}개가 적립되었어요.")),
            url: None,
            visible: Some(true),
        };
        if let Err(e) = self.notifications.send_notification(user, &notice).await {
            log::warn!("centercoin notification for user {} failed: {e}", user.user_id);
        }

        Ok(balance)
    }

    pub async fn decrease(&self, user: &users::Model, amount: i64) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::FailedValidate(
                "decrease amount must be positive".to_string(),
            ));
        }
        if user.centercoin_balance < amount {
            return Err(AppError::FailedValidate(format!(
                "balance {} is less than {amount}",
                user.centercoin_balance
            )));
        }
        let balance = user.centercoin_balance - amount;
        self.persist(user, balance).await?;
        Ok(balance)
    }

    async fn persist(&self, user: &users::Model, balance: i64) -> AppResult<()> {
        users::Entity::update_many()
            .col_expr(users::Column::CentercoinBalance, Expr::value(balance))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::UserId.eq(user.user_id.clone()))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
