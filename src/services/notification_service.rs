use crate::database::transaction::{deferred, run_atomic, PendingWrite};
use crate::entities::{notifications, users, NotificationType};
use crate::error::{AppError, AppResult};
use crate::external::MessagingClient;
use crate::models::{CreateNotificationRequest, PaginationParams};
use crate::services::session_service::SessionService;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

pub struct NotificationService {
    db: DatabaseConnection,
    messaging: MessagingClient,
    sessions: SessionService,
}

impl Clone for NotificationService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            messaging: self.messaging.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

impl NotificationService {
    pub fn new(
        db: DatabaseConnection,
        messaging: MessagingClient,
        sessions: SessionService,
    ) -> Self {
        Self {
            db,
            messaging,
            sessions,
        }
    }

    /// Stages a notification row without pushing it.
    pub fn create_notification(
        &self,
        user_id: &str,
        req: &CreateNotificationRequest,
    ) -> (notifications::Model, PendingWrite) {
        let model = notifications::Model {
            notification_id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            notification_type: req.notification_type,
            title: req.title.clone(),
            description: req.description.clone(),
            url: req.url.clone(),
            visible: req.visible.unwrap_or(true),
            readed_at: None,
            sended_at: None,
            created_at: Utc::now(),
        };

        let active: notifications::ActiveModel = notifications::ActiveModel {
            notification_id: Set(model.notification_id.clone()),
            user_id: Set(model.user_id.clone()),
            notification_type: Set(model.notification_type),
            title: Set(model.title.clone()),
            description: Set(model.description.clone()),
            url: Set(model.url.clone()),
            visible: Set(model.visible),
            readed_at: Set(None),
            sended_at: Set(None),
            created_at: Set(model.created_at),
        };

        let write = deferred(move |txn| {
            Box::pin(async move {
                active.insert(txn).await?;
                Ok(())
            })
        });
        (model, write)
    }

    /// Persists and pushes a notification. Advertising is suppressed for
    /// users who opted out of push; the row is still written so the inbox
    /// stays complete. `sended_at` is stamped only after FCM accepted at
    /// least one message.
    pub async fn send_notification(
        &self,
        user: &users::Model,
        req: &CreateNotificationRequest,
    ) -> AppResult<notifications::Model> {
        let (model, write) = self.create_notification(&user.user_id, req);
        run_atomic(&self.db, vec![write]).await?;

        if req.notification_type == NotificationType::Advertising && !user.receive_push {
            return Ok(model);
        }

        let tokens = self.sessions.messaging_tokens(&user.user_id).await?;
        if tokens.is_empty() {
            return Ok(model);
        }

        let title = model.title.clone().unwrap_or_default();
        let body = model.description.clone().unwrap_or_default();
        let mut delivered = false;
        for token in &tokens {
            if self.messaging.send_push(token, &title, &body).await.is_ok() {
                delivered = true;
            }
        }

        if delivered {
            notifications::Entity::update_many()
                .col_expr(
                    notifications::Column::SendedAt,
                    Expr::value(Some(Utc::now())),
                )
                .filter(
                    notifications::Column::NotificationId.eq(model.notification_id.clone()),
                )
                .exec(&self.db)
                .await?;
        }

        Ok(model)
    }

    pub async fn get_notifications(
        &self,
        user_id: &str,
        params: &PaginationParams,
    ) -> AppResult<Vec<notifications::Model>> {
        Ok(notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::Visible.eq(true))
            .order_by_desc(notifications::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .all(&self.db)
            .await?)
    }

    async fn get_owned_or_throw(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> AppResult<notifications::Model> {
        notifications::Entity::find_by_id(notification_id.to_string())
            .filter(notifications::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(AppError::CannotFindNotification)
    }

    pub async fn read_notification(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> AppResult<()> {
        self.get_owned_or_throw(user_id, notification_id).await?;
        notifications::Entity::update_many()
            .col_expr(
                notifications::Column::ReadedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(notifications::Column::NotificationId.eq(notification_id))
            .filter(notifications::Column::ReadedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn delete_notification(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> AppResult<()> {
        self.get_owned_or_throw(user_id, notification_id).await?;
        notifications::Entity::delete_by_id(notification_id.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
