use crate::database::transaction::{deferred, PendingWrite};
use crate::entities::{sessions, users};
use crate::error::{AppError, AppResult};
use crate::models::PaginationParams;
use crate::utils::{generate_session_token, MAX_GENERATE_ATTEMPTS};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

pub struct SessionService {
    db: DatabaseConnection,
}

impl Clone for SessionService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
        }
    }
}

impl SessionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a session and returns its bearer token.
    pub async fn create_session(
        &self,
        user_id: &str,
        platform: Option<String>,
    ) -> AppResult<String> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let token = generate_session_token();
            let exists = sessions::Entity::find_by_id(token.clone())
                .one(&self.db)
                .await?;
            if exists.is_some() {
                continue;
            }

            sessions::ActiveModel {
                session_id: Set(token.clone()),
                user_id: Set(user_id.to_string()),
                platform: Set(platform),
                messaging_token: Set(None),
                used_at: Set(None),
                created_at: Set(Utc::now()),
            }
            .insert(&self.db)
            .await?;
            return Ok(token);
        }

        Err(AppError::InvalidError(
            "could not allocate a unique session token".to_string(),
        ))
    }

    /// Resolves a bearer token to its user and refreshes the session's
    /// last-seen timestamp.
    pub async fn get_user_by_session(
        &self,
        token: &str,
    ) -> AppResult<(users::Model, sessions::Model)> {
        let session = sessions::Entity::find_by_id(token.to_string())
            .one(&self.db)
            .await?
            .ok_or(AppError::RequiredLogin)?;

        let user = users::Entity::find_by_id(session.user_id.clone())
            .one(&self.db)
            .await?
            .ok_or(AppError::RequiredLogin)?;

        sessions::Entity::update_many()
            .col_expr(sessions::Column::UsedAt, Expr::value(Some(Utc::now())))
            .filter(sessions::Column::SessionId.eq(token))
            .exec(&self.db)
            .await?;

        Ok((user, session))
    }

    pub async fn logout(&self, user_id: &str, session_id: &str, all: bool) -> AppResult<()> {
        let mut delete = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id));
        if !all {
            delete = delete.filter(sessions::Column::SessionId.eq(session_id));
        }
        delete.exec(&self.db).await?;
        Ok(())
    }

    pub async fn set_messaging_token(&self, session_id: &str, token: &str) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::InvalidMessagingToken);
        }

        let result = sessions::Entity::update_many()
            .col_expr(
                sessions::Column::MessagingToken,
                Expr::value(Some(token.to_string())),
            )
            .filter(sessions::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::CannotFindSession);
        }
        Ok(())
    }

    pub async fn get_sessions(
        &self,
        user_id: &str,
        params: &PaginationParams,
    ) -> AppResult<Vec<sessions::Model>> {
        Ok(sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .order_by_desc(sessions::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .all(&self.db)
            .await?)
    }

    /// Push targets for a user: every session that registered a token.
    pub async fn messaging_tokens(&self, user_id: &str) -> AppResult<Vec<String>> {
        let sessions = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::MessagingToken.is_not_null())
            .all(&self.db)
            .await?;
        Ok(sessions
            .into_iter()
            .filter_map(|s| s.messaging_token)
            .collect())
    }

    /// Revokes every session; part of the secession batch.
    pub fn delete_all_for_user(&self, user_id: &str) -> PendingWrite {
        let user_id = user_id.to_string();
        deferred(move |txn| {
            Box::pin(async move {
                sessions::Entity::delete_many()
                    .filter(sessions::Column::UserId.eq(user_id))
                    .exec(txn)
                    .await?;
                Ok(())
            })
        })
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn user_row() -> users::Model {
        users::Model {
            user_id: "u-1".into(),
            realname: "홍길동".into(),
            birthday: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            phone_no: "+821012345678".into(),
            email: None,
            level_no: 1,
            referral_code: "abc123".into(),
            referrer_user_id: None,
            centercoin_balance: 0,
            receive_push: true,
            used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session_row() -> sessions::Model {
        sessions::Model {
            session_id: "s".repeat(64),
            user_id: "u-1".into(),
            platform: Some("ios".into()),
            messaging_token: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolves_session_to_user_and_touches_it() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![session_row()]])
            .append_query_results(vec![vec![user_row()]])
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = SessionService::new(db);

        let (user, session) = service
            .get_user_by_session(&"s".repeat(64))
            .await
            .unwrap();
        assert_eq!(user.user_id, "u-1");
        assert_eq!(session.user_id, "u-1");
    }

    #[tokio::test]
    async fn unknown_session_requires_login() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<sessions::Model>::new()])
            .into_connection();
        let service = SessionService::new(db);

        let err = service
            .get_user_by_session("missing")
            .await
            .unwrap_err();
        assert_eq!(err.opcode(), 104);
    }

    #[tokio::test]
    async fn empty_messaging_token_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = SessionService::new(db);

        let err = service.set_messaging_token("sid", "  ").await.unwrap_err();
        assert_eq!(err.opcode(), 117);
    }
}
