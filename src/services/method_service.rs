use crate::database::transaction::{deferred, PendingWrite};
use crate::entities::{methods, users, MethodProvider};
use crate::error::{AppError, AppResult};
use crate::external::{KakaoClient, KakaoUser};
use crate::utils::format_phone;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use uuid::Uuid;

/// Signup prefill assembled from a Kakao profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KakaoUserInfo {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone_no: Option<String>,
    pub birthday: Option<NaiveDate>,
}

pub struct MethodService {
    db: DatabaseConnection,
    kakao: KakaoClient,
}

impl Clone for MethodService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            kakao: self.kakao.clone(),
        }
    }
}

impl MethodService {
    pub fn new(db: DatabaseConnection, kakao: KakaoClient) -> Self {
        Self { db, kakao }
    }

    pub async fn get_methods(&self, user_id: &str) -> AppResult<Vec<methods::Model>> {
        Ok(methods::Entity::find()
            .filter(methods::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?)
    }

    async fn find_by_identity(
        &self,
        provider: MethodProvider,
        identity: &str,
    ) -> AppResult<Option<methods::Model>> {
        Ok(methods::Entity::find()
            .filter(methods::Column::Provider.eq(provider))
            .filter(methods::Column::Identity.eq(identity))
            .one(&self.db)
            .await?)
    }

    /// Resolves a Kakao access token to a registered user. Falls back to
    /// the Kakao account's phone number when no method row is linked yet.
    pub async fn login_with_kakao(&self, access_token: &str) -> AppResult<users::Model> {
        let kakao_user = self.kakao.get_user(access_token).await?;

        if let Some(method) = self
            .find_by_identity(MethodProvider::Kakao, &kakao_user.identity())
            .await?
        {
            return users::Entity::find_by_id(method.user_id)
                .one(&self.db)
                .await?
                .ok_or(AppError::CannotFindUser);
        }

        let phone_no = kakao_user
            .kakao_account
            .as_ref()
            .and_then(|a| a.phone_number.as_deref())
            .ok_or(AppError::NotRegisteredUser)?;
        let phone_no = format_phone(phone_no)?;

        users::Entity::find()
            .filter(users::Column::PhoneNo.eq(phone_no))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotRegisteredUser)
    }

    /// Signup prefill from the Kakao profile; nothing is persisted.
    pub async fn get_user_info_by_kakao(&self, access_token: &str) -> AppResult<KakaoUserInfo> {
        let kakao_user = self.kakao.get_user(access_token).await?;
        let account = kakao_user.kakao_account.as_ref();

        let birthday = account.and_then(|a| match (&a.birthyear, &a.birthday) {
            // Kakao gives birthday as MMDD.
            (Some(year), Some(mmdd)) if mmdd.len() == 4 => {
                let date = format!("{year}-{}-{}", &mmdd[..2], &mmdd[2..]);
                NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()
            }
            _ => None,
        });

        let phone_no = account
            .and_then(|a| a.phone_number.as_deref())
            .and_then(|p| format_phone(p).ok());

        Ok(KakaoUserInfo {
            nickname: kakao_user.nickname().map(str::to_string),
            email: account.and_then(|a| a.email.clone()),
            phone_no,
            birthday,
        })
    }

    /// Stages linking the Kakao account. Rejects when either side is taken:
    /// the user already has a Kakao method, or the Kakao account is linked
    /// to someone else.
    pub async fn connect_kakao(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> AppResult<PendingWrite> {
        let kakao_user = self.kakao.get_user(access_token).await?;
        self.stage_connect(user_id, &kakao_user).await
    }

    /// Same staging for callers that already resolved the Kakao profile.
    pub async fn stage_connect(
        &self,
        user_id: &str,
        kakao_user: &KakaoUser,
    ) -> AppResult<PendingWrite> {
        let identity = kakao_user.identity();

        let mine = methods::Entity::find()
            .filter(methods::Column::UserId.eq(user_id))
            .filter(methods::Column::Provider.eq(MethodProvider::Kakao))
            .one(&self.db)
            .await?;
        if mine.is_some() {
            return Err(AppError::AlreadyConnectWithMethod);
        }
        if self
            .find_by_identity(MethodProvider::Kakao, &identity)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyConnectWithMethod);
        }

        let model = methods::ActiveModel {
            method_id: Set(Uuid::now_v7().to_string()),
            user_id: Set(user_id.to_string()),
            provider: Set(MethodProvider::Kakao),
            identity: Set(identity),
            description: Set(kakao_user.nickname().map(str::to_string)),
            created_at: Set(Utc::now()),
        };

        Ok(deferred(move |txn| {
            Box::pin(async move {
                model.insert(txn).await?;
                Ok(())
            })
        }))
    }

    pub async fn disconnect(
        &self,
        user_id: &str,
        provider: MethodProvider,
    ) -> AppResult<PendingWrite> {
        let method = methods::Entity::find()
            .filter(methods::Column::UserId.eq(user_id))
            .filter(methods::Column::Provider.eq(provider))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotConnectedWithMethod)?;

        let method_id = method.method_id;
        Ok(deferred(move |txn| {
            Box::pin(async move {
                methods::Entity::delete_many()
                    .filter(methods::Column::MethodId.eq(method_id))
                    .exec(txn)
                    .await?;
                Ok(())
            })
        }))
    }

    /// Removes every linked method; part of the secession batch.
    pub fn delete_all_for_user(&self, user_id: &str) -> PendingWrite {
        let user_id = user_id.to_string();
        deferred(move |txn| {
            Box::pin(async move {
                methods::Entity::delete_many()
                    .filter(methods::Column::UserId.eq(user_id))
                    .exec(txn)
                    .await?;
                Ok(())
            })
        })
    }
}
