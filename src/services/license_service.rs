use crate::database::transaction::{deferred, PendingWrite};
use crate::entities::{licenses, users};
use crate::error::{AppError, AppResult};
use crate::external::PlatformClient;
use chrono::Utc;
use regex::Regex;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

/// Korean driver's license number: region(2) - class(2) - serial(6) - check(2).
const LICENSE_PATTERN: &str = r"^\d{2}-\d{2}-\d{6}-\d{2}$";

pub struct LicenseService {
    db: DatabaseConnection,
    platform: PlatformClient,
}

impl Clone for LicenseService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            platform: self.platform.clone(),
        }
    }
}

impl LicenseService {
    pub fn new(db: DatabaseConnection, platform: PlatformClient) -> Self {
        Self { db, platform }
    }

    /// Format check plus registry lookup. Fails closed: any gateway problem
    /// is an invalid license, never a silent accept.
    pub async fn validate(
        &self,
        realname: &str,
        birthday: chrono::NaiveDate,
        license_str: &str,
    ) -> AppResult<()> {
        let pattern = Regex::new(LICENSE_PATTERN).map_err(|e| {
            AppError::InvalidError(format!("license pattern failed to compile: {e}"))
        })?;
        if !pattern.is_match(license_str) {
            return Err(AppError::InvalidLicense);
        }

        self.platform
            .validate_license(realname, &birthday.format("%Y-%m-%d").to_string(), license_str)
            .await
    }

    /// Validates and stages the license row. Replaces any previous license
    /// of the user in the same transaction.
    pub async fn set_license(
        &self,
        user_id: &str,
        realname: &str,
        birthday: chrono::NaiveDate,
        license_str: &str,
    ) -> AppResult<PendingWrite> {
        self.validate(realname, birthday, license_str).await?;

        let user_id = user_id.to_string();
        let model = licenses::ActiveModel {
            license_id: Set(Uuid::now_v7().to_string()),
            user_id: Set(user_id.clone()),
            realname: Set(realname.to_string()),
            birthday: Set(birthday),
            license_str: Set(license_str.to_string()),
            created_at: Set(Utc::now()),
        };

        Ok(deferred(move |txn| {
            Box::pin(async move {
                licenses::Entity::delete_many()
                    .filter(licenses::Column::UserId.eq(user_id))
                    .exec(txn)
                    .await?;
                model.insert(txn).await?;
                Ok(())
            })
        }))
    }

    pub fn delete_license(&self, user_id: &str) -> PendingWrite {
        let user_id = user_id.to_string();
        deferred(move |txn| {
            Box::pin(async move {
                licenses::Entity::delete_many()
                    .filter(licenses::Column::UserId.eq(user_id))
                    .exec(txn)
                    .await?;
                Ok(())
            })
        })
    }

    pub async fn get_license(&self, user_id: &str) -> AppResult<Option<licenses::Model>> {
        Ok(licenses::Entity::find()
            .filter(licenses::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    pub async fn get_license_or_throw(&self, user_id: &str) -> AppResult<licenses::Model> {
        self.get_license(user_id)
            .await?
            .ok_or(AppError::RequiredLicense)
    }

    /// A license is only valid for the identity it was checked against.
    pub fn matches_user(license: &licenses::Model, user: &users::Model) -> bool {
        license.realname == user.realname && license.birthday == user.birthday
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn license_format() {
        let pattern = Regex::new(LICENSE_PATTERN).unwrap();
        assert!(pattern.is_match("11-22-333333-44"));
        assert!(!pattern.is_match("112233333344"));
        assert!(!pattern.is_match("11-22-3333-44"));
        assert!(!pattern.is_match("aa-22-333333-44"));
    }

    #[test]
    fn license_is_bound_to_the_checked_identity() {
        let now = Utc::now();
        let birthday = chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let license = licenses::Model {
            license_id: "l-1".into(),
            user_id: "u-1".into(),
            realname: "홍길동".into(),
            birthday,
            license_str: "11-22-333333-44".into(),
            created_at: now,
        };
        let user = users::Model {
            user_id: "u-1".into(),
            realname: "홍길동".into(),
            birthday,
            phone_no: "+821012345678".into(),
            email: None,
            level_no: 1,
            referral_code: "abc123".into(),
            referrer_user_id: None,
            centercoin_balance: 0,
            receive_push: true,
            used_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(LicenseService::matches_user(&license, &user));

        let mut renamed = user.clone();
        renamed.realname = "김철수".into();
        assert!(!LicenseService::matches_user(&license, &renamed));
    }
}
