use crate::database::transaction::{deferred, run_atomic, PendingWrite};
use crate::entities::{phones, users};
use crate::error::{AppError, AppResult};
use crate::external::SmsClient;
use crate::models::PhoneToken;
use crate::utils::{format_phone, generate_verification_code};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

pub struct PhoneService {
    db: DatabaseConnection,
    sms: SmsClient,
    bypass_code: Option<String>,
}

impl Clone for PhoneService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            sms: self.sms.clone(),
            bypass_code: self.bypass_code.clone(),
        }
    }
}

impl PhoneService {
    pub fn new(db: DatabaseConnection, sms: SmsClient, bypass_code: Option<String>) -> Self {
        Self {
            db,
            sms,
            bypass_code,
        }
    }

    /// Issues a fresh code for the number. Earlier unconsumed attempts for
    /// the same number are revoked first, so only the latest code verifies.
    pub async fn send_verification_code(&self, phone_no: &str) -> AppResult<phones::Model> {
        let phone_no = format_phone(phone_no)?;
        self.revoke_all_for_number(&phone_no).await?;

        let code = generate_verification_code();
        let phone = phones::ActiveModel {
            phone_id: Set(Uuid::now_v7().to_string()),
            phone_no: Set(phone_no.clone()),
            code: Set(Some(code.clone())),
            used_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        self.sms.send_verification_code(&phone_no, &code).await?;
        Ok(phone)
    }

    pub async fn revoke_all_for_number(&self, phone_no: &str) -> AppResult<()> {
        phones::Entity::update_many()
            .col_expr(phones::Column::UsedAt, Expr::value(Some(Utc::now())))
            .filter(phones::Column::PhoneNo.eq(phone_no))
            .filter(phones::Column::UsedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Looks up the unconsumed attempt matching number and code. A code
    /// stays valid until it is consumed or a newer code revokes it; the
    /// bypass code, when configured, matches any unconsumed attempt.
    pub async fn verify_code(&self, phone_no: &str, code: &str) -> AppResult<phones::Model> {
        let phone_no = format_phone(phone_no)?;
        let bypassed = self.bypass_code.as_deref() == Some(code);

        let mut query = phones::Entity::find()
            .filter(phones::Column::PhoneNo.eq(phone_no))
            .filter(phones::Column::UsedAt.is_null());
        if !bypassed {
            query = query.filter(phones::Column::Code.eq(code));
        }

        query
            .order_by_desc(phones::Column::CreatedAt)
            .one(&self.db)
            .await?
            .ok_or(AppError::InvalidPhoneValidateCode)
    }

    /// Re-validates a phone token right before it is spent. Any mismatch or
    /// an already consumed row sends the client back to verification.
    pub async fn get_phone_or_throw(&self, token: &PhoneToken) -> AppResult<phones::Model> {
        let phone_no = format_phone(&token.phone_no)?;
        let phone = phones::Entity::find_by_id(token.phone_id.clone())
            .one(&self.db)
            .await?
            .ok_or(AppError::RetryPhoneValidate)?;

        if phone.used_at.is_some()
            || phone.phone_no != phone_no
            || !self.code_matches(&phone, &token.code)
        {
            return Err(AppError::RetryPhoneValidate);
        }

        Ok(phone)
    }

    /// Marks the attempt consumed. Filtered on `used_at IS NULL` so running
    /// it twice is a no-op rather than a failure.
    pub fn consume(&self, phone: &phones::Model) -> PendingWrite {
        let phone_id = phone.phone_id.clone();
        deferred(move |txn| {
            Box::pin(async move {
                phones::Entity::update_many()
                    .col_expr(phones::Column::UsedAt, Expr::value(Some(Utc::now())))
                    .filter(phones::Column::PhoneId.eq(phone_id))
                    .filter(phones::Column::UsedAt.is_null())
                    .exec(txn)
                    .await?;
                Ok(())
            })
        })
    }

    /// Immediate consume, for callers with no surrounding batch.
    pub async fn consume_now(&self, phone: &phones::Model) -> AppResult<()> {
        run_atomic(&self.db, vec![self.consume(phone)]).await
    }

    pub async fn is_number_registered(&self, phone_no: &str) -> AppResult<bool> {
        let existing = users::Entity::find()
            .filter(users::Column::PhoneNo.eq(phone_no))
            .one(&self.db)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn assert_number_not_registered(&self, phone_no: &str) -> AppResult<()> {
        if self.is_number_registered(phone_no).await? {
            return Err(AppError::AlreadyRegisteredUser);
        }
        Ok(())
    }

    fn code_matches(&self, phone: &phones::Model, submitted: &str) -> bool {
        if let Some(bypass) = &self.bypass_code {
            if submitted == bypass {
                return true;
            }
        }
        phone.code.as_deref() == Some(submitted)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::config::SmsConfig;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn sms_stub() -> SmsClient {
        SmsClient::new(SmsConfig {
            base_url: "http://localhost".into(),
            api_key: String::new(),
            from: "+821000000000".into(),
            debug: true,
        })
    }

    fn phone_row(code: &str, used: bool, age_minutes: i64) -> phones::Model {
        phones::Model {
            phone_id: "p-1".into(),
            phone_no: "+821012345678".into(),
            code: Some(code.into()),
            used_at: used.then(Utc::now),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn verify_code_accepts_matching_fresh_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![phone_row("123456", false, 1)]])
            .into_connection();
        let service = PhoneService::new(db, sms_stub(), None);

        let phone = service.verify_code("01012345678", "123456").await.unwrap();
        assert_eq!(phone.phone_no, "+821012345678");
    }

    #[tokio::test]
    async fn verify_code_rejects_wrong_code() {
        // The lookup filters on the code itself, so nothing matches.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<phones::Model>::new()])
            .into_connection();
        let service = PhoneService::new(db, sms_stub(), None);

        let err = service
            .verify_code("01012345678", "000000")
            .await
            .unwrap_err();
        assert_eq!(err.opcode(), 114);
    }

    #[tokio::test]
    async fn unconsumed_code_stays_valid_regardless_of_age() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![phone_row("123456", false, 60)]])
            .into_connection();
        let service = PhoneService::new(db, sms_stub(), None);

        let phone = service.verify_code("01012345678", "123456").await.unwrap();
        assert!(phone.used_at.is_none());
    }

    #[tokio::test]
    async fn bypass_code_short_circuits_when_configured() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![phone_row("123456", false, 1)]])
            .into_connection();
        let service = PhoneService::new(db, sms_stub(), Some("999999".into()));

        assert!(service.verify_code("01012345678", "999999").await.is_ok());
    }

    #[tokio::test]
    async fn get_phone_or_throw_rejects_consumed_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![phone_row("123456", true, 1)]])
            .into_connection();
        let service = PhoneService::new(db, sms_stub(), None);

        let token = PhoneToken {
            phone_id: "p-1".into(),
            phone_no: "01012345678".into(),
            code: "123456".into(),
        };
        let err = service.get_phone_or_throw(&token).await.unwrap_err();
        assert_eq!(err.opcode(), 115);
    }

    #[tokio::test]
    async fn consume_is_scoped_to_unconsumed_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = PhoneService::new(crate::database::clone_conn(&db), sms_stub(), None);

        let write = service.consume(&phone_row("123456", false, 1));
        crate::database::transaction::run_atomic(&db, vec![write])
            .await
            .unwrap();

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }
}
