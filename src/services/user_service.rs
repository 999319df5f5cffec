use crate::database::transaction::{deferred, run_atomic, PendingWrite};
use crate::entities::{levels, secessions, users};
use crate::error::{AppError, AppResult};
use crate::external::KakaoUser;
use crate::models::{ModifyUserRequest, PaginationParams, SignupRequest};
use crate::services::level_service::level_for_point;
use crate::services::license_service::LicenseService;
use crate::services::method_service::MethodService;
use crate::services::phone_service::PhoneService;
use crate::services::session_service::SessionService;
use crate::utils::{format_phone, generate_referral_code, MAX_GENERATE_ATTEMPTS};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, Unchanged,
};
use uuid::Uuid;

pub struct UserService {
    db: DatabaseConnection,
    phones: PhoneService,
    licenses: LicenseService,
    methods: MethodService,
    sessions: SessionService,
}

impl Clone for UserService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            phones: self.phones.clone(),
            licenses: self.licenses.clone(),
            methods: self.methods.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

impl UserService {
    pub fn new(
        db: DatabaseConnection,
        phones: PhoneService,
        licenses: LicenseService,
        methods: MethodService,
        sessions: SessionService,
    ) -> Self {
        Self {
            db,
            phones,
            licenses,
            methods,
            sessions,
        }
    }

    pub async fn get_user_or_throw(&self, user_id: &str) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(AppError::CannotFindUser)
    }

    pub async fn get_user_by_phone(&self, phone_no: &str) -> AppResult<Option<users::Model>> {
        let phone_no = format_phone(phone_no)?;
        Ok(users::Entity::find()
            .filter(users::Column::PhoneNo.eq(phone_no))
            .one(&self.db)
            .await?)
    }

    pub async fn get_user_by_phone_or_throw(&self, phone_no: &str) -> AppResult<users::Model> {
        self.get_user_by_phone(phone_no)
            .await?
            .ok_or(AppError::NotRegisteredUser)
    }

    /// Paginated listing for the internal API and the level scheduler.
    pub async fn get_users(&self, params: &PaginationParams) -> AppResult<Vec<users::Model>> {
        Ok(users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .all(&self.db)
            .await?)
    }

    async fn get_unused_user_id(&self) -> AppResult<String> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let user_id = Uuid::now_v7().to_string();
            let taken = users::Entity::find_by_id(user_id.clone())
                .one(&self.db)
                .await?;
            if taken.is_none() {
                return Ok(user_id);
            }
        }
        Err(AppError::InvalidError(
            "could not allocate a unique user id".to_string(),
        ))
    }

    async fn get_unused_referral_code(&self) -> AppResult<String> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = generate_referral_code();
            let taken = users::Entity::find()
                .filter(users::Column::ReferralCode.eq(code.clone()))
                .one(&self.db)
                .await?;
            if taken.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::InvalidError(
            "could not allocate a unique referral code".to_string(),
        ))
    }

    /// Creates the account. All preparation runs up front: phone token,
    /// duplicate check, license validation, Kakao resolution. Nothing is
    /// written until every step passed; the user, license and method rows
    /// then land in one transaction, and the phone token is consumed only
    /// after that transaction committed.
    pub async fn signup_user(&self, req: SignupRequest) -> AppResult<users::Model> {
        let phone = self.phones.get_phone_or_throw(&req.phone).await?;
        self.phones
            .assert_number_not_registered(&phone.phone_no)
            .await?;

        let user_id = self.get_unused_user_id().await?;
        let referral_code = self.get_unused_referral_code().await?;
        let mut writes: Vec<PendingWrite> = Vec::new();

        if let Some(license_str) = &req.license_str {
            writes.push(
                self.licenses
                    .set_license(&user_id, &req.realname, req.birthday, license_str)
                    .await?,
            );
        }

        if let Some(access_token) = &req.kakao_access_token {
            writes.push(self.methods.connect_kakao(&user_id, access_token).await?);
        }

        // New accounts start on whatever tier covers zero points.
        let tiers = levels::Entity::find().all(&self.db).await?;
        let entry_level = level_for_point(&tiers, 0)?.level_no;

        let now = Utc::now();
        let user = users::Model {
            user_id: user_id.clone(),
            realname: req.realname,
            birthday: req.birthday,
            phone_no: phone.phone_no.clone(),
            email: req.email,
            level_no: entry_level,
            referral_code,
            referrer_user_id: None,
            centercoin_balance: 0,
            receive_push: req.receive_push.unwrap_or(true),
            used_at: None,
            created_at: now,
            updated_at: now,
        };

        let active = active_from_model(&user);
        writes.insert(
            0,
            deferred(move |txn| {
                Box::pin(async move {
                    active.insert(txn).await?;
                    Ok(())
                })
            }),
        );

        run_atomic(&self.db, writes).await?;
        run_atomic(&self.db, vec![self.phones.consume(&phone)]).await?;

        log::info!("user {user_id} signed up");
        Ok(user)
    }

    /// Sparse profile update. Changing the name or birthday invalidates the
    /// stored license; a new phone token is re-checked and consumed only
    /// after the update committed.
    pub async fn modify_user(
        &self,
        user: &users::Model,
        req: ModifyUserRequest,
    ) -> AppResult<users::Model> {
        let mut writes: Vec<PendingWrite> = Vec::new();
        let mut updated = user.clone();

        let phone = match &req.phone {
            Some(token) => {
                let phone = self.phones.get_phone_or_throw(token).await?;
                if phone.phone_no != user.phone_no {
                    self.phones
                        .assert_number_not_registered(&phone.phone_no)
                        .await?;
                }
                updated.phone_no = phone.phone_no.clone();
                Some(phone)
            }
            None => None,
        };

        if let Some(realname) = req.realname {
            updated.realname = realname;
        }
        if let Some(birthday) = req.birthday {
            updated.birthday = birthday;
        }
        if let Some(email) = req.email {
            updated.email = Some(email);
        }
        if let Some(receive_push) = req.receive_push {
            updated.receive_push = receive_push;
        }

        let identity_changed =
            updated.realname != user.realname || updated.birthday != user.birthday;
        if identity_changed {
            writes.push(self.licenses.delete_license(&user.user_id));
        }

        updated.updated_at = Utc::now();
        let model = updated.clone();
        writes.push(deferred(move |txn| {
            Box::pin(async move {
                let mut active = active_from_model(&model);
                active.user_id = Unchanged(model.user_id.clone());
                active.update(txn).await?;
                Ok(())
            })
        }));

        run_atomic(&self.db, writes).await?;
        if let Some(phone) = phone {
            run_atomic(&self.db, vec![self.phones.consume(&phone)]).await?;
        }

        Ok(updated)
    }

    /// Deletes the account: linked methods, sessions, license and the user
    /// row go in one transaction, and a tombstone records the departure.
    pub async fn secession_user(
        &self,
        user: &users::Model,
        reason: Option<String>,
    ) -> AppResult<()> {
        let user_id = user.user_id.clone();
        let writes: Vec<PendingWrite> = vec![
            self.methods.delete_all_for_user(&user_id),
            self.sessions.delete_all_for_user(&user_id),
            self.licenses.delete_license(&user_id),
            {
                let user_id = user_id.clone();
                deferred(move |txn| {
                    Box::pin(async move {
                        users::Entity::delete_by_id(user_id).exec(txn).await?;
                        Ok(())
                    })
                })
            },
            {
                let tombstone = secessions::ActiveModel {
                    user_id: Set(user_id.clone()),
                    reason: Set(reason),
                    created_at: Set(Utc::now()),
                };
                deferred(move |txn| {
                    Box::pin(async move {
                        tombstone.insert(txn).await?;
                        Ok(())
                    })
                })
            },
        ];

        run_atomic(&self.db, writes).await?;
        log::info!("user {user_id} seceded");
        Ok(())
    }

    /// Stages linking a Kakao account resolved during login.
    pub async fn link_kakao(&self, user_id: &str, kakao_user: &KakaoUser) -> AppResult<()> {
        let write = self.methods.stage_connect(user_id, kakao_user).await?;
        run_atomic(&self.db, vec![write]).await
    }
}

fn active_from_model(user: &users::Model) -> users::ActiveModel {
    users::ActiveModel {
        user_id: Set(user.user_id.clone()),
        realname: Set(user.realname.clone()),
        birthday: Set(user.birthday),
        phone_no: Set(user.phone_no.clone()),
        email: Set(user.email.clone()),
        level_no: Set(user.level_no),
        referral_code: Set(user.referral_code.clone()),
        referrer_user_id: Set(user.referrer_user_id.clone()),
        centercoin_balance: Set(user.centercoin_balance),
        receive_push: Set(user.receive_push),
        used_at: Set(user.used_at),
        created_at: Set(user.created_at),
        updated_at: Set(user.updated_at),
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::config::{PlatformConfig, SmsConfig};
    use crate::entities::phones;
    use crate::external::{KakaoClient, PlatformClient, SmsClient};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn service(db: DatabaseConnection) -> UserService {
        let sms = SmsClient::new(SmsConfig {
            base_url: "http://localhost".into(),
            api_key: String::new(),
            from: "+821000000000".into(),
            debug: true,
        });
        let platform = PlatformClient::new(PlatformConfig {
            base_url: "http://localhost".into(),
            access_key: String::new(),
        });
        UserService::new(
            crate::database::clone_conn(&db),
            PhoneService::new(crate::database::clone_conn(&db), sms, None),
            LicenseService::new(crate::database::clone_conn(&db), platform),
            MethodService::new(crate::database::clone_conn(&db), KakaoClient::new()),
            SessionService::new(db),
        )
    }

    fn phone_row() -> phones::Model {
        phones::Model {
            phone_id: "p-1".into(),
            phone_no: "+821012345678".into(),
            code: Some("123456".into()),
            used_at: None,
            created_at: Utc::now(),
        }
    }

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

    fn tier(level_no: i32, required_point: i64) -> crate::entities::levels::Model {
        crate::entities::levels::Model {
            level_no,
            name: format!("L{level_no}"),
            required_point,
            coupon_group_id: None,
            coupon_quantity: None,
        }
    }

    fn signup_request() -> SignupRequest {
        SignupRequest {
            realname: "홍길동".into(),
            birthday: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            email: None,
            phone: crate::models::PhoneToken {
                phone_id: "p-1".into(),
                phone_no: "01012345678".into(),
                code: "123456".into(),
            },
            license_str: None,
            kakao_access_token: None,
            receive_push: None,
        }
    }

    #[tokio::test]
    async fn signup_rejects_registered_number_before_writing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // phone token lookup
            .append_query_results(vec![vec![phone_row()]])
            // number already belongs to a user
            .append_query_results(vec![vec![user_row()]])
            .into_connection();
        let service = service(crate::database::clone_conn(&db));

        let err = service.signup_user(signup_request()).await.unwrap_err();
        assert_eq!(err.opcode(), 113);

        // Only the two read queries ran; no transaction was opened.
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn signup_commits_then_consumes_the_phone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // phone token lookup
            .append_query_results(vec![vec![phone_row()]])
            // phone number not registered
            .append_query_results(vec![Vec::<users::Model>::new()])
            // user id free
            .append_query_results(vec![Vec::<users::Model>::new()])
            // referral code free
            .append_query_results(vec![Vec::<users::Model>::new()])
            // level tiers
            .append_query_results(vec![vec![tier(1, 0), tier(2, 100)]])
            // user insert returning row
            .append_query_results(vec![vec![user_row()]])
            .append_exec_results(vec![
                // user insert
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                // phone consume
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let service = service(crate::database::clone_conn(&db));

        let user = service.signup_user(signup_request()).await.unwrap();
        assert_eq!(user.phone_no, "+821012345678");
        assert_eq!(user.level_no, 1);

        // Five preparation reads, then one transaction for the account and
        // a second one for the consume.
        assert_eq!(db.into_transaction_log().len(), 7);
    }

    #[tokio::test]
    async fn signup_starts_on_the_zero_point_tier() {
        // The baseline tier is not necessarily numbered 1.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![phone_row()]])
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![vec![tier(3, 0), tier(5, 100)]])
            .append_query_results(vec![vec![user_row()]])
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                };
                2
            ])
            .into_connection();
        let service = service(crate::database::clone_conn(&db));

        let user = service.signup_user(signup_request()).await.unwrap();
        assert_eq!(user.level_no, 3);
    }

    #[tokio::test]
    async fn signup_aborts_before_any_write_when_license_is_invalid() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // phone token lookup
            .append_query_results(vec![vec![phone_row()]])
            // phone number not registered
            .append_query_results(vec![Vec::<users::Model>::new()])
            // user id free
            .append_query_results(vec![Vec::<users::Model>::new()])
            // referral code free
            .append_query_results(vec![Vec::<users::Model>::new()])
            .into_connection();
        let service = service(crate::database::clone_conn(&db));

        let mut req = signup_request();
        req.license_str = Some("112233333344".into());
        let err = service.signup_user(req).await.unwrap_err();
        assert_eq!(err.opcode(), 108);

        // Only the preparation reads ran: no user row, no phone consume.
        assert_eq!(db.into_transaction_log().len(), 4);
    }

    #[tokio::test]
    async fn secession_runs_as_a_single_batch() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // tombstone insert returns the row
            .append_query_results(vec![vec![secessions::Model {
                user_id: "u-1".into(),
                reason: Some("goodbye".into()),
                created_at: Utc::now(),
            }]])
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                };
                5
            ])
            .into_connection();
        let service = service(crate::database::clone_conn(&db));

        service
            .secession_user(&user_row(), Some("goodbye".into()))
            .await
            .unwrap();

        assert_eq!(db.into_transaction_log().len(), 1);
    }
}
