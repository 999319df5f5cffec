//! Background loops: pass renewal and monthly level recalculation.

use crate::config::SchedulerConfig;
use crate::database::transaction::{run_atomic, PendingWrite};
use crate::entities::{pass_programs, passes, NotificationType};
use crate::error::AppResult;
use crate::models::{CreateNotificationRequest, PaginationParams};
use crate::services::pass_service::PassUpdate;
use crate::services::{LevelService, NotificationService, PassService, UserService};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::time::Duration;

/// What the renewal workflow should do with one expiring candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalDecision {
    /// The owner opted out of renewal: remind them, move no money.
    NotifyExpiry,
    /// The program no longer renews or was pulled from sale: force
    /// auto-renew off and notify once.
    Discontinue,
    /// Charge and extend.
    Extend,
}

/// Pure renewal decision for one candidate pass.
pub fn classify_renewal(
    pass: &passes::Model,
    program: Option<&pass_programs::Model>,
) -> RenewalDecision {
    if !pass.auto_renew {
        return RenewalDecision::NotifyExpiry;
    }
    match program {
        Some(p) if p.allow_renew && p.is_sale => RenewalDecision::Extend,
        _ => RenewalDecision::Discontinue,
    }
}

pub struct TaskContext {
    pub db: DatabaseConnection,
    pub users: UserService,
    pub passes: PassService,
    pub levels: LevelService,
    pub notifications: NotificationService,
}

impl Clone for TaskContext {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            users: self.users.clone(),
            passes: self.passes.clone(),
            levels: self.levels.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

pub fn spawn_all(ctx: TaskContext, config: &SchedulerConfig) {
    if !config.enabled {
        log::info!("schedulers disabled by config");
        return;
    }

    {
        let ctx = ctx.clone();
        let period = Duration::from_secs(config.pass_extend_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = run_pass_extension(&ctx).await {
                    log::error!("pass extension run failed: {e}");
                }
            }
        });
    }

    {
        let period = Duration::from_secs(config.level_update_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = run_level_update(&ctx).await {
                    log::error!("level update run failed: {e}");
                }
            }
        });
    }
}

fn expiry_notice(program_name: &str, days_left: i64) -> CreateNotificationRequest {
    let when = if days_left <= 0 {
        "오늘".to_string()
    } else {
        format!("{days_left}일 후")
    };
    CreateNotificationRequest {
        notification_type: NotificationType::Info,
        title: Some("패스 만료 예정".to_string()),
        description: Some(format!("{program_name} 패스가 {when} 만료돼요.")),
        url: None,
        visible: Some(true),
    }
}

fn discontinue_notice(program_name: &str) -> CreateNotificationRequest {
    CreateNotificationRequest {
        notification_type: NotificationType::Info,
        title: Some("패스 갱신 중단".to_string()),
        description: Some(format!(
            "{program_name} 패스가 더 이상 판매되지 않아 갱신이 중단되었어요."
        )),
        url: None,
        visible: Some(true),
    }
}

fn extended_notice(program_name: &str) -> CreateNotificationRequest {
    CreateNotificationRequest {
        notification_type: NotificationType::Info,
        title: Some("패스 갱신 완료".to_string()),
        description: Some(format!("{program_name} 패스가 갱신되었어요.")),
        url: None,
        visible: Some(true),
    }
}

fn level_notice(tier_name: &str, reward_granted: bool) -> CreateNotificationRequest {
    let description = if reward_granted {
        format!("{tier_name} 등급이 되었어요. 보상 쿠폰이 지급되었어요.")
    } else {
        format!("{tier_name} 등급이 되었어요.")
    };
    CreateNotificationRequest {
        notification_type: NotificationType::Info,
        title: Some("등급 변경".to_string()),
        description: Some(description),
        url: None,
        visible: Some(true),
    }
}

async fn notify(ctx: &TaskContext, user_id: &str, notice: CreateNotificationRequest) {
    let user = match ctx.users.get_user_or_throw(user_id).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("pass owner {user_id} not found for notification: {e}");
            return;
        }
    };
    if let Err(e) = ctx.notifications.send_notification(&user, &notice).await {
        log::warn!("pass notification for user {user_id} failed: {e}");
    }
}

/// One scheduler run. External effects (charges, coupons, pushes) happen
/// per pass. A paid extension is committed immediately; only the
/// `requested_at` stamps and renewal stops are batched into a single
/// transaction at the end. A pass that failed for an unknown reason is
/// left untouched so the next run retries it.
pub async fn run_pass_extension(ctx: &TaskContext) -> AppResult<()> {
    let now = Utc::now();
    let candidates = ctx.passes.get_extendable_passes(now).await?;
    if candidates.is_empty() {
        return Ok(());
    }
    log::info!("pass extension: {} candidates", candidates.len());

    let mut writes: Vec<PendingWrite> = Vec::new();
    for (pass, program) in &candidates {
        match classify_renewal(pass, program.as_ref()) {
            RenewalDecision::NotifyExpiry => {
                let days_left = pass
                    .expired_at
                    .map(|e| (e - now).num_days())
                    .unwrap_or(0);
                log::info!("pass {} expires in {days_left} days", pass.pass_id);
                writes.push(stamp_write(ctx, pass, now));
                let name = program_name(program);
                notify(ctx, &pass.user_id, expiry_notice(&name, days_left)).await;
            }
            RenewalDecision::Discontinue => {
                writes.push(stop_renewal_write(ctx, pass, now));
                let name = program_name(program);
                notify(ctx, &pass.user_id, discontinue_notice(&name)).await;
            }
            RenewalDecision::Extend => {
                let Some(program) = program.as_ref() else {
                    continue;
                };
                match ctx.passes.extend(pass, program, false).await {
                    Ok(update) => {
                        if let Some(Some(expired_at)) = update.expired_at {
                            log::info!(
                                "pass {} extended until {expired_at}",
                                pass.pass_id
                            );
                        }
                        // Money already moved; the new expiry must not wait
                        // for the end-of-run batch.
                        let write = ctx.passes.modify_pass(&pass.pass_id, update);
                        if let Err(e) = run_atomic(&ctx.db, vec![write]).await {
                            log::error!(
                                "pass {} extension not persisted: {e}",
                                pass.pass_id
                            );
                            continue;
                        }
                        notify(ctx, &pass.user_id, extended_notice(&program.name)).await;
                    }
                    Err(e) if e.is_renewal_rejection() => {
                        log::info!(
                            "pass {} renewal rejected (opcode {}), stopping auto-renew",
                            pass.pass_id,
                            e.opcode()
                        );
                        writes.push(stop_renewal_write(ctx, pass, now));
                        notify(ctx, &pass.user_id, discontinue_notice(&program.name)).await;
                    }
                    Err(e) => {
                        // Transient: no stamp, so the next run picks it up.
                        log::error!("pass {} extension failed: {e}", pass.pass_id);
                    }
                }
            }
        }
    }

    run_atomic(&ctx.db, writes).await
}

fn program_name(program: &Option<pass_programs::Model>) -> String {
    program
        .as_ref()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "이용권".to_string())
}

fn stamp_write(
    ctx: &TaskContext,
    pass: &passes::Model,
    now: chrono::DateTime<Utc>,
) -> PendingWrite {
    ctx.passes.modify_pass(
        &pass.pass_id,
        PassUpdate {
            requested_at: Some(now),
            ..Default::default()
        },
    )
}

fn stop_renewal_write(
    ctx: &TaskContext,
    pass: &passes::Model,
    now: chrono::DateTime<Utc>,
) -> PendingWrite {
    ctx.passes.modify_pass(
        &pass.pass_id,
        PassUpdate {
            auto_renew: Some(false),
            requested_at: Some(now),
            ..Default::default()
        },
    )
}

/// Walks every user and recomputes their tier from last month's points.
/// Per-user failures are logged and skipped.
pub async fn run_level_update(ctx: &TaskContext) -> AppResult<()> {
    const PAGE: u64 = 100;
    let mut skip = 0;

    loop {
        let params = PaginationParams {
            take: Some(PAGE),
            skip: Some(skip),
        };
        let users = ctx.users.get_users(&params).await?;
        let page_len = users.len() as u64;

        for user in users {
            match ctx.levels.update_level(&user).await {
                Ok(Some(change)) => {
                    let notice = level_notice(&change.tier.name, change.reward_granted);
                    notify(ctx, &user.user_id, notice).await;
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("level update for user {} failed: {e}", user.user_id);
                }
            }
        }

        if page_len < PAGE {
            return Ok(());
        }
        skip += PAGE;
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::config::{MessagingConfig, PaymentsConfig, PlatformConfig, SmsConfig};
    use crate::entities::{notifications, sessions, users};
    use crate::external::{KakaoClient, MessagingClient, PaymentsClient, PlatformClient, SmsClient};
    use crate::services::{
        LicenseService, MethodService, PhoneService, PointService, SessionService,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn program(allow_renew: bool, is_sale: bool) -> pass_programs::Model {
        let now = Utc::now();
        pass_programs::Model {
            pass_program_id: "pp-1".into(),
            name: "한달 이용권".into(),
            description: None,
            is_sale,
            allow_renew,
            price: Some(9900),
            validity: Some(30 * 86_400),
            coupon_group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn pass(auto_renew: bool) -> passes::Model {
        let now = Utc::now();
        passes::Model {
            pass_id: "p-1".into(),
            user_id: "u-1".into(),
            pass_program_id: "pp-1".into(),
            coupon_group_id: None,
            coupon_id: None,
            auto_renew,
            expired_at: Some(now + chrono::Duration::days(2)),
            requested_at: now - chrono::Duration::days(4),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn renewing_pass_with_live_program_extends() {
        let p = program(true, true);
        assert_eq!(
            classify_renewal(&pass(true), Some(&p)),
            RenewalDecision::Extend
        );
    }

    #[test]
    fn opted_out_pass_only_gets_a_reminder() {
        // Even a live program never charges an opted-out pass.
        let p = program(true, true);
        assert_eq!(
            classify_renewal(&pass(false), Some(&p)),
            RenewalDecision::NotifyExpiry
        );
    }

    #[test]
    fn non_renewable_program_discontinues() {
        let p = program(false, true);
        assert_eq!(
            classify_renewal(&pass(true), Some(&p)),
            RenewalDecision::Discontinue
        );
    }

    #[test]
    fn off_sale_program_discontinues_without_charging() {
        let p = program(true, false);
        assert_eq!(
            classify_renewal(&pass(true), Some(&p)),
            RenewalDecision::Discontinue
        );
    }

    #[test]
    fn missing_program_discontinues() {
        assert_eq!(
            classify_renewal(&pass(true), None),
            RenewalDecision::Discontinue
        );
    }

    #[test]
    fn level_notice_mentions_the_reward_only_when_granted() {
        let with_reward = level_notice("Gold", true).description.unwrap();
        let without = level_notice("Gold", false).description.unwrap();
        assert!(with_reward.contains("보상 쿠폰"));
        assert!(!without.contains("보상 쿠폰"));
    }

    fn owner() -> users::Model {
        let now = Utc::now();
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
            created_at: now,
            updated_at: now,
        }
    }

    fn notification_row() -> notifications::Model {
        notifications::Model {
            notification_id: "n-1".into(),
            user_id: "u-1".into(),
            notification_type: NotificationType::Info,
            title: Some("패스 갱신 완료".into()),
            description: None,
            url: None,
            visible: true,
            readed_at: None,
            sended_at: None,
            created_at: Utc::now(),
        }
    }

    fn context(db: DatabaseConnection) -> TaskContext {
        let payments = PaymentsClient::new(PaymentsConfig {
            base_url: "http://localhost".into(),
            secret_key: "test-secret".into(),
            issuer: "coreservice".into(),
            audience: "coreservice-payments".into(),
        });
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
        let sessions = SessionService::new(crate::database::clone_conn(&db));
        TaskContext {
            db: crate::database::clone_conn(&db),
            users: UserService::new(
                crate::database::clone_conn(&db),
                PhoneService::new(crate::database::clone_conn(&db), sms, None),
                LicenseService::new(crate::database::clone_conn(&db), platform),
                MethodService::new(crate::database::clone_conn(&db), KakaoClient::new()),
                sessions.clone(),
            ),
            passes: PassService::new(crate::database::clone_conn(&db), payments.clone()),
            levels: LevelService::new(crate::database::clone_conn(&db), payments, PointService::new(crate::database::clone_conn(&db))),
            notifications: NotificationService::new(
                db,
                MessagingClient::new(MessagingConfig::default()),
                sessions,
            ),
        }
    }

    #[tokio::test]
    async fn paid_extension_commits_before_the_final_batch() {
        // A free-of-charge program keeps the run offline; the point under
        // test is when the new expiry reaches the database.
        let mut program = program(true, true);
        program.price = None;
        let pass = pass(true);
        let mut extended = pass.clone();
        extended.expired_at = Some(Utc::now() + chrono::Duration::days(32));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // renewal candidates
            .append_query_results(vec![vec![(pass, program)]])
            // the extension's own transaction returns the updated pass
            .append_query_results(vec![vec![extended]])
            // pass owner lookup for the notification
            .append_query_results(vec![vec![owner()]])
            // notification insert
            .append_query_results(vec![vec![notification_row()]])
            // no messaging tokens
            .append_query_results(vec![Vec::<sessions::Model>::new()])
            .into_connection();

        run_pass_extension(&context(crate::database::clone_conn(&db))).await.unwrap();

        // Candidate read, the committed extension, owner read, notification
        // transaction, token read. The end-of-run batch stays empty, so the
        // extension is durable before anything else can fail.
        assert_eq!(db.into_transaction_log().len(), 5);
    }
}
