use crate::database::transaction::{deferred, PendingWrite};
use crate::entities::{pass_programs, passes};
use crate::error::{AppError, AppResult};
use crate::external::PaymentsClient;
use crate::models::PaginationParams;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, Unchanged,
};
use serde_json::json;
use uuid::Uuid;

/// A pass the renewal workflow touched is left alone for this long before
/// the scheduler considers it again.
const EXTEND_INTERVAL_DAYS: i64 = 3;
/// Passes expiring within this many days are renewal candidates.
const EXTEND_REMAINING_DAYS: i64 = 7;

/// New expiry when a pass gains `validity` seconds at `now`.
///
/// An expiry in the future stacks: the new period begins where the current
/// one ends. An expiry in the past (or a pass that never had one) starts a
/// fresh period at `now`; lapsed time is never billed. `None` validity means
/// the pass never expires.
pub fn calculate_expired_at(
    current: Option<DateTime<Utc>>,
    validity_secs: Option<i64>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let validity = Duration::seconds(validity_secs?);
    match current {
        Some(expired_at) if expired_at > now => Some(expired_at + validity),
        _ => Some(now + validity),
    }
}

/// Sparse pass update, applied inside the batch transaction.
#[derive(Debug, Default, Clone)]
pub struct PassUpdate {
    pub auto_renew: Option<bool>,
    pub expired_at: Option<Option<DateTime<Utc>>>,
    pub coupon_id: Option<Option<String>>,
    pub coupon_group_id: Option<Option<String>>,
    pub requested_at: Option<DateTime<Utc>>,
}

pub struct PassService {
    db: DatabaseConnection,
    payments: PaymentsClient,
}

impl Clone for PassService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            payments: self.payments.clone(),
        }
    }
}

impl PassService {
    pub fn new(db: DatabaseConnection, payments: PaymentsClient) -> Self {
        Self { db, payments }
    }

    pub async fn get_pass_or_throw(&self, pass_id: &str) -> AppResult<passes::Model> {
        passes::Entity::find_by_id(pass_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(AppError::CannotFindPass)
    }

    pub async fn get_passes(
        &self,
        user_id: &str,
        params: &PaginationParams,
    ) -> AppResult<Vec<(passes::Model, Option<pass_programs::Model>)>> {
        Ok(passes::Entity::find()
            .filter(passes::Column::UserId.eq(user_id))
            .order_by_desc(passes::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .find_also_related(pass_programs::Entity)
            .all(&self.db)
            .await?)
    }

    /// Buys a program for the user: charge (unless free), reward coupon,
    /// pass row. The charge happens before the row exists, so a rejected
    /// charge leaves nothing behind.
    pub async fn purchase(
        &self,
        user_id: &str,
        program: &pass_programs::Model,
        auto_renew: bool,
        free: bool,
    ) -> AppResult<passes::Model> {
        if !free && !program.is_sale {
            return Err(AppError::PassProgramIsNotSale);
        }

        let pass_id = Uuid::now_v7().to_string();
        if !free {
            self.charge(user_id, program, &pass_id).await?;
        }

        let coupon_id = self.issue_reward_coupon(user_id, program).await;
        let now = Utc::now();
        let pass = passes::ActiveModel {
            pass_id: Set(pass_id),
            user_id: Set(user_id.to_string()),
            pass_program_id: Set(program.pass_program_id.clone()),
            coupon_group_id: Set(program.coupon_group_id.clone()),
            coupon_id: Set(coupon_id),
            auto_renew: Set(auto_renew),
            expired_at: Set(calculate_expired_at(None, program.validity, now)),
            requested_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        log::info!(
            "user {user_id} purchased pass {} of program {}",
            pass.pass_id,
            program.pass_program_id
        );
        Ok(pass)
    }

    /// Runs the renewal side effects for one pass: charge (unless free),
    /// swap the reward coupon, compute the stacked expiry. Returns the
    /// sparse update to persist; the caller decides when that happens.
    pub async fn extend(
        &self,
        pass: &passes::Model,
        program: &pass_programs::Model,
        free: bool,
    ) -> AppResult<PassUpdate> {
        if !program.allow_renew {
            return Err(AppError::PassProgramNotAllowRenew);
        }
        if !program.is_sale {
            return Err(AppError::PassProgramIsNotSale);
        }

        if !free {
            self.charge(&pass.user_id, program, &pass.pass_id).await?;
        }

        // Old reward coupon is void once the new period is paid for; its
        // deletion is best effort.
        if let Some(coupon_id) = &pass.coupon_id {
            if let Err(e) = self.payments.delete_coupon(&pass.user_id, coupon_id).await {
                log::warn!(
                    "stale coupon {coupon_id} of pass {} not deleted: {e}",
                    pass.pass_id
                );
            }
        }
        let coupon_id = self.issue_reward_coupon(&pass.user_id, program).await;

        let now = Utc::now();
        Ok(PassUpdate {
            expired_at: Some(calculate_expired_at(pass.expired_at, program.validity, now)),
            coupon_id: Some(coupon_id),
            coupon_group_id: Some(program.coupon_group_id.clone()),
            requested_at: Some(now),
            ..Default::default()
        })
    }

    pub fn modify_pass(&self, pass_id: &str, update: PassUpdate) -> PendingWrite {
        let pass_id = pass_id.to_string();
        deferred(move |txn| {
            Box::pin(async move {
                let mut model = passes::ActiveModel {
                    pass_id: Unchanged(pass_id),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };
                if let Some(auto_renew) = update.auto_renew {
                    model.auto_renew = Set(auto_renew);
                }
                if let Some(expired_at) = update.expired_at {
                    model.expired_at = Set(expired_at);
                }
                if let Some(coupon_id) = update.coupon_id {
                    model.coupon_id = Set(coupon_id);
                }
                if let Some(coupon_group_id) = update.coupon_group_id {
                    model.coupon_group_id = Set(coupon_group_id);
                }
                if let Some(requested_at) = update.requested_at {
                    model.requested_at = Set(requested_at);
                }
                model.update(txn).await?;
                Ok(())
            })
        })
    }

    /// Renewal candidates: expiring within the lookahead window and not
    /// already touched by the workflow within the interval. Non-renewing
    /// passes are included; the scheduler only reminds their owners.
    pub async fn get_extendable_passes(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<(passes::Model, Option<pass_programs::Model>)>> {
        let cutoff = now - Duration::days(EXTEND_INTERVAL_DAYS);
        let horizon = now + Duration::days(EXTEND_REMAINING_DAYS);
        Ok(passes::Entity::find()
            .filter(passes::Column::ExpiredAt.is_not_null())
            .filter(passes::Column::ExpiredAt.gte(now))
            .filter(passes::Column::ExpiredAt.lte(horizon))
            .filter(passes::Column::RequestedAt.lte(cutoff))
            .find_also_related(pass_programs::Entity)
            .all(&self.db)
            .await?)
    }

    pub async fn count_for_program(&self, pass_program_id: &str) -> AppResult<u64> {
        use sea_orm::PaginatorTrait;
        Ok(passes::Entity::find()
            .filter(passes::Column::PassProgramId.eq(pass_program_id))
            .count(&self.db)
            .await?)
    }

    async fn charge(
        &self,
        user_id: &str,
        program: &pass_programs::Model,
        pass_id: &str,
    ) -> AppResult<()> {
        let Some(price) = program.price.filter(|p| *p > 0) else {
            return Ok(());
        };

        self.payments
            .create_record(
                user_id,
                &program.name,
                price,
                json!({
                    "passId": pass_id,
                    "passProgramId": program.pass_program_id,
                }),
            )
            .await
    }

    async fn issue_reward_coupon(
        &self,
        user_id: &str,
        program: &pass_programs::Model,
    ) -> Option<String> {
        let coupon_group_id = program.coupon_group_id.as_ref()?;
        match self.payments.generate_coupon(user_id, coupon_group_id).await {
            Ok(coupon) => Some(coupon.coupon_id),
            Err(e) => {
                log::warn!("reward coupon for program {} failed: {e}", program.pass_program_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn no_validity_means_no_expiry() {
        assert_eq!(calculate_expired_at(Some(at(1)), None, at(2)), None);
        assert_eq!(calculate_expired_at(None, None, at(2)), None);
    }

    #[test]
    fn fresh_or_lapsed_pass_starts_from_now() {
        let day = 86_400;
        assert_eq!(
            calculate_expired_at(None, Some(day), at(12)),
            Some(at(12) + Duration::days(1))
        );
        // Expired two hours ago: the lapsed window is not billed.
        assert_eq!(
            calculate_expired_at(Some(at(10)), Some(day), at(12)),
            Some(at(12) + Duration::days(1))
        );
    }

    #[test]
    fn active_pass_stacks_on_current_expiry() {
        let day = 86_400;
        assert_eq!(
            calculate_expired_at(Some(at(18)), Some(day), at(12)),
            Some(at(18) + Duration::days(1))
        );
    }

    #[test]
    fn expiry_never_shrinks() {
        let hour = 3_600;
        let current = Some(at(20));
        let next = calculate_expired_at(current, Some(hour), at(1)).unwrap();
        assert!(next > at(20));
    }
}
