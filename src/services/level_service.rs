use crate::entities::{levels, users};
use crate::error::{AppError, AppResult};
use crate::external::PaymentsClient;
use crate::services::point_service::{last_month_window, PointService};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

pub struct LevelService {
    db: DatabaseConnection,
    payments: PaymentsClient,
    points: PointService,
}

impl Clone for LevelService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            payments: self.payments.clone(),
            points: self.points.clone(),
        }
    }
}

/// A persisted tier change, and whether any reward coupon made it out.
#[derive(Debug, Clone)]
pub struct LevelChange {
    pub tier: levels::Model,
    pub reward_granted: bool,
}

/// Highest tier whose threshold the total clears. The tier table must carry
/// a zero-threshold baseline; an empty or gapped table is a data error.
pub fn level_for_point(tiers: &[levels::Model], total: i64) -> AppResult<&levels::Model> {
    tiers
        .iter()
        .filter(|tier| tier.required_point <= total)
        .max_by_key(|tier| tier.required_point)
        .ok_or_else(|| {
            AppError::InvalidError(format!("no level tier covers a total of {total}"))
        })
}

impl LevelService {
    pub fn new(db: DatabaseConnection, payments: PaymentsClient, points: PointService) -> Self {
        Self {
            db,
            payments,
            points,
        }
    }

    pub async fn get_levels(&self) -> AppResult<Vec<levels::Model>> {
        Ok(levels::Entity::find()
            .order_by_asc(levels::Column::LevelNo)
            .all(&self.db)
            .await?)
    }

    pub async fn get_level(&self, level_no: i32) -> AppResult<levels::Model> {
        levels::Entity::find_by_id(level_no)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::InvalidError(format!("unknown level {level_no}")))
    }

    /// Recomputes the user's tier from last calendar month's point total.
    /// Returns the change when the tier moved, `None` when it stayed put.
    /// Reward coupons are issued per tier quantity; individual coupon
    /// failures are logged and skipped, never failing the level change.
    pub async fn update_level(&self, user: &users::Model) -> AppResult<Option<LevelChange>> {
        let (from, to) = last_month_window(Utc::now());
        let total = self.points.sum_between(&user.user_id, from, to).await?;

        let tiers = self.get_levels().await?;
        let tier = level_for_point(&tiers, total)?.clone();
        if tier.level_no == user.level_no {
            return Ok(None);
        }

        users::Entity::update_many()
            .col_expr(users::Column::LevelNo, Expr::value(tier.level_no))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::UserId.eq(user.user_id.clone()))
            .exec(&self.db)
            .await?;

        let mut reward_granted = false;
        if let Some(coupon_group_id) = &tier.coupon_group_id {
            let quantity = tier.coupon_quantity.unwrap_or(0);
            for _ in 0..quantity {
                match self
                    .payments
                    .generate_coupon(&user.user_id, coupon_group_id)
                    .await
                {
                    Ok(_) => reward_granted = true,
                    Err(e) => {
                        log::warn!(
                            "level reward coupon failed for user {}: {e}",
                            user.user_id
                        );
                    }
                }
            }
        }

        log::info!(
            "user {} moved from level {} to {} (last month total {total})",
            user.user_id,
            user.level_no,
            tier.level_no
        );
        Ok(Some(LevelChange {
            tier,
            reward_granted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(level_no: i32, required_point: i64) -> levels::Model {
        levels::Model {
            level_no,
            name: format!("L{level_no}"),
            required_point,
            coupon_group_id: None,
            coupon_quantity: None,
        }
    }

    #[test]
    fn picks_highest_cleared_tier() {
        let tiers = vec![tier(1, 0), tier(2, 100), tier(3, 500)];
        assert_eq!(level_for_point(&tiers, 0).unwrap().level_no, 1);
        assert_eq!(level_for_point(&tiers, 99).unwrap().level_no, 1);
        assert_eq!(level_for_point(&tiers, 100).unwrap().level_no, 2);
        assert_eq!(level_for_point(&tiers, 10_000).unwrap().level_no, 3);
    }

    #[test]
    fn order_of_tiers_does_not_matter() {
        let tiers = vec![tier(3, 500), tier(1, 0), tier(2, 100)];
        assert_eq!(level_for_point(&tiers, 250).unwrap().level_no, 2);
    }

    #[test]
    fn missing_baseline_tier_is_a_data_error() {
        let tiers = vec![tier(2, 100)];
        let err = level_for_point(&tiers, 50).unwrap_err();
        assert_eq!(err.opcode(), 105);
    }
}
