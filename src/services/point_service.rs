use crate::entities::{points, PointType};
use crate::error::AppResult;
use crate::models::PaginationParams;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

pub struct PointService {
    db: DatabaseConnection,
}

impl Clone for PointService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
        }
    }
}

impl PointService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a ledger entry. Negative amounts are corrections.
    pub async fn add_point(
        &self,
        user_id: &str,
        point: i64,
        point_type: PointType,
    ) -> AppResult<points::Model> {
        Ok(points::ActiveModel {
            user_id: Set(user_id.to_string()),
            point: Set(point),
            point_type: Set(point_type),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn get_points(
        &self,
        user_id: &str,
        params: &PaginationParams,
    ) -> AppResult<Vec<points::Model>> {
        Ok(points::Entity::find()
            .filter(points::Column::UserId.eq(user_id))
            .order_by_desc(points::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .all(&self.db)
            .await?)
    }

    /// Ledger total over `[from, to)`.
    pub async fn sum_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        let total: Option<i64> = points::Entity::find()
            .select_only()
            .column_as(points::Column::Point.sum(), "total")
            .filter(points::Column::UserId.eq(user_id))
            .filter(points::Column::CreatedAt.gte(from))
            .filter(points::Column::CreatedAt.lt(to))
            .into_tuple()
            .one(&self.db)
            .await?
            .flatten();
        Ok(total.unwrap_or(0))
    }

    /// Ledger total since the start of the current calendar month.
    pub async fn sum_current_month(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<i64> {
        self.sum_between(user_id, month_start(now), now).await
    }
}

/// Midnight UTC on the first of `now`'s month.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .unwrap_or_else(|| now.date_naive());
    DateTime::from_naive_utc_and_offset(first.and_hms_opt(0, 0, 0).unwrap(), Utc)
}

/// The `[start, end)` window covering the calendar month before `now`.
pub fn last_month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let this_month = month_start(now);
    // A day before the first of this month lands anywhere in last month.
    let last_month = month_start(this_month - chrono::Duration::days(1));
    (last_month, this_month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_covers_previous_calendar_month() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();
        let (from, to) = last_month_window(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_start_truncates_to_the_first() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn window_wraps_the_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let (from, to) = last_month_window(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }
}
