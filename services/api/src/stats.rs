use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use lingualink_common::AppError;

use crate::models::{LessonStats, RevenueStats, SupportStats, TeacherStats, UserStats};

/// Percentage change between two consecutive monthly aggregates.
/// A period growing out of nothing is reported as 100%, and no activity in
/// either period as 0%.
pub fn growth_rate(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

// Rolling windows: current = last 30 days, previous = the 30 days before.
fn rolling_windows() -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    (now - Duration::days(60), now - Duration::days(30))
}

#[derive(Clone)]
pub struct StatsService {
    db_pool: PgPool,
}

impl StatsService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn user_stats(&self) -> Result<UserStats, AppError> {
        let (previous_start, current_start) = rolling_windows();

        let total_users = self.count("SELECT COUNT(*) FROM users", &[]).await?;
        let active_users = self
            .count("SELECT COUNT(*) FROM users WHERE status = 'active'", &[])
            .await?;
        let new_users_current = self
            .count(
                "SELECT COUNT(*) FROM users WHERE created_at >= $1",
                &[current_start],
            )
            .await?;
        let new_users_previous = self
            .count(
                "SELECT COUNT(*) FROM users WHERE created_at >= $1 AND created_at < $2",
                &[previous_start, current_start],
            )
            .await?;

        Ok(UserStats {
            total_users,
            active_users,
            new_users_current,
            new_users_previous,
            growth_rate: growth_rate(new_users_previous as f64, new_users_current as f64),
        })
    }

    pub async fn teacher_stats(&self) -> Result<TeacherStats, AppError> {
        let (previous_start, current_start) = rolling_windows();

        let total_teachers = self
            .count("SELECT COUNT(*) FROM users WHERE role = 'teacher'", &[])
            .await?;
        let active_teachers = self
            .count(
                "SELECT COUNT(*) FROM users WHERE role = 'teacher' AND status = 'active'",
                &[],
            )
            .await?;
        let new_teachers_current = self
            .count(
                "SELECT COUNT(*) FROM users WHERE role = 'teacher' AND created_at >= $1",
                &[current_start],
            )
            .await?;
        let new_teachers_previous = self
            .count(
                "SELECT COUNT(*) FROM users WHERE role = 'teacher' AND created_at >= $1 AND created_at < $2",
                &[previous_start, current_start],
            )
            .await?;

        Ok(TeacherStats {
            total_teachers,
            active_teachers,
            new_teachers_current,
            new_teachers_previous,
            growth_rate: growth_rate(new_teachers_previous as f64, new_teachers_current as f64),
        })
    }

    pub async fn lesson_stats(&self) -> Result<LessonStats, AppError> {
        let (previous_start, current_start) = rolling_windows();

        let total_lessons = self.count("SELECT COUNT(*) FROM bookings", &[]).await?;
        let completed_lessons = self
            .count(
                "SELECT COUNT(*) FROM bookings WHERE status = 'completed'",
                &[],
            )
            .await?;
        let lessons_current = self
            .count(
                "SELECT COUNT(*) FROM bookings WHERE created_at >= $1",
                &[current_start],
            )
            .await?;
        let lessons_previous = self
            .count(
                "SELECT COUNT(*) FROM bookings WHERE created_at >= $1 AND created_at < $2",
                &[previous_start, current_start],
            )
            .await?;

        Ok(LessonStats {
            total_lessons,
            completed_lessons,
            lessons_current,
            lessons_previous,
            growth_rate: growth_rate(lessons_previous as f64, lessons_current as f64),
        })
    }

    pub async fn revenue_stats(&self) -> Result<RevenueStats, AppError> {
        let (previous_start, current_start) = rolling_windows();

        let total_revenue = self.sum("SELECT SUM(amount) FROM transactions", &[]).await?;
        let total_platform_fees = self
            .sum("SELECT SUM(platform_fee) FROM transactions", &[])
            .await?;
        let revenue_current = self
            .sum(
                "SELECT SUM(amount) FROM transactions WHERE created_at >= $1",
                &[current_start],
            )
            .await?;
        let revenue_previous = self
            .sum(
                "SELECT SUM(amount) FROM transactions WHERE created_at >= $1 AND created_at < $2",
                &[previous_start, current_start],
            )
            .await?;

        Ok(RevenueStats {
            total_revenue,
            total_platform_fees,
            revenue_current,
            revenue_previous,
            growth_rate: growth_rate(
                revenue_previous.to_f64().unwrap_or(0.0),
                revenue_current.to_f64().unwrap_or(0.0),
            ),
        })
    }

    pub async fn support_stats(&self) -> Result<SupportStats, AppError> {
        let (previous_start, current_start) = rolling_windows();

        let total_tickets = self
            .count("SELECT COUNT(*) FROM support_tickets", &[])
            .await?;
        let open_tickets = self
            .count(
                "SELECT COUNT(*) FROM support_tickets WHERE status = 'open'",
                &[],
            )
            .await?;
        let tickets_current = self
            .count(
                "SELECT COUNT(*) FROM support_tickets WHERE created_at >= $1",
                &[current_start],
            )
            .await?;
        let tickets_previous = self
            .count(
                "SELECT COUNT(*) FROM support_tickets WHERE created_at >= $1 AND created_at < $2",
                &[previous_start, current_start],
            )
            .await?;

        Ok(SupportStats {
            total_tickets,
            open_tickets,
            tickets_current,
            tickets_previous,
            growth_rate: growth_rate(tickets_previous as f64, tickets_current as f64),
        })
    }

    async fn count(&self, sql: &str, binds: &[DateTime<Utc>]) -> Result<i64, AppError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        query.fetch_one(&self.db_pool).await.map_err(AppError::Database)
    }

    async fn sum(&self, sql: &str, binds: &[DateTime<Utc>]) -> Result<Decimal, AppError> {
        let mut query = sqlx::query_scalar::<_, Option<Decimal>>(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let total = query
            .fetch_one(&self.db_pool)
            .await
            .map_err(AppError::Database)?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_from_nothing_is_100_percent() {
        assert_eq!(growth_rate(0.0, 50.0), 100.0);
    }

    #[test]
    fn no_activity_in_either_period_is_flat() {
        assert_eq!(growth_rate(0.0, 0.0), 0.0);
    }

    #[test]
    fn growth_is_relative_to_the_previous_period() {
        assert_eq!(growth_rate(100.0, 150.0), 50.0);
        assert_eq!(growth_rate(200.0, 100.0), -50.0);
        assert_eq!(growth_rate(80.0, 80.0), 0.0);
    }
}
