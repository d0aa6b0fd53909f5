use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use lingualink_common::AppError;
use lingualink_database::{Payout, User};

use crate::models::PayoutBatchResponse;

const PAYOUT_STATUS: &str = "Processed";

#[derive(Clone)]
pub struct PayoutService {
    db_pool: PgPool,
    payout_method: String,
}

impl PayoutService {
    pub fn new(db_pool: PgPool, payout_method: String) -> Self {
        Self {
            db_pool,
            payout_method,
        }
    }

    /// Pay out every teacher with a positive balance. The whole batch runs
    /// in one database transaction: a payout row for the full balance plus a
    /// balance reset per teacher, committed once. If any statement fails the
    /// transaction guard drops un-committed and no teacher is touched, so
    /// (balance = 0, no payout) and (balance > 0, duplicate payout) states
    /// cannot occur.
    pub async fn run_payout_batch(&self) -> Result<PayoutBatchResponse, AppError> {
        let eligible = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE role = 'teacher' AND balance > 0 ORDER BY created_at",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if eligible.is_empty() {
            tracing::info!("Payout batch: no teachers with positive balance");
            return Ok(PayoutBatchResponse {
                processed_count: 0,
                payouts: Vec::new(),
            });
        }

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let mut payouts = Vec::with_capacity(eligible.len());
        let now = Utc::now();

        for teacher in &eligible {
            // Lock and re-read inside the transaction: a lesson completed
            // after the select above still has its credit paid out in full.
            let balance = sqlx::query_scalar::<_, Decimal>(
                "SELECT balance FROM users WHERE id = $1 FOR UPDATE",
            )
            .bind(teacher.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

            if balance <= Decimal::ZERO {
                continue;
            }

            let payout = Payout {
                id: Uuid::new_v4(),
                teacher_id: teacher.id,
                amount: balance,
                method: self.payout_method.clone(),
                status: PAYOUT_STATUS.to_string(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO payouts (id, teacher_id, amount, method, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(payout.id)
            .bind(payout.teacher_id)
            .bind(payout.amount)
            .bind(&payout.method)
            .bind(&payout.status)
            .bind(payout.created_at)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

            sqlx::query("UPDATE users SET balance = 0, updated_at = $2 WHERE id = $1")
                .bind(teacher.id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;

            payouts.push(payout);
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Payout batch: processed {} teachers", payouts.len());

        Ok(PayoutBatchResponse {
            processed_count: payouts.len(),
            payouts,
        })
    }

    pub async fn list_payouts(&self) -> Result<Vec<Payout>, AppError> {
        sqlx::query_as::<_, Payout>("SELECT * FROM payouts ORDER BY created_at DESC LIMIT 100")
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }
}
