use rust_decimal::Decimal;
use sqlx::PgPool;

use lingualink_common::AppError;
use lingualink_database::Transaction;

/// Split a lesson amount into (platform fee, teacher earnings) at the
/// configured fee rate, rounded to cents. The earnings side takes the
/// rounding remainder so the two parts always sum to the full amount.
pub fn split_amount(amount: Decimal, fee_rate: Decimal) -> (Decimal, Decimal) {
    let platform_fee = (amount * fee_rate).round_dp(2);
    let teacher_earnings = amount - platform_fee;
    (platform_fee, teacher_earnings)
}

#[derive(Clone)]
pub struct TransactionService {
    db_pool: PgPool,
}

impl TransactionService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions ORDER BY created_at DESC LIMIT 100",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_and_earnings_sum_to_the_amount() {
        let amount = Decimal::new(2500, 2); // 25.00
        let (fee, earnings) = split_amount(amount, Decimal::new(20, 2)); // 20%

        assert_eq!(fee, Decimal::new(500, 2));
        assert_eq!(earnings, Decimal::new(2000, 2));
        assert_eq!(fee + earnings, amount);
    }

    #[test]
    fn rounding_remainder_goes_to_the_teacher() {
        let amount = Decimal::new(1001, 2); // 10.01
        let (fee, earnings) = split_amount(amount, Decimal::new(20, 2));

        // 20% of 10.01 is 2.002, rounded to 2.00
        assert_eq!(fee, Decimal::new(200, 2));
        assert_eq!(earnings, Decimal::new(801, 2));
        assert_eq!(fee + earnings, amount);
    }

    #[test]
    fn zero_fee_rate_passes_everything_through() {
        let amount = Decimal::new(5000, 2);
        let (fee, earnings) = split_amount(amount, Decimal::ZERO);

        assert_eq!(fee, Decimal::ZERO);
        assert_eq!(earnings, amount);
    }
}
