use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use lingualink_common::{AppError, BookingStatus, TransactionType, UserStatus};
use lingualink_database::{Booking, User};

use crate::models::{BookingResponse, CreateBookingRequest};
use crate::transactions::split_amount;

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Clone)]
pub struct BookingService {
    db_pool: PgPool,
    fee_rate: Decimal,
}

impl BookingService {
    pub fn new(db_pool: PgPool, fee_rate: Decimal) -> Self {
        Self { db_pool, fee_rate }
    }

    /// Create a booking for a student. Duplicate requests on the natural key
    /// (student, teacher, lesson type, lesson date) return the existing
    /// booking with status "already_exists" instead of erroring; the unique
    /// index catches the race two concurrent identical requests would
    /// otherwise win together.
    pub async fn create_booking(
        &self,
        student_id: Uuid,
        request: CreateBookingRequest,
    ) -> Result<BookingResponse, AppError> {
        let lesson_date = DateTime::parse_from_rfc3339(&request.lesson_date)
            .map_err(|_| {
                AppError::Validation("lesson_date must be an RFC 3339 timestamp".to_string())
            })?
            .with_timezone(&Utc);

        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "amount must be a positive number".to_string(),
            ));
        }

        if let Some(existing) = self
            .find_duplicate(student_id, request.teacher_id, &request.lesson_type, lesson_date)
            .await?
        {
            return Ok(already_exists_response(existing));
        }

        let teacher = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND role = 'teacher'",
        )
        .bind(request.teacher_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Teacher not found".to_string()))?;

        if teacher.status != UserStatus::Active.as_str() {
            return Err(AppError::NotFound("Teacher not found".to_string()));
        }

        let booking_id = Uuid::new_v4();
        let currency = request
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let inserted = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, student_id, teacher_id, lesson_type, lesson_date,
                lesson_duration_minutes, amount, currency, status, notes, meeting_link
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'confirmed', $9, $10)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(student_id)
        .bind(request.teacher_id)
        .bind(&request.lesson_type)
        .bind(lesson_date)
        .bind(request.lesson_duration_minutes)
        .bind(request.amount)
        .bind(&currency)
        .bind(&request.notes)
        .bind(&teacher.meeting_link)
        .fetch_one(&self.db_pool)
        .await;

        let booking = match inserted {
            Ok(booking) => booking,
            Err(err) => {
                let err = AppError::Database(err);
                if err.is_unique_violation() {
                    // Lost the race against an identical request; the winner's
                    // row is the idempotent answer.
                    let existing = self
                        .find_duplicate(
                            student_id,
                            request.teacher_id,
                            &request.lesson_type,
                            lesson_date,
                        )
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal("Duplicate booking vanished".to_string())
                        })?;
                    return Ok(already_exists_response(existing));
                }
                return Err(err);
            }
        };

        tracing::info!(
            "Booking {} created: student {} with teacher {}",
            booking.id,
            student_id,
            request.teacher_id
        );

        Ok(BookingResponse {
            id: booking.id,
            status: booking.status,
            student_id: booking.student_id,
            teacher_id: booking.teacher_id,
            lesson_type: booking.lesson_type,
            lesson_date: booking.lesson_date,
            meeting_link: booking.meeting_link,
        })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE student_id = $1 OR teacher_id = $1
            ORDER BY lesson_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Status transitions: confirmed -> completed (teacher only) and
    /// confirmed -> canceled (either participant). Completing a booking
    /// records the lesson transaction and credits the teacher's balance in
    /// the same database transaction as the status change.
    pub async fn update_status(
        &self,
        caller_id: Uuid,
        booking_id: Uuid,
        next_status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if caller_id != booking.student_id && caller_id != booking.teacher_id {
            return Err(AppError::Authorization(
                "Only booking participants can change its status".to_string(),
            ));
        }

        let current = BookingStatus::parse(&booking.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown booking status in database: {}", booking.status))
        })?;

        if !transition_allowed(current, next_status) {
            return Err(AppError::Validation(format!(
                "Cannot change booking from {} to {}",
                current.as_str(),
                next_status.as_str()
            )));
        }

        if next_status == BookingStatus::Completed && caller_id != booking.teacher_id {
            return Err(AppError::Authorization(
                "Only the teacher can mark a lesson completed".to_string(),
            ));
        }

        // The status filter makes the update a compare-and-swap, so a
        // concurrent cancel and complete cannot both go through.
        let updated = match next_status {
            BookingStatus::Completed => self.complete_booking(&booking).await?,
            _ => {
                sqlx::query_as::<_, Booking>(
                    "UPDATE bookings SET status = $2 WHERE id = $1 AND status = 'confirmed' RETURNING *",
                )
                .bind(booking.id)
                .bind(next_status.as_str())
                .fetch_optional(&self.db_pool)
                .await
                .map_err(AppError::Database)?
                .ok_or_else(|| {
                    AppError::Conflict("Booking status changed concurrently".to_string())
                })?
            }
        };

        tracing::info!("Booking {} moved to {}", booking.id, updated.status);

        Ok(updated)
    }

    async fn complete_booking(&self, booking: &Booking) -> Result<Booking, AppError> {
        let (platform_fee, teacher_earnings) = split_amount(booking.amount, self.fee_rate);

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'completed' WHERE id = $1 AND status = 'confirmed' RETURNING *",
        )
        .bind(booking.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Conflict("Booking status changed concurrently".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, teacher_id, amount, transaction_type, status,
                platform_fee, teacher_earnings
            )
            VALUES ($1, $2, $3, $4, $5, 'completed', $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.student_id)
        .bind(booking.teacher_id)
        .bind(booking.amount)
        .bind(TransactionType::Lesson.as_str())
        .bind(platform_fee)
        .bind(teacher_earnings)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        sqlx::query("UPDATE users SET balance = balance + $2, updated_at = now() WHERE id = $1")
            .bind(booking.teacher_id)
            .bind(teacher_earnings)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        Ok(updated)
    }

    async fn find_duplicate(
        &self,
        student_id: Uuid,
        teacher_id: Uuid,
        lesson_type: &str,
        lesson_date: DateTime<Utc>,
    ) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE student_id = $1 AND teacher_id = $2
              AND lesson_type = $3 AND lesson_date = $4
            "#,
        )
        .bind(student_id)
        .bind(teacher_id)
        .bind(lesson_type)
        .bind(lesson_date)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }
}

fn already_exists_response(booking: Booking) -> BookingResponse {
    BookingResponse {
        id: booking.id,
        status: "already_exists".to_string(),
        student_id: booking.student_id,
        teacher_id: booking.teacher_id,
        lesson_type: booking.lesson_type,
        lesson_date: booking.lesson_date,
        meeting_link: booking.meeting_link,
    }
}

fn transition_allowed(current: BookingStatus, next: BookingStatus) -> bool {
    matches!(
        (current, next),
        (BookingStatus::Confirmed, BookingStatus::Completed)
            | (BookingStatus::Confirmed, BookingStatus::Canceled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_confirmed_bookings_can_move() {
        assert!(transition_allowed(BookingStatus::Confirmed, BookingStatus::Completed));
        assert!(transition_allowed(BookingStatus::Confirmed, BookingStatus::Canceled));

        assert!(!transition_allowed(BookingStatus::Completed, BookingStatus::Canceled));
        assert!(!transition_allowed(BookingStatus::Canceled, BookingStatus::Completed));
        assert!(!transition_allowed(BookingStatus::Confirmed, BookingStatus::Confirmed));
    }
}
