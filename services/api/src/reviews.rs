use sqlx::PgPool;
use uuid::Uuid;

use lingualink_common::{AppError, BookingStatus};
use lingualink_database::{Booking, Review};

use crate::models::CreateReviewRequest;

#[derive(Clone)]
pub struct ReviewService {
    db_pool: PgPool,
}

impl ReviewService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// One review per completed lesson, written by the student who took it.
    pub async fn create_review(
        &self,
        student_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(request.booking_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.student_id != student_id {
            return Err(AppError::Authorization(
                "Only the student of this lesson can review it".to_string(),
            ));
        }

        if booking.status != BookingStatus::Completed.as_str() {
            return Err(AppError::Validation(
                "Only completed lessons can be reviewed".to_string(),
            ));
        }

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE booking_id = $1")
                .bind(request.booking_id)
                .fetch_one(&self.db_pool)
                .await
                .map_err(AppError::Database)?;

        if existing > 0 {
            return Err(AppError::Conflict(
                "This lesson has already been reviewed".to_string(),
            ));
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, booking_id, teacher_id, student_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.id)
        .bind(booking.teacher_id)
        .bind(student_id)
        .bind(request.rating)
        .bind(&request.comment)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(
            "Review {} created for teacher {} (rating {})",
            review.id,
            review.teacher_id,
            review.rating
        );

        Ok(review)
    }

    pub async fn list_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<Review>, AppError> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE teacher_id = $1 ORDER BY created_at DESC",
        )
        .bind(teacher_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }
}
