use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use lingualink_common::{BookingStatus, UserRole, UserStatus};
use lingualink_database::Payout;

// Request/Response DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    pub role: UserRole,

    pub languages: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub languages: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub balance: Decimal,
    pub bio: Option<String>,
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    pub languages: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub bio: Option<String>,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub teacher_id: Uuid,

    #[validate(length(min = 1, max = 100))]
    pub lesson_type: String,

    /// RFC 3339 timestamp for the lesson slot.
    pub lesson_date: String,

    #[validate(range(min = 15, max = 480))]
    pub lesson_duration_minutes: i32,

    pub amount: Decimal,

    pub currency: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub status: String,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub lesson_type: String,
    pub lesson_date: DateTime<Utc>,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutBatchResponse {
    pub processed_count: usize,
    pub payouts: Vec<Payout>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,

    #[validate(range(min = 1, max = 5))]
    pub rating: i32,

    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSupportTicketRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,

    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

// Teacher directory entry with aggregated review data.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TeacherListing {
    pub id: Uuid,
    pub name: String,
    pub languages: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub bio: Option<String>,
    pub average_rating: f64,
    pub review_count: i64,
}

// Stats payloads, one per aggregator.

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users_current: i64,
    pub new_users_previous: i64,
    pub growth_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeacherStats {
    pub total_teachers: i64,
    pub active_teachers: i64,
    pub new_teachers_current: i64,
    pub new_teachers_previous: i64,
    pub growth_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LessonStats {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub lessons_current: i64,
    pub lessons_previous: i64,
    pub growth_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevenueStats {
    pub total_revenue: Decimal,
    pub total_platform_fees: Decimal,
    pub revenue_current: Decimal,
    pub revenue_previous: Decimal,
    pub growth_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupportStats {
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub tickets_current: i64,
    pub tickets_previous: i64,
    pub growth_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_rating_must_be_one_to_five() {
        let mut request = CreateReviewRequest {
            booking_id: Uuid::new_v4(),
            rating: 5,
            comment: None,
        };
        assert!(request.validate().is_ok());

        request.rating = 6;
        assert!(request.validate().is_err());

        request.rating = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn register_request_requires_valid_email() {
        let request = RegisterRequest {
            name: "Ana".to_string(),
            email: "not-an-email".to_string(),
            password: "goodpass1".to_string(),
            role: UserRole::Student,
            languages: None,
            hourly_rate: None,
            bio: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn booking_duration_is_bounded() {
        let request = CreateBookingRequest {
            teacher_id: Uuid::new_v4(),
            lesson_type: "conversation".to_string(),
            lesson_date: "2026-09-01T10:00:00Z".to_string(),
            lesson_duration_minutes: 5,
            amount: Decimal::new(2500, 2),
            currency: None,
            notes: None,
        };
        assert!(request.validate().is_err());
    }
}
