use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    /// Comma-joined list of languages taught or learned.
    pub languages: Option<String>,
    pub hourly_rate: Option<Decimal>,
    /// Accumulated teacher earnings awaiting payout.
    pub balance: Decimal,
    pub bio: Option<String>,
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub lesson_type: String,
    pub lesson_date: DateTime<Utc>,
    pub lesson_duration_minutes: i32,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub notes: Option<String>,
    /// Copied from the teacher's default at creation time.
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub teacher_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: String,
    pub status: String,
    pub platform_fee: Decimal,
    pub teacher_earnings: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
