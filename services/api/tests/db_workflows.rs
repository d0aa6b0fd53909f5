use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use lingualink_api::bookings::BookingService;
use lingualink_api::models::CreateBookingRequest;
use lingualink_api::payouts::PayoutService;
use lingualink_common::{AppError, BookingStatus};
use lingualink_database::run_migrations;

async fn insert_user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, status) VALUES ($1, $2, $3, $4, $5, 'active')",
    )
    .bind(id)
    .bind("Test User")
    .bind(format!("{}@example.com", id))
    .bind("hash")
    .bind(role)
    .execute(pool)
    .await
    .expect("Failed to insert user");
    id
}

fn booking_request(teacher_id: Uuid, lesson_date: &str) -> CreateBookingRequest {
    CreateBookingRequest {
        teacher_id,
        lesson_type: "conversation".to_string(),
        lesson_date: lesson_date.to_string(),
        lesson_duration_minutes: 60,
        amount: Decimal::new(2500, 2),
        currency: None,
        notes: None,
    }
}

async fn balance_of(pool: &PgPool, user_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

#[tokio::test]
async fn booking_and_payout_workflows() {
    // Skip test if no database is available
    if std::env::var("DATABASE_URL").is_err() {
        println!("Skipping database test - DATABASE_URL not set");
        return;
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&std::env::var("DATABASE_URL").unwrap())
        .await
        .expect("Failed to connect to test database");

    run_migrations(&pool).await.expect("Failed to run migrations");

    sqlx::query("TRUNCATE users, bookings, payouts, transactions, reviews, support_tickets CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to reset test database");

    let fee_rate = Decimal::new(20, 2); // 20%
    let bookings = BookingService::new(pool.clone(), fee_rate);
    let payouts = PayoutService::new(pool.clone(), "Bank Transfer".to_string());

    let student = insert_user(&pool, "student").await;
    let teacher = insert_user(&pool, "teacher").await;

    // Resubmitting an identical booking returns the original row untouched.
    let first = bookings
        .create_booking(student, booking_request(teacher, "2026-09-01T10:00:00Z"))
        .await
        .expect("Failed to create booking");
    assert_eq!(first.status, "confirmed");

    let second = bookings
        .create_booking(student, booking_request(teacher, "2026-09-01T10:00:00Z"))
        .await
        .expect("Duplicate booking should not error");
    assert_eq!(second.status, "already_exists");
    assert_eq!(second.id, first.id);

    let row_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM bookings WHERE student_id = $1 AND teacher_id = $2",
    )
    .bind(student)
    .bind(teacher)
    .fetch_one(&pool)
    .await
    .expect("Failed to count bookings");
    assert_eq!(row_count, 1);

    // Completing the lesson records the transaction and credits the teacher.
    bookings
        .update_status(teacher, first.id, BookingStatus::Completed)
        .await
        .expect("Teacher should be able to complete the lesson");

    let (platform_fee, teacher_earnings): (Decimal, Decimal) = sqlx::query_as(
        "SELECT platform_fee, teacher_earnings FROM transactions WHERE teacher_id = $1",
    )
    .bind(teacher)
    .fetch_one(&pool)
    .await
    .expect("Completion should record a transaction");
    assert_eq!(platform_fee, Decimal::new(500, 2));
    assert_eq!(teacher_earnings, Decimal::new(2000, 2));
    assert_eq!(balance_of(&pool, teacher).await, Decimal::new(2000, 2));

    // Completed lessons are final.
    let err = bookings
        .update_status(student, first.id, BookingStatus::Canceled)
        .await
        .expect_err("Completed bookings cannot be canceled");
    assert!(matches!(err, AppError::Validation(_)));

    // A canceled lesson can never be completed and credited.
    let canceled = bookings
        .create_booking(student, booking_request(teacher, "2026-09-02T10:00:00Z"))
        .await
        .expect("Failed to create second booking");
    bookings
        .update_status(student, canceled.id, BookingStatus::Canceled)
        .await
        .expect("Student should be able to cancel");

    let err = bookings
        .update_status(teacher, canceled.id, BookingStatus::Completed)
        .await
        .expect_err("Canceled bookings cannot be completed");
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(balance_of(&pool, teacher).await, Decimal::new(2000, 2));

    let status: String = sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
        .bind(canceled.id)
        .fetch_one(&pool)
        .await
        .expect("Failed to read booking status");
    assert_eq!(status, "canceled");

    // Payout batch: one payout per positive balance, every balance zeroed.
    let teacher_with_balance = insert_user(&pool, "teacher").await;
    sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
        .bind(teacher_with_balance)
        .bind(Decimal::new(6000, 2))
        .execute(&pool)
        .await
        .expect("Failed to seed balance");
    let teacher_without_balance = insert_user(&pool, "teacher").await;

    let batch = payouts.run_payout_batch().await.expect("Payout batch failed");
    assert_eq!(batch.processed_count, 2);

    for (id, expected) in [
        (teacher, Decimal::new(2000, 2)),
        (teacher_with_balance, Decimal::new(6000, 2)),
    ] {
        let amount: Decimal =
            sqlx::query_scalar("SELECT amount FROM payouts WHERE teacher_id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await
                .expect("Expected exactly one payout per teacher");
        assert_eq!(amount, expected);
        assert_eq!(balance_of(&pool, id).await, Decimal::ZERO);
    }

    let untouched: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payouts WHERE teacher_id = $1")
            .bind(teacher_without_balance)
            .fetch_one(&pool)
            .await
            .expect("Failed to count payouts");
    assert_eq!(untouched, 0);

    // Re-running the batch is a no-op once every balance is settled.
    let rerun = payouts.run_payout_batch().await.expect("Payout rerun failed");
    assert_eq!(rerun.processed_count, 0);
}
