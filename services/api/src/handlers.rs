use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use lingualink_auth::Claims;
use lingualink_common::{ApiResponse, AppError, UserRole, UserStatus};
use lingualink_database::{Booking, Payout, Review, SupportTicket, Transaction};

use crate::models::*;
use crate::AppState;

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);

fn error_response(err: AppError) -> ErrorResponse {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    // Database and internal failures are logged with context and surfaced
    // as generic 500s so schema details never leak to clients.
    let message = match &err {
        AppError::Database(db_err) => {
            tracing::error!("Database error: {:?}", db_err);
            "Internal server error".to_string()
        }
        AppError::Internal(msg) => {
            tracing::error!("Internal error: {}", msg);
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ApiResponse::error(message)))
}

fn validation_error(errors: validator::ValidationErrors) -> ErrorResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(format!("Validation error: {:?}", errors))),
    )
}

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Lingualink API is healthy".to_string()))
}

// Authentication

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ErrorResponse> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let response = state
        .user_service
        .register_user(request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ErrorResponse> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let response = state
        .user_service
        .login_user(request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(response)))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<UserInfo>>, ErrorResponse> {
    let user_id = claims.user_id().map_err(error_response)?;

    let user = state
        .user_service
        .get_user_by_id(user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(user)))
}

// Profile

pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ErrorResponse> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let user_id = claims.user_id().map_err(error_response)?;

    let user = state
        .user_service
        .update_profile(user_id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(user)))
}

// Teacher directory

pub async fn list_teachers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TeacherListing>>>, ErrorResponse> {
    let teachers = state
        .user_service
        .list_teachers()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(teachers)))
}

pub async fn get_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TeacherListing>>, ErrorResponse> {
    let teacher = state
        .user_service
        .get_teacher(teacher_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(teacher)))
}

pub async fn list_teacher_reviews(
    State(state): State<AppState>,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Review>>>, ErrorResponse> {
    let reviews = state
        .review_service
        .list_for_teacher(teacher_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(reviews)))
}

// Bookings

pub async fn create_booking(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, ErrorResponse> {
    if claims.role != UserRole::Student {
        return Err(error_response(AppError::Authorization(
            "Only students can book lessons".to_string(),
        )));
    }

    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let student_id = claims.user_id().map_err(error_response)?;

    let booking = state
        .booking_service
        .create_booking(student_id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(booking)))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<Vec<Booking>>>, ErrorResponse> {
    let user_id = claims.user_id().map_err(error_response)?;

    let bookings = state
        .booking_service
        .list_for_user(user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(bookings)))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    claims: Claims,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<ApiResponse<Booking>>, ErrorResponse> {
    let caller_id = claims.user_id().map_err(error_response)?;

    let booking = state
        .booking_service
        .update_status(caller_id, booking_id, request.status)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(booking)))
}

// Reviews

pub async fn create_review(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<Review>>, ErrorResponse> {
    if claims.role != UserRole::Student {
        return Err(error_response(AppError::Authorization(
            "Only students can review lessons".to_string(),
        )));
    }

    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let student_id = claims.user_id().map_err(error_response)?;

    let review = state
        .review_service
        .create_review(student_id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(review)))
}

// Support

pub async fn create_support_ticket(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateSupportTicketRequest>,
) -> Result<Json<ApiResponse<SupportTicket>>, ErrorResponse> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let user_id = claims.user_id().map_err(error_response)?;

    let ticket = state
        .support_service
        .create_ticket(user_id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(ticket)))
}

// Admin: user management

#[derive(Debug, Deserialize)]
pub struct AdminUsersQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn admin_list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminUsersQuery>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ErrorResponse> {
    let role = match &query.role {
        Some(value) => Some(UserRole::parse(value).ok_or_else(|| {
            error_response(AppError::Validation(format!("Invalid role: {}", value)))
        })?),
        None => None,
    };
    let status = match &query.status {
        Some(value) => Some(UserStatus::parse(value).ok_or_else(|| {
            error_response(AppError::Validation(format!("Invalid status: {}", value)))
        })?),
        None => None,
    };

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);

    let users = state
        .user_service
        .admin_list_users(role, status, page, limit)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(users)))
}

pub async fn admin_update_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ErrorResponse> {
    let admin_id = claims.user_id().map_err(error_response)?;

    let user = state
        .user_service
        .admin_update_user(admin_id, user_id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(user)))
}

pub async fn admin_delete_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<String>>, ErrorResponse> {
    let admin_id = claims.user_id().map_err(error_response)?;

    state
        .user_service
        .admin_delete_user(admin_id, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success("User deleted".to_string())))
}

// Admin: payouts and transactions

pub async fn process_payouts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PayoutBatchResponse>>, ErrorResponse> {
    let result = state
        .payout_service
        .run_payout_batch()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(result)))
}

pub async fn list_payouts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Payout>>>, ErrorResponse> {
    let payouts = state
        .payout_service
        .list_payouts()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(payouts)))
}

pub async fn admin_list_transactions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, ErrorResponse> {
    let transactions = state
        .transaction_service
        .list_transactions()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(transactions)))
}

pub async fn admin_list_support_tickets(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SupportTicket>>>, ErrorResponse> {
    let tickets = state
        .support_service
        .list_tickets()
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(tickets)))
}

// Admin: stats

pub async fn user_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserStats>>, ErrorResponse> {
    let stats = state.stats_service.user_stats().await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn teacher_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TeacherStats>>, ErrorResponse> {
    let stats = state
        .stats_service
        .teacher_stats()
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn lesson_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<LessonStats>>, ErrorResponse> {
    let stats = state
        .stats_service
        .lesson_stats()
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn revenue_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RevenueStats>>, ErrorResponse> {
    let stats = state
        .stats_service
        .revenue_stats()
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn support_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SupportStats>>, ErrorResponse> {
    let stats = state
        .stats_service
        .support_stats()
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(stats)))
}
