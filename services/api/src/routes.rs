use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use lingualink_common::ApiResponse;

use crate::handlers;
use crate::middleware::{auth_middleware, require_admin};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/teachers", get(handlers::list_teachers))
        .route("/teachers/:teacher_id", get(handlers::get_teacher))
        .route(
            "/teachers/:teacher_id/reviews",
            get(handlers::list_teacher_reviews),
        );

    let authenticated = Router::new()
        .route("/auth/me", get(handlers::get_current_user))
        .route("/profile", put(handlers::update_profile))
        .route("/bookings/create", post(handlers::create_booking))
        .route("/bookings", get(handlers::list_bookings))
        .route(
            "/bookings/:booking_id/status",
            put(handlers::update_booking_status),
        )
        .route("/reviews", post(handlers::create_review))
        .route("/support/tickets", post(handlers::create_support_ticket))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    // Admin subtree: token check first, then the role gate, both before any
    // handler runs.
    let admin = Router::new()
        .route("/users", get(handlers::admin_list_users))
        .route("/users/:user_id", put(handlers::admin_update_user))
        .route("/users/:user_id", delete(handlers::admin_delete_user))
        .route("/payouts", post(handlers::process_payouts))
        .route("/payouts", get(handlers::list_payouts))
        .route("/transactions", get(handlers::admin_list_transactions))
        .route(
            "/support/tickets",
            get(handlers::admin_list_support_tickets),
        )
        .route("/stats/users", get(handlers::user_stats))
        .route("/stats/teachers", get(handlers::teacher_stats))
        .route("/stats/lessons", get(handlers::lesson_stats))
        .route("/stats/revenue", get(handlers::revenue_stats))
        .route("/stats/support", get(handlers::support_stats))
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .nest("/admin", admin)
        .fallback(handler_404)
        .with_state(state)
}

async fn handler_404() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Endpoint not found".to_string())),
    )
}
