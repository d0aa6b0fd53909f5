use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};

use lingualink_auth::{extract::bearer_token, Claims};
use lingualink_common::{ApiResponse, UserRole};

use crate::AppState;

// Authentication middleware: validates the bearer token and stores the
// claims in request extensions for handlers and downstream guards.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let token = bearer_token(&headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error(
                "Missing or invalid authorization header".to_string(),
            )),
        )
    })?;

    let claims = state.jwt_service.validate_token(token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid or expired token".to_string())),
        )
    })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

// Admin guard for the /admin subtree. Runs after auth_middleware; rejects
// before any handler or database work happens.
pub async fn require_admin(
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    match request.extensions().get::<Claims>() {
        Some(claims) if claims.role == UserRole::Admin => Ok(next.run(request).await),
        Some(_) => Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required".to_string())),
        )),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Authentication required".to_string())),
        )),
    }
}
