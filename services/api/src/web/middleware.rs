//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::web::state::AppState;

/// Middleware that gates routes behind the repository's authenticated flag.
///
/// The application has a single shared-secret surface: one flag, set by a
/// successful login and cleared by logout. There are no per-user tokens and
/// nothing expires.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.repo.is_authenticated().await {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
