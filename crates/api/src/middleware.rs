use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockflow_core::UserId;

use crate::app::errors;
use crate::context::UserContext;

pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn user_context_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let user_id = extract_user_id(req.headers())?;
    req.extensions_mut().insert(UserContext::new(user_id));
    Ok(next.run(req).await)
}

fn extract_user_id(headers: &HeaderMap) -> Result<UserId, Response> {
    let header = headers.get(USER_ID_HEADER).ok_or_else(|| {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "missing_user",
            format!("{USER_ID_HEADER} header is required"),
        )
    })?;

    header
        .to_str()
        .ok()
        .map(str::trim)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_user",
                format!("{USER_ID_HEADER} must be a UUID"),
            )
        })
}
