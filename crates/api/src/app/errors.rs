use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde_json::json;

use stockflow_core::AggregateId;
use stockflow_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DispatchError::AlreadyExists(msg) => json_error(StatusCode::CONFLICT, "already_exists", msg),
        DispatchError::InsufficientStock(msg) => json_error(StatusCode::CONFLICT, "insufficient_stock", msg),
        DispatchError::InvalidRelease(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_release", msg),
        e @ DispatchError::InvalidTransition { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", e.to_string())
        }
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "invariant_violation", msg)
        }
        DispatchError::Concurrency(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "conflict", msg),
        DispatchError::LockTimeout(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "lock_timeout", msg),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e:?}"),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
        DispatchError::CatalogUnavailable(msg) => json_error(StatusCode::BAD_GATEWAY, "catalog_unavailable", msg),
        e @ DispatchError::CompensationFailed { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "compensation_failed", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_id(s: &str, what: &str) -> Result<AggregateId, axum::response::Response> {
    s.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

/// Parse an optional RFC 3339 query bound.
pub fn parse_timestamp(
    value: Option<&str>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, axum::response::Response> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| {
                    json_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_timestamp",
                        format!("{name} must be an RFC 3339 timestamp"),
                    )
                })
        })
        .transpose()
}

/// Parse a lowercase enum value such as a status or priority.
pub fn parse_enum<T: core::str::FromStr>(
    value: &str,
    code: &'static str,
    allowed: &str,
) -> Result<T, axum::response::Response> {
    value
        .to_lowercase()
        .parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, code, format!("must be one of: {allowed}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_infra::event_store::EventStoreError;

    #[test]
    fn domain_failures_map_to_client_errors() {
        let cases = [
            (DispatchError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DispatchError::AlreadyExists("x".into()), StatusCode::CONFLICT),
            (DispatchError::InsufficientStock("x".into()), StatusCode::CONFLICT),
            (DispatchError::InvalidRelease("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                DispatchError::InvalidTransition {
                    from: "draft".into(),
                    to: "shipped".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DispatchError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DispatchError::LockTimeout("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                DispatchError::CompensationFailed {
                    cause: Box::new(DispatchError::Store(EventStoreError::Unavailable("down".into()))),
                    unreverted: "p1:+5".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(dispatch_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn timestamps_must_be_rfc3339() {
        assert_eq!(parse_timestamp(None, "from").unwrap(), None);
        let t = parse_timestamp(Some("2025-06-10T09:00:00+02:00"), "from").unwrap().unwrap();
        assert_eq!(t.to_rfc3339(), "2025-06-10T07:00:00+00:00");
        assert!(parse_timestamp(Some("yesterday"), "from").is_err());
    }
}
