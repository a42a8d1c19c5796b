use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub code: &'static str,
}

/// Map domain errors to HTTP responses. This is the single place where
/// the error taxonomy turns into a wire format.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match err {
        AppError::BadRequest(_) => "INVALID_REQUEST",
        AppError::EmptyMessage => "EMPTY_MESSAGE",
        AppError::Unauthorized => "INVALID_CREDENTIALS",
        AppError::Forbidden => "ACCESS_DENIED",
        AppError::NotFound => "NOT_FOUND",
        AppError::NotAssignedYet => "NOT_ASSIGNED_YET",
        AppError::Database(_) => "DATABASE_ERROR",
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            "INTERNAL_SERVER_ERROR"
        }
    };

    let response = ErrorResponse {
        error: status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string(),
        message: err.to_string(),
        status: status.as_u16(),
        code,
    };

    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_assigned_yet_keeps_distinct_code() {
        let (status, body) = map_error(&AppError::NotAssignedYet);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_ASSIGNED_YET");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let (status, body) = map_error(&AppError::Forbidden);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "ACCESS_DENIED");
    }

    #[test]
    fn database_errors_stay_internal() {
        let (status, _) = map_error(&AppError::Database(sqlx::Error::RowNotFound));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
