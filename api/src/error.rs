use antisoup_shared::{ErrorBody, RuleError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Rule(RuleError::QuotaExhausted { .. }) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Rule(RuleError::ForbiddenTransition { .. } | RuleError::CommentSettled(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Rule(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Db(_) | AppError::Pool(_) | AppError::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antisoup_shared::BattleStatus;

    #[test]
    fn rule_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::from(RuleError::QuotaExhausted { limit: 2 }).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::from(RuleError::ForbiddenTransition {
                action: "pin",
                status: BattleStatus::Pending
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(RuleError::Empty { field: "topic" }).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = AppError::Db(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
