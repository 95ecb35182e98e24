use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use habify_db::LedgerError;
use habify_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("Not enough coins: balance {balance}, price {price}")]
    InsufficientFunds { balance: i64, price: i64 },

    /// Details are logged, never sent to the client.
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationRequired | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientFunds { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<LedgerError>() {
            Ok(LedgerError::UnknownUser) => Self::NotFound("User not found".into()),
            Ok(LedgerError::InsufficientFunds { balance, price }) => {
                Self::InsufficientFunds { balance, price }
            }
            Err(err) => Self::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("request failed: {:#}", err);
        }
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_client_errors() {
        let err = ApiError::from(anyhow::Error::from(LedgerError::InsufficientFunds {
            balance: 10,
            price: 350,
        }));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ApiError::from(anyhow::Error::from(LedgerError::UnknownUser));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_failures_are_internal() {
        let err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }
}
