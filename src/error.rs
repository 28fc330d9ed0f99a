use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use sea_orm::DbErr;
#[cfg(any(feature = "sqlite", feature = "pg"))]
use sea_orm::RuntimeErr;
#[cfg(any(feature = "sqlite", feature = "pg"))]
use sea_orm::sqlx;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{reason}: {details}")]
    Validation { reason: &'static str, details: String },

    #[error("Invalid status: {details}")]
    InvalidArgument { details: String },

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("Insufficient quantity: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    /// A transaction could not be rolled back. The store may hold a partial effect.
    #[error("Inconsistent store state: {details}")]
    ConsistencyFailure { details: String },

    #[error("Database is unavailable")]
    StoreUnavailable(#[source] DbErr),

    #[error("Database error")]
    Store(#[source] DbErr),

    #[error("Prediction service failure: {details}")]
    Upstream { details: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn validation<S: ToString>(reason: &'static str, details: S) -> Self {
        Self::Validation {
            reason,
            details: details.to_string(),
        }
    }

    pub fn missing_fields<S: ToString>(details: S) -> Self {
        Self::validation("Missing required fields", details)
    }

    pub fn not_found<S: ToString>(what: &'static str, key: S) -> Self {
        Self::NotFound {
            what,
            key: key.to_string(),
        }
    }

    pub fn config<S: ToString>(details: S) -> Self {
        Self::Config {
            details: details.to_string(),
        }
    }

    /// Machine-readable error category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::NotFound { .. } => "not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::ConsistencyFailure { .. } => "consistency_failure",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Store(_) => "store_error",
            Self::Upstream { .. } => "upstream",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidArgument { .. } | Self::InsufficientStock { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::ConsistencyFailure { .. } | Self::Store(_) | Self::Config { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Short title and the human-readable part of the response body. Never includes driver messages.
    fn title_and_details(&self) -> (String, String) {
        match self {
            Self::Validation { reason, details } => (reason.to_string(), details.clone()),
            Self::InvalidArgument { details } => ("Invalid status".into(), details.clone()),
            Self::NotFound { what, key } => (
                format!("{what} not found"),
                format!("No {} found with {key}", what.to_lowercase()),
            ),
            Self::InsufficientStock { available, requested } => (
                "Insufficient quantity".into(),
                format!("Available quantity ({available}) is less than requested ({requested})"),
            ),
            Self::ConsistencyFailure { .. } => (
                "Inconsistent state".into(),
                "The operation could not be completed or rolled back".into(),
            ),
            Self::StoreUnavailable(_) => (
                "Database connection error".into(),
                "Unable to connect to database".into(),
            ),
            Self::Store(_) => ("Database error".into(), "The operation failed on the database side".into()),
            Self::Upstream { .. } => (
                "Prediction service error".into(),
                "The prediction service failed to process the request".into(),
            ),
            Self::Config { details } => ("Configuration error".into(), details.clone()),
            Self::Io(_) => ("Internal error".into(), "The operation failed".into()),
        }
    }
}

/// True if `err` means the store could not be reached or the connection was lost, as opposed to a failed statement.
pub fn is_connection_loss(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        #[cfg(any(feature = "sqlite", feature = "pg"))]
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => matches!(
            e,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
        ),
        _ => false,
    }
}

impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        if is_connection_loss(&err) {
            Self::StoreUnavailable(err)
        }
        else {
            Self::Store(err)
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code:    &'static str,
    pub error:   String,
    pub details: String,
}

impl From<&LedgerError> for ErrorBody {
    fn from(err: &LedgerError) -> Self {
        let (error, details) = err.title_and_details();
        Self {
            code: err.code(),
            error,
            details,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            match &self {
                Self::Store(e) | Self::StoreUnavailable(e) => error!(code = self.code(), "{self}: {e}"),
                _ => error!(code = self.code(), "{self}"),
            }
        }

        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
