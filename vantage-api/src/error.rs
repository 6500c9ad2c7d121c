use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use chrono::Utc;
use serde_json::json;
use vantage_anomaly::AnomalyError;
use vantage_auth::AuthError;
use vantage_ledger::LedgerError;
use vantage_reporting::ReportingError;
use vantage_subscription::SubscriptionError;
use vantage_tenancy::TenancyError;
use vantage_transactions::TransactionServiceError;

/// The canonical failure taxonomy every handler and middleware stage maps
/// into. Each variant carries the human message that goes in the body
/// alongside its stable `error` code.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    BadCredentials,
    AuthRequired,
    Forbidden(String),
    NotFound(String),
    Conflict { code: &'static str, message: String },
    TrialAlreadyUsed,
    QuotaExceeded,
    RateLimited,
    Internal(String),
}

impl ApiError {
    fn code_and_status(&self) -> (&'static str, StatusCode) {
        match self {
            Self::Validation(_) => ("VALIDATION_FAILED", StatusCode::BAD_REQUEST),
            Self::BadCredentials => ("BAD_CREDENTIALS", StatusCode::UNAUTHORIZED),
            Self::AuthRequired => ("AUTH_REQUIRED", StatusCode::UNAUTHORIZED),
            Self::Forbidden(_) => ("FORBIDDEN", StatusCode::FORBIDDEN),
            Self::NotFound(_) => ("NOT_FOUND", StatusCode::NOT_FOUND),
            Self::Conflict { code, .. } => (code, StatusCode::CONFLICT),
            Self::TrialAlreadyUsed => ("TRIAL_ALREADY_USED", StatusCode::BAD_REQUEST),
            Self::QuotaExceeded => ("QUOTA_EXCEEDED", StatusCode::TOO_MANY_REQUESTS),
            Self::RateLimited => ("RATE_LIMITED", StatusCode::TOO_MANY_REQUESTS),
            Self::Internal(_) => ("INTERNAL", StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict { message, .. } => message.clone(),
            Self::BadCredentials => "invalid email or password".to_string(),
            Self::AuthRequired => "authentication is required".to_string(),
            Self::TrialAlreadyUsed => "trial has already been used".to_string(),
            Self::QuotaExceeded => "daily AI-chat quota exceeded".to_string(),
            Self::RateLimited => "too many attempts, try again later".to_string(),
            // Internal failures never leak their detail into the body; it is
            // still logged by the caller before this is constructed.
            Self::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = self.code_and_status();
        let body = json!({
            "error": code,
            "message": self.message(),
            "timestamp": Utc::now(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<TenancyError> for ApiError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::NotFound(message) => Self::NotFound(message),
            TenancyError::Conflict(message) => Self::Conflict {
                code: "CONFLICT",
                message,
            },
            TenancyError::Validation(message) => Self::Validation(message),
            TenancyError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken => Self::Conflict {
                code: "EMAIL_TAKEN",
                message: "an account with this email already exists".to_string(),
            },
            AuthError::WeakPassword => {
                Self::Validation("password does not meet the minimum policy".to_string())
            }
            AuthError::BadCredentials => Self::BadCredentials,
            AuthError::InternalInconsistency(message) => Self::Internal(message),
            AuthError::Tenancy(err) => err.into(),
            AuthError::Token(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(message) => Self::NotFound(message),
            LedgerError::Forbidden(message) => Self::Forbidden(message),
            LedgerError::Validation(message) => Self::Validation(message),
        }
    }
}

impl From<AnomalyError> for ApiError {
    fn from(err: AnomalyError) -> Self {
        match err {
            AnomalyError::NotFound(message) => Self::NotFound(message),
            AnomalyError::Forbidden(message) => Self::Forbidden(message),
        }
    }
}

impl From<TransactionServiceError> for ApiError {
    fn from(err: TransactionServiceError) -> Self {
        match err {
            TransactionServiceError::Ledger(err) => err.into(),
        }
    }
}

impl From<ReportingError> for ApiError {
    fn from(err: ReportingError) -> Self {
        match err {
            ReportingError::Ledger(err) => err.into(),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::TrialAlreadyUsed => Self::TrialAlreadyUsed,
            SubscriptionError::QuotaExceeded => Self::QuotaExceeded,
        }
    }
}
