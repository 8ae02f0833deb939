use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    MissingCredential,
    IdentityNotResolved,
    AddressNotBound,
    EmptySelection,
    InvalidConfig,
    Signer,
    Transport,
    Timeout,
    RateLimited,
    Authentication,
    HttpStatus,
    Protocol,
    Business,
}

/// Single classified outcome of a failed remote operation.
///
/// `code` and `message` carry the backend envelope values verbatim for
/// [`ApiErrorKind::Business`] errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub retryable: bool,
    pub operation: Option<String>,
    pub code: Option<i64>,
    pub http_status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                ApiErrorKind::Transport | ApiErrorKind::Timeout | ApiErrorKind::RateLimited
            ),
            operation: None,
            code: None,
            http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Local failures raised before anything is put on the wire.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::MissingCredential
                | ApiErrorKind::IdentityNotResolved
                | ApiErrorKind::AddressNotBound
                | ApiErrorKind::EmptySelection
        )
    }

    pub fn is_business(&self) -> bool {
        self.kind == ApiErrorKind::Business
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.operation, self.code) {
            (Some(operation), Some(code)) => {
                write!(f, "{} (operation={}, code={})", self.message, operation, code)
            }
            (Some(operation), None) => write!(f, "{} (operation={})", self.message, operation),
            (None, Some(code)) => write!(f, "{} (code={})", self.message, code),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

pub fn missing_credential(message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorKind::MissingCredential, message).with_retryable(false)
}

pub fn identity_not_resolved() -> ApiError {
    ApiError::new(
        ApiErrorKind::IdentityNotResolved,
        "identity is not resolved; call user_detail first",
    )
    .with_retryable(false)
}

pub fn address_not_bound() -> ApiError {
    ApiError::new(
        ApiErrorKind::AddressNotBound,
        "no delivery address is bound; call set_address first",
    )
    .with_retryable(false)
}

pub fn empty_selection(message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorKind::EmptySelection, message).with_retryable(false)
}

pub fn invalid_config(message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorKind::InvalidConfig, message).with_retryable(false)
}

pub fn protocol_error(message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorKind::Protocol, message).with_retryable(false)
}

pub fn signer_error(message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorKind::Signer, message).with_retryable(false)
}

pub fn business_error(code: i64, message: impl Into<String>) -> ApiError {
    ApiError::new(ApiErrorKind::Business, message)
        .with_code(code)
        .with_retryable(false)
}

/// Classifies a non-2xx HTTP status before any envelope decoding.
pub fn map_http_error(status: u16, body: &str) -> ApiError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = if status == 401 || status == 403 {
        ApiError::new(
            ApiErrorKind::Authentication,
            format!("backend rejected credentials with status {}", status),
        )
        .with_retryable(false)
    } else if status == 408 || status == 429 {
        ApiError::new(
            ApiErrorKind::RateLimited,
            format!("backend returned status {}", status),
        )
        .with_retryable(true)
    } else if (400..500).contains(&status) {
        ApiError::new(
            ApiErrorKind::HttpStatus,
            format!("backend returned status {}", status),
        )
        .with_retryable(false)
    } else {
        ApiError::new(
            ApiErrorKind::HttpStatus,
            format!("backend returned status {}", status),
        )
        .with_retryable(true)
    };

    err = err.with_http_status(status);
    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }

    err
}
