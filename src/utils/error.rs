use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid provisioning parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(#[from] reqwest::Error),

    #[error("Provider rejected the request: {message}")]
    ProviderRejected {
        message: String,
        code: Option<String>,
    },

    #[error("Unexpected provider response: {message}")]
    InvalidProviderResponse { message: String },

    #[error("Service instance {instance_id} does not exist")]
    InstanceNotFound { instance_id: String },

    #[error("Service instance {instance_id} already exists with different attributes")]
    InstanceConflict { instance_id: String },

    #[error("Another operation for service instance {instance_id} is in progress")]
    OperationInProgress { instance_id: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unsupported broker API version: {version}")]
    UnsupportedApiVersion { version: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BrokerError {
    /// 回傳給平台的錯誤代碼
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParameters { .. } => "InvalidParameters",
            Self::ProviderUnreachable(_) => "ProviderUnreachable",
            Self::ProviderRejected { .. } => "ProviderRejected",
            Self::InvalidProviderResponse { .. } => "InvalidProviderResponse",
            Self::InstanceNotFound { .. } => "InstanceNotFound",
            Self::InstanceConflict { .. } => "InstanceConflict",
            Self::OperationInProgress { .. } => "ConcurrencyError",
            Self::Unauthorized => "Unauthorized",
            Self::UnsupportedApiVersion { .. } => "PreconditionFailed",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "ConfigurationError",
            Self::Internal { .. } | Self::IoError(_) | Self::SerializationError(_) => {
                "InternalError"
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParameters { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UnsupportedApiVersion { .. } => StatusCode::PRECONDITION_FAILED,
            Self::InstanceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InstanceConflict { .. } => StatusCode::CONFLICT,
            Self::OperationInProgress { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ProviderRejected { .. } | Self::InvalidProviderResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::ProviderUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::Internal { .. }
            | Self::IoError(_)
            | Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            BrokerError::invalid_parameters("name is empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BrokerError::InstanceNotFound {
                instance_id: "i-1".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BrokerError::InstanceConflict {
                instance_id: "i-1".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BrokerError::ProviderRejected {
                message: "duplicate".into(),
                code: None
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(BrokerError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_concurrent_operation_uses_protocol_error_code() {
        let err = BrokerError::OperationInProgress {
            instance_id: "i-1".into(),
        };
        assert_eq!(err.error_code(), "ConcurrencyError");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
