use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Malformed row {row} in the {month} table: cannot parse day from {value:?}")]
    MalformedRowError {
        month: String,
        row: usize,
        value: String,
    },

    #[error("HTML selector error: {message}")]
    SelectorError { message: String },

    #[error("Rate limit lookup failed: {message}")]
    RateLimitError { message: String },

    #[error("Subscriber lookup failed: {message}")]
    SubscriberError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl NotifierError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            NotifierError::HttpError(_)
            | NotifierError::RateLimitError { .. }
            | NotifierError::SubscriberError { .. } => ErrorCategory::Network,
            NotifierError::MalformedRowError { .. }
            | NotifierError::SelectorError { .. }
            | NotifierError::SerializationError(_) => ErrorCategory::Input,
            NotifierError::ConfigError { .. }
            | NotifierError::ConfigValidationError { .. }
            | NotifierError::InvalidConfigValueError { .. }
            | NotifierError::MissingConfigError { .. } => ErrorCategory::Configuration,
            NotifierError::IoError(_)
            | NotifierError::TaskError(_)
            | NotifierError::Cancelled { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            NotifierError::Cancelled { .. } => ErrorSeverity::Low,
            NotifierError::HttpError(_)
            | NotifierError::RateLimitError { .. }
            | NotifierError::SubscriberError { .. } => ErrorSeverity::Medium,
            NotifierError::MalformedRowError { .. }
            | NotifierError::SelectorError { .. }
            | NotifierError::SerializationError(_)
            | NotifierError::ConfigError { .. }
            | NotifierError::ConfigValidationError { .. }
            | NotifierError::InvalidConfigValueError { .. }
            | NotifierError::MissingConfigError { .. } => ErrorSeverity::High,
            NotifierError::IoError(_) | NotifierError::TaskError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            NotifierError::HttpError(_) => "Check network connectivity and retry later",
            NotifierError::RateLimitError { .. } => {
                "Verify the email provider API key and that the provider is reachable"
            }
            NotifierError::SubscriberError { .. } => "Check that the subscriber list is readable",
            NotifierError::MalformedRowError { .. } => {
                "The release table layout changed; the previous calendar stays in effect"
            }
            NotifierError::SelectorError { .. } => "Fix the CSS selector used for table lookup",
            NotifierError::SerializationError(_) => "Check the JSON input for syntax errors",
            NotifierError::ConfigError { .. }
            | NotifierError::ConfigValidationError { .. }
            | NotifierError::InvalidConfigValueError { .. }
            | NotifierError::MissingConfigError { .. } => {
                "Review the configuration file and fix the reported field"
            }
            NotifierError::IoError(_) => "Check file paths and permissions",
            NotifierError::TaskError(_) => "Inspect the logs for a panicking task",
            NotifierError::Cancelled { .. } => "No action needed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            NotifierError::MalformedRowError { month, .. } => {
                format!("Could not read the {} release table", month)
            }
            NotifierError::RateLimitError { .. } => {
                "Could not read the email provider's rate limits".to_string()
            }
            NotifierError::SubscriberError { .. } => "Could not load subscribers".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_row_is_high_severity_input_error() {
        let err = NotifierError::MalformedRowError {
            month: "June".to_string(),
            row: 4,
            value: "TBA".to_string(),
        };

        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("June"));
        assert!(err.to_string().contains("\"TBA\""));
    }

    #[test]
    fn test_rate_limit_error_is_retryable() {
        let err = NotifierError::RateLimitError {
            message: "missing header".to_string(),
        };

        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(
            err.user_friendly_message(),
            "Could not read the email provider's rate limits"
        );
    }
}
