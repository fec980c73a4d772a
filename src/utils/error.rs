use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Health probe request failed: {0}")]
    ProbeError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Provisioning failed for '{service}': {message}")]
    ProvisionError { service: String, message: String },

    #[error("Launch failed for '{service}': {message}")]
    LaunchError { service: String, message: String },

    #[error("'{service}' was not ready at {endpoint} after {waited_ms}ms")]
    ReadinessTimeout {
        service: String,
        endpoint: String,
        waited_ms: u64,
    },

    #[error("'{service}' exited unexpectedly ({status})")]
    ProcessExited { service: String, status: String },
}

pub type Result<T> = std::result::Result<T, StackError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Config,
    Provision,
    Launch,
    Readiness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StackError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StackError::ProbeError(_) => ErrorCategory::Network,
            StackError::IoError(_) => ErrorCategory::Io,
            StackError::SerializationError(_)
            | StackError::ConfigError { .. }
            | StackError::ConfigValidationError { .. }
            | StackError::InvalidConfigValueError { .. }
            | StackError::MissingConfigError { .. } => ErrorCategory::Config,
            StackError::ProvisionError { .. } => ErrorCategory::Provision,
            StackError::LaunchError { .. } | StackError::ProcessExited { .. } => {
                ErrorCategory::Launch
            }
            StackError::ReadinessTimeout { .. } => ErrorCategory::Readiness,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 探測失敗通常是暫時性的，調整超時後重試即可
            StackError::ProbeError(_) | StackError::ReadinessTimeout { .. } => {
                ErrorSeverity::Medium
            }
            StackError::IoError(_) => ErrorSeverity::Critical,
            StackError::SerializationError(_)
            | StackError::ConfigError { .. }
            | StackError::ConfigValidationError { .. }
            | StackError::InvalidConfigValueError { .. }
            | StackError::MissingConfigError { .. } => ErrorSeverity::High,
            StackError::ProvisionError { .. }
            | StackError::LaunchError { .. }
            | StackError::ProcessExited { .. } => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            StackError::ProbeError(_) => {
                "Check that the health endpoint is correct and the service can bind its port"
            }
            StackError::IoError(_) => {
                "Check filesystem permissions and that the configured directories exist"
            }
            StackError::SerializationError(_) => "Check the metrics/summary output settings",
            StackError::ConfigError { .. }
            | StackError::ConfigValidationError { .. }
            | StackError::InvalidConfigValueError { .. }
            | StackError::MissingConfigError { .. } => {
                "Review the configuration file or CLI flags and fix the reported field"
            }
            StackError::ProvisionError { .. } => {
                "Inspect the installer output above; delete the environment directory to force a clean re-provision"
            }
            StackError::LaunchError { .. } => {
                "Check that the service command exists and its working directory is correct"
            }
            StackError::ReadinessTimeout { .. } => {
                "Increase the readiness timeout or check the service logs for startup errors"
            }
            StackError::ProcessExited { .. } => {
                "Run the service command manually inside its environment to see why it exits"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            StackError::ProbeError(e) => format!("Could not reach the health endpoint: {}", e),
            StackError::IoError(e) => format!("Filesystem operation failed: {}", e),
            StackError::SerializationError(e) => format!("Could not serialize output: {}", e),
            StackError::ConfigError { message } => format!("Configuration problem: {}", message),
            StackError::ConfigValidationError { field, message } => {
                format!("Configuration field '{}' is invalid: {}", field, message)
            }
            StackError::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("'{}' is not a valid value for {}: {}", value, field, reason),
            StackError::MissingConfigError { field } => {
                format!("Required configuration field '{}' is missing", field)
            }
            StackError::ProvisionError { service, message } => format!(
                "Could not provision the environment for {}: {}",
                service, message
            ),
            StackError::LaunchError { service, message } => {
                format!("Could not start {}: {}", service, message)
            }
            StackError::ReadinessTimeout {
                service,
                endpoint,
                waited_ms,
            } => format!(
                "{} never became ready at {} (waited {}ms)",
                service, endpoint, waited_ms
            ),
            StackError::ProcessExited { service, status } => {
                format!("{} stopped before becoming ready ({})", service, status)
            }
        }
    }
}
