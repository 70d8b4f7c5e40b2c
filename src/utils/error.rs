use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connectivity,
    Transfer,
    DegradedStep,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Missing required configuration: {}", fields.join(", "))]
    MissingConfigError { fields: Vec<String> },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration file error: {message}")]
    ConfigFileError { message: String },

    #[error("Source directory not found: {path}")]
    SourceNotFound { path: String },

    #[error("Could not connect to {host}:{port}: {message}")]
    ConnectivityError {
        host: String,
        port: u16,
        message: String,
    },

    #[error("{tool} exited with status {}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    TransferError { tool: String, code: Option<i32> },

    #[error("Failed to start '{program}': {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin download failed: {message}")]
    PluginDownloadError { message: String },

    #[error("Downloaded plugin is not a valid archive: {message}")]
    PluginVerifyError { message: String },

    #[error("Plugin extraction failed: {message}")]
    PluginExtractError { message: String },

    #[error("Plugin upload failed: {message}")]
    PluginUploadError { message: String },

    #[error("Cache purge failed: {message}")]
    CachePurgeError { message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid statistics pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DeployError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigFileError { .. }
            | Self::SourceNotFound { .. } => ErrorCategory::Configuration,
            Self::ConnectivityError { .. } => ErrorCategory::Connectivity,
            Self::TransferError { .. } | Self::CommandSpawn { .. } => ErrorCategory::Transfer,
            Self::PluginDownloadError { .. }
            | Self::PluginVerifyError { .. }
            | Self::PluginExtractError { .. }
            | Self::PluginUploadError { .. }
            | Self::CachePurgeError { .. } => ErrorCategory::DegradedStep,
            Self::ZipError(_)
            | Self::HttpError(_)
            | Self::IoError(_)
            | Self::PatternError(_)
            | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::DegradedStep => ErrorSeverity::Low,
            ErrorCategory::Connectivity => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Transfer => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for an error that reaches `main`.
    pub fn exit_code(&self) -> i32 {
        1
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingConfigError { fields } => format!(
                "Set the following environment variables (or add them to the config file): {}",
                fields.join(", ")
            ),
            Self::InvalidConfigValueError { field, .. } => {
                format!("Check the value configured for {}", field)
            }
            Self::ConfigFileError { .. } => {
                "Make sure the config file exists and is valid TOML".to_string()
            }
            Self::SourceNotFound { .. } => {
                "Point SOURCE_PATH at an existing directory relative to the working directory"
                    .to_string()
            }
            Self::ConnectivityError { .. } => {
                "Verify KINSTA_HOST_IP, KINSTA_PORT and the SFTP credentials in the MyKinsta dashboard"
                    .to_string()
            }
            Self::TransferError { tool, .. } => {
                format!("Inspect the {} output above; re-run with VERBOSE=true for details", tool)
            }
            Self::CommandSpawn { program, .. } => {
                format!("Install '{}' and make sure it is on PATH", program)
            }
            Self::PluginDownloadError { .. } | Self::PluginVerifyError { .. } => {
                "Check KINSTA_MU_PLUGIN_URL or set INSTALL_KINSTA_MU_PLUGIN=false".to_string()
            }
            Self::PluginExtractError { .. } | Self::ZipError(_) => {
                "The plugin archive may be corrupted; try again later".to_string()
            }
            Self::PluginUploadError { .. } => {
                "Check that KINSTA_MU_PLUGIN_PATH exists and is writable on the server".to_string()
            }
            Self::CachePurgeError { .. } => {
                "Purge the cache manually from the MyKinsta dashboard".to_string()
            }
            Self::HttpError(_) => "Check network access from the runner".to_string(),
            Self::IoError(_) => "Check file permissions and free disk space".to_string(),
            Self::PatternError(_) | Self::SerializationError(_) => {
                "This is a bug; please report it".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Connectivity => format!("Cannot reach the server: {}", self),
            ErrorCategory::Transfer => format!("Deployment failed: {}", self),
            ErrorCategory::DegradedStep => format!("Optional step failed: {}", self),
            ErrorCategory::System => format!("Unexpected error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_every_field() {
        let err = DeployError::MissingConfigError {
            fields: vec!["KINSTA_HOST_IP".to_string(), "TARGET_PATH".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required configuration: KINSTA_HOST_IP, TARGET_PATH"
        );
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_transfer_error_message() {
        let err = DeployError::TransferError {
            tool: "rsync".to_string(),
            code: Some(23),
        };
        assert_eq!(err.to_string(), "rsync exited with status 23");

        let killed = DeployError::TransferError {
            tool: "lftp".to_string(),
            code: None,
        };
        assert_eq!(killed.to_string(), "lftp exited with status signal");
    }

    #[test]
    fn test_plugin_errors_are_low_severity() {
        let err = DeployError::PluginVerifyError {
            message: "text/html".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::DegradedStep);
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }
}
