use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing environment variable '{name}'")]
    MissingEnvError { name: String },

    #[error("GIS query failed: {message}")]
    GisError { message: String },

    #[error("Pricing data error: {message}")]
    PricingError { message: String },

    #[error("Chart rendering failed: {message}")]
    ChartError { message: String },

    #[error("Email auth failed: {message}")]
    AuthError { message: String },

    #[error("Email send failed: {message}")]
    MailError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Rendering,
    Delivery,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TrackerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::GisError { .. } | Self::PricingError { .. } => {
                ErrorCategory::Network
            }
            Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingEnvError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::YamlError(_)
            | Self::ProcessingError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Data,
            Self::ChartError { .. } => ErrorCategory::Rendering,
            Self::AuthError { .. } | Self::MailError { .. } => ErrorCategory::Delivery,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路抖動通常重跑即可
            Self::ApiError(_) | Self::GisError { .. } | Self::PricingError { .. } => {
                ErrorSeverity::Medium
            }
            Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingEnvError { .. } => ErrorSeverity::High,
            Self::AuthError { .. } | Self::MailError { .. } => ErrorSeverity::High,
            Self::CsvError(_)
            | Self::ProcessingError { .. }
            | Self::ValidationError { .. }
            | Self::ChartError { .. } => ErrorSeverity::High,
            Self::SerializationError(_) | Self::YamlError(_) => ErrorSeverity::High,
            Self::IoError(_) | Self::ZipError(_) => ErrorSeverity::Critical,
        }
    }

    /// 給 CLI 使用者的修復建議
    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ApiError(_) => {
                "Check network connectivity and endpoint availability, then retry".to_string()
            }
            Self::GisError { .. } => {
                "Verify the county GIS endpoint URL and field names in config.yaml".to_string()
            }
            Self::PricingError { .. } => {
                "Verify the pricing endpoint and ticker symbols; prices may be unavailable for the requested dates"
                    .to_string()
            }
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' entry in config.yaml", field)
            }
            Self::MissingConfigError { field } => {
                format!("Add the '{}' entry to config.yaml", field)
            }
            Self::MissingEnvError { name } => {
                format!(
                    "Export {} (set it as a repository secret for scheduled runs)",
                    name
                )
            }
            Self::AuthError { .. } => {
                "Check GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET / GOOGLE_REFRESH_TOKEN; the refresh token may have been revoked"
                    .to_string()
            }
            Self::MailError { .. } => {
                "Inspect the send response body; the message may exceed size limits".to_string()
            }
            Self::CsvError(_) => "Check the securities master CSV for malformed rows".to_string(),
            Self::YamlError(_) => "Make sure config.yaml is valid YAML".to_string(),
            Self::ChartError { .. } => {
                "Check chart series configuration and snapshot history".to_string()
            }
            Self::IoError(_) | Self::ZipError(_) => {
                "Check disk space and directory permissions for snapshots/ and output/".to_string()
            }
            _ => "Re-run with --verbose for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::Rendering => format!("Rendering problem: {}", self),
            ErrorCategory::Delivery => format!("Delivery problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }
}
