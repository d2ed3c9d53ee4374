use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage read error for key '{key}': {message}")]
    StorageReadError { key: String, message: String },

    #[error("Storage write error for key '{key}': {message}")]
    StorageWriteError { key: String, message: String },

    #[error("Storage quota exceeded for key '{key}': {required} bytes needed, {quota} allowed")]
    QuotaExceededError {
        key: String,
        required: usize,
        quota: usize,
    },

    #[error("Import parse error: {message}")]
    ImportParseError { message: String },

    #[error("Import format error: {message}")]
    ImportFormatError {
        index: Option<usize>,
        message: String,
    },

    #[error("Import read error for '{source_name}': {message}")]
    ImportReadError {
        source_name: String,
        message: String,
    },

    #[error("Validation error on '{field}': {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Configuration error on '{field}': {message}")]
    ConfigError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Storage,
    Import,
    Validation,
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

impl DirectoryError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn format(index: Option<usize>, message: impl Into<String>) -> Self {
        Self::ImportFormatError {
            index,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StorageReadError { .. }
            | Self::StorageWriteError { .. }
            | Self::QuotaExceededError { .. } => ErrorCategory::Storage,
            Self::ImportParseError { .. }
            | Self::ImportFormatError { .. }
            | Self::ImportReadError { .. } => ErrorCategory::Import,
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 儲存錯誤只記錄，記憶體中的資料仍然有效
            Self::StorageReadError { .. }
            | Self::StorageWriteError { .. }
            | Self::QuotaExceededError { .. } => ErrorSeverity::Low,
            Self::ImportParseError { .. }
            | Self::ImportFormatError { .. }
            | Self::ImportReadError { .. }
            | Self::ValidationError { .. } => ErrorSeverity::Medium,
            Self::ConfigError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::StorageReadError { key, .. } => format!(
                "The stored value for '{}' is unreadable; it will be replaced on the next change",
                key
            ),
            Self::StorageWriteError { .. } => {
                "Check that the data directory is writable, then retry the change".to_string()
            }
            Self::QuotaExceededError { .. } => {
                "Export your data and remove unused licenses to free storage space".to_string()
            }
            Self::ImportParseError { .. } => {
                "Make sure the file is a valid JSON export".to_string()
            }
            Self::ImportFormatError { .. } => {
                "The file must contain a JSON array of licenses, as produced by export".to_string()
            }
            Self::ImportReadError { .. } => "Check that the file exists and is readable".to_string(),
            Self::ValidationError { field, .. } => {
                format!("Provide a non-empty value for '{}'", field)
            }
            Self::ConfigError { field, .. } => {
                format!("Fix the '{}' setting in the configuration file", field)
            }
            Self::IoError(_) => "Check file permissions and available disk space".to_string(),
            Self::SerializationError(_) => "The data could not be encoded as JSON".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ImportParseError { .. }
            | Self::ImportFormatError { .. }
            | Self::ImportReadError { .. } => "Error while importing data".to_string(),
            Self::ValidationError { field, reason } => format!("Invalid {}: {}", field, reason),
            Self::ConfigError { field, message } => {
                format!("Configuration problem in {}: {}", field, message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
