//! Error types for loading and configuration
//!
//! Aggregation never fails. Everything that can go wrong happens before the
//! first dashboard is built:
//! - LoadError: the dataset file is missing, unreadable, or lacks a column
//! - ConfigError: config.json or a CLI override holds an unusable value

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a dataset into records
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Dataset not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported dataset format: .{0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Malformed row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("Required column '{column}' not found (headers: {available})")]
    MissingColumn { column: String, available: String },

    #[error("Spreadsheet has no sheets or no header row: {0}")]
    EmptySheet(PathBuf),

    #[error("No dataset given. Pass --data or set datasetPath in config.json")]
    NoDataset,
}

/// Errors raised while loading ~/.pipeline-tool/config.json
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("Failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid window: {0} days")]
    InvalidWindow(i64),

    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),

    #[error("Could not parse reference time {0:?}")]
    InvalidReferenceTime(String),
}

/// Any failure surfaced to the user
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LoadError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            LoadError::NotFound(_) => "Check the dataset path.",
            LoadError::UnsupportedFormat(_) => {
                "Use a .csv, .tsv, .xlsx, .xls or .ods file."
            }
            LoadError::Read { .. } => "Check file permissions and that the file is not open elsewhere.",
            LoadError::MalformedRow { .. } => "Check the file format is correct.",
            LoadError::MissingColumn { .. } => {
                "Map the column names under \"columns\" in ~/.pipeline-tool/config.json"
            }
            LoadError::EmptySheet(_) => "The first sheet must start with a header row.",
            LoadError::NoDataset => "Pass --data <file> or set datasetPath in config.json.",
        }
    }
}

impl ConfigError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ConfigError::NoHomeDir => "Pass --config <file> explicitly.",
            ConfigError::Read { .. } => "Check file permissions on the config file.",
            ConfigError::Parse { .. } => "Check ~/.pipeline-tool/config.json is valid JSON.",
            ConfigError::UnknownTimezone(_) => {
                "Use an IANA timezone name such as \"Europe/Berlin\" or \"UTC\"."
            }
            ConfigError::InvalidWindow(_) => {
                "windowDays must be zero or positive and below 100000000000."
            }
            ConfigError::InvalidDelimiter(_) => "Use a delimiter such as \",\", \";\" or \"\\t\".",
            ConfigError::InvalidReferenceTime(_) => {
                "Pass --now as an RFC 3339 timestamp or a date such as 2024-01-31."
            }
        }
    }
}

impl DashboardError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DashboardError::Load(e) => e.recovery_suggestion(),
            DashboardError::Config(e) => e.recovery_suggestion(),
        }
    }
}

/// Serializable error representation for JSON output
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub error_type: ErrorType,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Load,
    Config,
}

impl From<&DashboardError> for ErrorPayload {
    fn from(err: &DashboardError) -> Self {
        let error_type = match err {
            DashboardError::Load(_) => ErrorType::Load,
            DashboardError::Config(_) => ErrorType::Config,
        };

        ErrorPayload {
            message: err.to_string(),
            error_type,
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
