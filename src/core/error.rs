use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidYaml,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    SiteNotFound,
    AliasNotFound,

    StepFailed,
    ThresholdExceeded,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::SiteNotFound => "site.not_found",
            ErrorCode::AliasNotFound => "alias.not_found",

            ErrorCode::StepFailed => "step.failed",
            ErrorCode::ThresholdExceeded => "threshold.exceeded",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidFileDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailedDetails {
    pub step: String,
    pub context: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    fn with_details<D: Serialize>(code: ErrorCode, message: impl Into<String>, details: D) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(code, message, details)
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::with_details(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            MissingArgumentDetails { args },
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        Self::with_details(
            ErrorCode::ValidationInvalidArgument,
            problem.clone(),
            InvalidArgumentDetails {
                field: field.into(),
                problem,
                id,
                tried,
            },
        )
    }

    pub fn site_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        Self::with_details(
            ErrorCode::SiteNotFound,
            "Site not found",
            NotFoundDetails {
                id: id.into(),
                available,
            },
        )
        .with_hint("Run 'sitekit targets' to see available sites")
    }

    /// No alias under `site` carries the requested environment label.
    pub fn alias_not_found(site: &str, label: &str, available: Vec<String>) -> Self {
        Self::with_details(
            ErrorCode::AliasNotFound,
            format!("No environment '{}' registered for site '{}'", label, site),
            NotFoundDetails {
                id: format!("{}.{}", site, label),
                available,
            },
        )
        .with_hint(format!("Run 'sitekit targets {}' to see its environments", site))
    }

    pub fn step_failed(details: StepFailedDetails) -> Self {
        let message = format!("Step '{}' failed", details.step);
        Self::with_details(ErrorCode::StepFailed, message, details)
    }

    pub fn threshold_exceeded(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::ThresholdExceeded, message, details)
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        Self::with_details(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            ConfigMissingKeyDetails {
                key: key.into(),
                path,
            },
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::with_details(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            ConfigInvalidFileDetails {
                path: path.into(),
                error: err.to_string(),
            },
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::with_details(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in configuration",
            ConfigInvalidFileDetails {
                path: path.into(),
                error: error.into(),
            },
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::with_details(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            },
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::with_details(
            ErrorCode::InternalIoError,
            "IO error",
            InternalIoErrorDetails {
                error: error.into(),
                context,
            },
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
