use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `ClauseWatchError` is the primary error type returned by clausewatch library
/// operations that cross crate boundaries. It provides:
/// - Detailed error information for programmatic handling
/// - User-friendly messages with context and suggestions
/// - Mapping to process exit codes for the terminal front end
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or CLI argument errors |
/// | `Validation` | Missing credential or empty contract text |
/// | `Extraction` | Unsupported or unreadable uploaded document |
/// | `Llm` | Model listing, generation, or retry failures |
///
/// None of these are fatal to a session: the caller reports the message and the
/// session stays on its current view so the user can retry.
#[derive(Error, Debug)]
pub enum ClauseWatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Document,
    Provider,
    ResourceLimits,
    Interrupted,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::Document => write!(f, "Document"),
            Self::Provider => write!(f, "Provider"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
            Self::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

/// Input validation failures.
///
/// These are recovered locally: the caller shows the message inline and the
/// session does not change state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no API credential was provided")]
    MissingCredential,

    #[error("contract text is empty")]
    EmptyContract,

    #[error("a new analysis can only be submitted from the input view")]
    NotAtInput,
}

/// Text extraction failures for uploaded documents
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("failed to read Word document: {0}")]
    Docx(String),

    #[error("document contains no extractable text")]
    Empty,

    #[error("failed to read document: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the generative-language service and the retry layer around it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed response body)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credential rejected by the provider (401, 403, invalid API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider rate limit or quota exceeded (429, RESOURCE_EXHAUSTED)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The model listing contained no entry that supports content generation
    #[error("No model supporting content generation is available")]
    NoCapableModel,

    /// Any other upstream failure: rejected request, blocked prompt, empty response
    #[error("Completion failed: {0}")]
    Completion(String),

    /// Every attempt allowed by the retry policy was rate limited
    #[error("Gave up after {attempts} rate-limited attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    /// A cooldown wait was cancelled by the user
    #[error("Cancelled while waiting to retry")]
    Cancelled,
}

/// Substrings that mark an upstream message as a rate-limit failure.
const RATE_LIMIT_INDICATORS: &[&str] = &[
    "429",
    "resource_exhausted",
    "resource has been exhausted",
    "rate limit",
    "quota",
];

impl LlmError {
    /// Whether this error reports a rate limit.
    ///
    /// `ProviderQuota` always qualifies. Other variants qualify when their message
    /// carries a rate-limit indicator, since some transports only surface the
    /// upstream text.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::ProviderQuota(_) => true,
            Self::Transport(msg) | Self::ProviderOutage(msg) | Self::Completion(msg) => {
                let lower = msg.to_lowercase();
                RATE_LIMIT_INDICATORS.iter().any(|needle| lower.contains(needle))
            }
            _ => false,
        }
    }
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("Configuration file is invalid: {msg}"),
            Self::MissingRequired(what) => format!("Required configuration is missing: {what}"),
            Self::InvalidValue { key, value } => {
                format!("Configuration value '{key}' is invalid: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is loaded from CLI flags, environment variables, \
             .clausewatch/config.toml and built-in defaults, in that order."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .clausewatch/config.toml".to_string(),
                "Run 'clausewatch config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(_) => {
                vec!["Add the missing key to .clausewatch/config.toml".to_string()]
            }
            Self::InvalidValue { .. } => vec![
                "Correct the value in the config file or on the command line".to_string(),
            ],
            Self::NotFound { .. } => vec![
                "Check the path given to --config".to_string(),
                "Omit --config to use automatic discovery".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for ValidationError {
    fn user_message(&self) -> String {
        match self {
            Self::MissingCredential => "Please provide an API key before analysing".to_string(),
            Self::EmptyContract => {
                "Please paste contract text or upload a document first".to_string()
            }
            Self::NotAtInput => "Reset the current result before submitting again".to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::MissingCredential => vec![
                "Set GEMINI_API_KEY in the environment".to_string(),
                "Or set api_key under [llm] in .clausewatch/config.toml".to_string(),
                "Or pass --api-key on the command line".to_string(),
            ],
            Self::EmptyContract => vec![
                "Pass a PDF, .docx or .txt file, or use --text / --stdin".to_string(),
            ],
            Self::NotAtInput => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

impl UserFriendlyError for ExtractionError {
    fn user_message(&self) -> String {
        match self {
            Self::UnsupportedType(kind) => {
                format!("'{kind}' is not a supported document type")
            }
            Self::Pdf(msg) => format!("Could not read the PDF: {msg}"),
            Self::Docx(msg) => format!("Could not read the Word document: {msg}"),
            Self::Empty => "The document does not contain any extractable text".to_string(),
            Self::Io(err) => format!("Could not read the document: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::UnsupportedType(_) => {
                Some("Supported formats are PDF, Word (.docx) and plain text.".to_string())
            }
            Self::Empty => Some(
                "Scanned PDFs contain images rather than text and cannot be read.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnsupportedType(_) => vec![
                "Convert the document to PDF, .docx or .txt".to_string(),
                "Or paste the contract text with --text".to_string(),
            ],
            Self::Empty | Self::Pdf(_) => {
                vec!["Copy the text out of the document and use --text".to_string()]
            }
            Self::Docx(_) => vec!["Re-save the document as .docx and try again".to_string()],
            Self::Io(_) => vec!["Check the file path and permissions".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Document
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Could not reach the model service: {msg}"),
            Self::ProviderAuth(msg) => format!("The API key was rejected: {msg}"),
            Self::ProviderQuota(msg) => format!("The model service is rate limiting: {msg}"),
            Self::ProviderOutage(msg) => format!("The model service is unavailable: {msg}"),
            Self::Timeout { duration } => {
                format!("The model did not answer within {:?}", duration)
            }
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("Not supported: {msg}"),
            Self::NoCapableModel => {
                "The API key works, but no model that can generate text is visible to it"
                    .to_string()
            }
            Self::Completion(msg) => format!("The model could not complete the analysis: {msg}"),
            Self::RetryExhausted {
                attempts,
                last_error,
            } => format!("Still rate limited after {attempts} attempts: {last_error}"),
            Self::Cancelled => "Analysis cancelled".to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate a missing, mistyped or revoked API key."
                    .to_string(),
            ),
            Self::ProviderQuota(_) | Self::RetryExhausted { .. } => Some(
                "Free-tier keys allow only a few requests per minute; each retry waits out a cooldown."
                    .to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::NoCapableModel => Some(
                "The key's project may not have the Generative Language API enabled.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => vec![
                "Check your internet connection".to_string(),
                "Try again with --verbose to see request details".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that GEMINI_API_KEY holds a valid key".to_string(),
                "Run 'clausewatch models' to test the key".to_string(),
            ],
            Self::ProviderQuota(_) | Self::RetryExhausted { .. } => vec![
                "Wait a minute and try again".to_string(),
                "Raise [retry] max_attempts or cooldown_secs in the config file".to_string(),
            ],
            Self::ProviderOutage(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Pin a different model with --model".to_string(),
            ],
            Self::Misconfiguration(_) | Self::Unsupported(_) => {
                vec!["Review the [llm] section of .clausewatch/config.toml".to_string()]
            }
            Self::NoCapableModel => vec![
                "Enable the Generative Language API for the key's project".to_string(),
                "Run 'clausewatch models' to list what the key can see".to_string(),
            ],
            Self::Completion(_) => vec![
                "Pin a different model with --model".to_string(),
                "Shorten the contract text if it is very long".to_string(),
            ],
            Self::Cancelled => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) | Self::RetryExhausted { .. } => ErrorCategory::ResourceLimits,
            Self::Cancelled => ErrorCategory::Interrupted,
            _ => ErrorCategory::Provider,
        }
    }
}

impl UserFriendlyError for ClauseWatchError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Validation(err) => err.user_message(),
            Self::Extraction(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Validation(err) => err.context(),
            Self::Extraction(err) => err.context(),
            Self::Llm(err) => err.context(),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Validation(err) => err.suggestions(),
            Self::Extraction(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Validation(err) => err.category(),
            Self::Extraction(err) => err.category(),
            Self::Llm(err) => err.category(),
        }
    }
}

impl ClauseWatchError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// The rendered text is passed through error-message redaction so that an
    /// upstream message echoing a credential never reaches the terminal.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {}\n", ctx));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {}\n", suggestion));
            }
        }

        crate::redaction::redact_error_message(&output)
    }

    /// Map this error to the appropriate process exit code.
    ///
    /// | Exit Code | Error Type |
    /// |-----------|------------|
    /// | 2 | Configuration, validation, provider misconfiguration |
    /// | 4 | Unsupported or unreadable document |
    /// | 5 | Credential rejected |
    /// | 6 | Rate-limit retries exhausted |
    /// | 70 | Other provider failures |
    /// | 130 | Cancelled during cooldown |
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) | Self::Validation(_) => ExitCode::CLI_ARGS,
            Self::Extraction(_) => ExitCode::DOCUMENT,
            Self::Llm(err) => match err {
                LlmError::ProviderAuth(_) => ExitCode::PROVIDER_AUTH,
                LlmError::ProviderQuota(_) | LlmError::RetryExhausted { .. } => {
                    ExitCode::RATE_LIMITED
                }
                LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => ExitCode::CLI_ARGS,
                LlmError::Cancelled => ExitCode::CANCELLED,
                _ => ExitCode::PROVIDER_FAILURE,
            },
        }
    }
}
