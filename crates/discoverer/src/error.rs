use thiserror::Error;

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur while discovering chunks
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Source text was rejected by the JavaScript grammar
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Network failure while fetching an entry script
    #[error("Fetch error: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Entry script responded with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// The evaluation sandbox could not be started
    #[error("Sandbox error: {0}")]
    SandboxError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be decoded
    #[error("Config decode error: {0}")]
    ConfigDecode(#[from] toml::de::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl DiscoveryError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a sandbox error
    pub fn sandbox(msg: impl Into<String>) -> Self {
        Self::SandboxError(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}

/// Why a single sandboxed evaluation produced no usable value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationFailure {
    /// Fragment failed to parse or threw at runtime
    #[error("evaluation threw: {0}")]
    Thrown(String),

    /// Evaluation exceeded its wall-clock budget
    #[error("evaluation timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    /// The sandbox worker is gone
    #[error("sandbox unavailable")]
    SandboxUnavailable,

    /// Result was not a string
    #[error("result is {0}, not a string")]
    NonString(&'static str),

    /// String result built by concatenating `undefined`
    #[error("result {0:?} contains undefined")]
    UndefinedConcatenation(String),

    /// Empty string result
    #[error("result is an empty string")]
    Empty,

    /// Structured result could not be decoded
    #[error("malformed result: {0}")]
    Malformed(String),
}

/// Outcome of evaluating one fragment
pub type EvaluationOutcome = std::result::Result<String, EvaluationFailure>;
