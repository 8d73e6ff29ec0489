//! Error types for rtbkit-pipeline
//!
//! Errors are structured: a kind, the configuration key and scope involved,
//! an underlying cause, and an actionable help message.

use std::fmt;

/// Result type alias for rtbkit-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rtbkit-pipeline operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Configuration key involved, if any (e.g., "ROOT_STACK_NAME")
    pub key: Option<String>,
    /// Context scope involved, if any (e.g., "shared" or "dev")
    pub scope: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// A key with no permitted default resolved to nothing in every tier
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },
    /// Error parsing a YAML/JSON context document
    #[error("Parse error")]
    Parse,
    /// Context document is well-formed but has an unusable shape
    #[error("Invalid context")]
    InvalidContext,
    /// I/O error (file not found, unwritable output, etc.)
    #[error("I/O error")]
    Io,
    /// A plan could not be rendered to YAML or JSON
    #[error("Render error")]
    Render,
}

impl Error {
    /// Create a missing required configuration error
    pub fn missing_required(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            kind: ErrorKind::MissingRequired { key: key.clone() },
            key: Some(key.clone()),
            scope: None,
            help: Some(format!(
                "Set the {} environment variable or add {} to the 'shared' context scope",
                key, key
            )),
            cause: None,
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            key: None,
            scope: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an invalid context error for a value that cannot be stored in a scope
    pub fn invalid_context(
        scope: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::InvalidContext,
            key: Some(key.into()),
            scope: Some(scope.into()),
            help: Some("Context settings must be strings, numbers, or booleans".into()),
            cause: Some(message.into()),
        }
    }

    /// Create an I/O error
    pub fn io(path: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Io,
            key: None,
            scope: None,
            help: None,
            cause: Some(format!("{}: {}", path, err)),
        }
    }

    /// Create a render error for output in the given format
    pub fn render(format: &str, err: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Render,
            key: None,
            scope: None,
            help: None,
            cause: Some(format!("failed to render {}: {}", format, err)),
        }
    }

    /// Add scope context to the error
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether this is the fatal missing-configuration error
    pub fn is_missing_required(&self) -> bool {
        matches!(self.kind, ErrorKind::MissingRequired { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        // The missing-required message already names the key
        if let Some(key) = &self.key {
            if !self.is_missing_required() {
                write!(f, "\n  Key: {}", key)?;
            }
        }

        if let Some(scope) = &self.scope {
            write!(f, "\n  Scope: {}", scope)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
