//! Error types for the regtech-guard validation engine.
//!
//! Only two kinds of problems are raised as hard errors: a malformed schema
//! ([`GuardError::SchemaDefinition`]) and an internal inconsistency in the
//! engine itself ([`GuardError::EngineFatal`]). Everything that is wrong with
//! the *data*, including a predicate that blows up, is reported as a
//! [`Finding`](crate::core::Finding) inside a successfully returned
//! [`ValidationResult`](crate::core::ValidationResult).

use thiserror::Error;

/// The main error type for the regtech-guard library.
#[derive(Error, Debug)]
pub enum GuardError {
    /// The schema is malformed: duplicate field names or check ids, a check
    /// referencing an unknown field or phase, an invalid severity, etc.
    #[error("Schema definition error: {message}")]
    SchemaDefinition {
        /// Human-readable description of the problem
        message: String,
    },

    /// The engine reached a state it should never reach. This indicates a bug
    /// in the engine, not a data quality problem.
    #[error("Engine fatal error: {0}")]
    EngineFatal(String),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "JSON")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when parsing or processing data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A type alias for `Result<T, GuardError>`.
///
/// # Examples
///
/// ```rust
/// use regtech_guard::error::Result;
///
/// fn load() -> Result<()> {
///     Ok(())
/// }
/// # load().unwrap();
/// ```
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Creates a new schema definition error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaDefinition {
            message: message.into(),
        }
    }

    /// Creates a new engine fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::EngineFatal(message.into())
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true if this error came from schema construction.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, GuardError::SchemaDefinition { .. })
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Serialization(err.to_string())
    }
}

impl From<std::fmt::Error> for GuardError {
    fn from(err: std::fmt::Error) -> Self {
        GuardError::Serialization(format!("failed to render output: {err}"))
    }
}

impl From<csv::Error> for GuardError {
    fn from(err: csv::Error) -> Self {
        GuardError::data_source_with_source("CSV", err.to_string(), Box::new(err))
    }
}

/// A failure raised from inside a check predicate.
///
/// Predicates return this instead of a verdict when they cannot decide, for
/// example because a value that should be numeric fails to parse halfway
/// through a computation. The engine converts it (and any panic) into a single
/// error-severity finding carrying the `check_crashed` marker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CheckPredicateFailure {
    message: String,
}

impl CheckPredicateFailure {
    /// Creates a new predicate failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a failure from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(format!("predicate panicked: {detail}"))
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| prefix(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| prefix(&f(), e.into()))
    }
}

// Schema errors keep their variant so callers can still tell an abort apart.
fn prefix(msg: &str, err: GuardError) -> GuardError {
    match err {
        GuardError::SchemaDefinition { message } => GuardError::SchemaDefinition {
            message: format!("{msg}: {message}"),
        },
        GuardError::EngineFatal(inner) => GuardError::EngineFatal(format!("{msg}: {inner}")),
        other => GuardError::Configuration(format!("{msg}: {other}")),
    }
}
