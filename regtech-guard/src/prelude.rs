//! Prelude for commonly used types and traits in regtech-guard.

pub use crate::config::{DuplicatePolicy, EngineConfig, HaltPolicy};
pub use crate::core::{
    Check, Dataset, FieldDefinition, FieldType, Finding, FindingTarget, Phase, Record, RecordId,
    RunStatus, Schema, Severity, ValidationEngine, ValidationResult, Value,
};
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::formatters::{FormatterConfig, OutputFormat, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::reference::ReferenceData;
pub use crate::sources::DataSource;
