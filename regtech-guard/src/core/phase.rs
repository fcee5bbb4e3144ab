//! Phases: ordered, named stages of a validation run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether failures in a phase make fields unusable for later phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Type, presence and domain checks. Error findings mark the field
    /// unusable for the failing record.
    Structural,
    /// Business rules. Findings never mark fields unusable.
    Logical,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Structural => f.write_str("structural"),
            PhaseKind::Logical => f.write_str("logical"),
        }
    }
}

/// A named stage grouping checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    name: String,
    kind: PhaseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Phase {
    /// Conventional name of the structural phase.
    pub const SYNTACTICAL: &'static str = "syntactical";
    /// Conventional name of the business-rule phase.
    pub const LOGICAL: &'static str = "logical";

    /// Creates a structural phase.
    pub fn structural(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PhaseKind::Structural,
            description: None,
        }
    }

    /// Creates a logical phase.
    pub fn logical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PhaseKind::Logical,
            description: None,
        }
    }

    /// The usual pair: `syntactical` then `logical`.
    pub fn standard() -> Vec<Phase> {
        vec![
            Phase::structural(Self::SYNTACTICAL),
            Phase::logical(Self::LOGICAL),
        ]
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the phase name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the phase kind.
    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Returns the description if available.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns true for structural phases.
    pub fn is_structural(&self) -> bool {
        self.kind == PhaseKind::Structural
    }
}
