//! Schemas: fields, phases and the immutable check registry.
//!
//! A [`Schema`] is built once with [`SchemaBuilder`] (or [`Schema::build`])
//! and validated fail-fast. Building derives the structural checks implied by
//! field metadata, resolves every check to its phase and the fields it reads,
//! and freezes the result. A built schema can be shared across any number of
//! runs.
//!
//! ```rust
//! use regtech_guard::core::{Check, FieldDefinition, FieldType, Phase, Schema};
//!
//! let schema = Schema::builder("loans")
//!     .phases(Phase::standard())
//!     .field(FieldDefinition::new("loan_amount", FieldType::Number).required())
//!     .field(FieldDefinition::new("action_taken", FieldType::String))
//!     .check(
//!         "action_taken",
//!         Check::field("action_taken.denial_reasons", |_, _| Ok(true))
//!             .depends_on("denial_reasons")
//!             .phase("logical")
//!             .build(),
//!     )
//!     .build();
//!
//! // denial_reasons is not a field of the schema
//! assert!(schema.unwrap_err().is_schema_error());
//! ```

use super::{Check, FieldDefinition, FieldSpec, Phase};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// One registered check, resolved against the schema.
#[derive(Debug, Clone)]
pub(crate) struct CheckEntry {
    pub(crate) check: Check,
    /// Index of the field the check is attached to
    pub(crate) field: usize,
    /// Attached field first, then `depends_on` fields
    pub(crate) reads: Vec<usize>,
    pub(crate) phase: usize,
    /// Check-definition order across the whole schema
    pub(crate) order: usize,
}

/// Entry indices of one phase, split by evaluation variant.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhasePlan {
    pub(crate) field_checks: Vec<usize>,
    pub(crate) dataset_checks: Vec<usize>,
}

#[derive(Debug)]
struct Compiled {
    entries: Vec<CheckEntry>,
    by_id: HashMap<String, usize>,
    plans: Vec<PhasePlan>,
}

/// A validated, immutable schema.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDefinition>,
    phases: Vec<Phase>,
    compiled: Arc<Compiled>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Builds a schema from field definitions and phases.
    ///
    /// Fails with [`GuardError::SchemaDefinition`] when field names, phase
    /// names or check ids collide, a check references an unknown field or
    /// phase, a field's metadata is unusable, or there are no phases.
    pub fn build(
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
        phases: Vec<Phase>,
    ) -> Result<Self> {
        let compiled = compile(&fields, &phases)?;
        Ok(Self {
            name: name.into(),
            fields,
            phases,
            compiled: Arc::new(compiled),
        })
    }

    /// Returns a new schema with `check` attached to `field`.
    ///
    /// The same validation as [`Schema::build`] applies; in particular a
    /// colliding check id is rejected.
    pub fn attach_check(self, field: &str, check: Check) -> Result<Self> {
        let mut fields = self.fields;
        let target = fields
            .iter_mut()
            .find(|f| f.name() == field)
            .ok_or_else(|| {
                GuardError::schema(format!(
                    "cannot attach check '{}': unknown field '{field}'",
                    check.id()
                ))
            })?;
        target.push_check(check);
        Schema::build(self.name, fields, self.phases)
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Looks up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Returns the phases in execution order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Iterates over every registered check (derived ones included) in
    /// definition order.
    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.compiled.entries.iter().map(|e| &e.check)
    }

    /// Looks up a registered check by id.
    pub fn check(&self, id: &str) -> Option<&Check> {
        self.compiled
            .by_id
            .get(id)
            .map(|&i| &self.compiled.entries[i].check)
    }

    /// Returns the number of registered checks.
    pub fn check_count(&self) -> usize {
        self.compiled.entries.len()
    }

    /// Returns true if a check with this id is registered.
    pub fn contains_check(&self, id: &str) -> bool {
        self.compiled.by_id.contains_key(id)
    }

    pub(crate) fn entries(&self) -> &[CheckEntry] {
        &self.compiled.entries
    }

    pub(crate) fn plan(&self, phase: usize) -> Option<&PhasePlan> {
        self.compiled.plans.get(phase)
    }

    /// Indices of the non-nullable fields.
    pub(crate) fn required_fields(&self) -> impl Iterator<Item = (usize, &FieldDefinition)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_nullable())
    }
}

fn compile(fields: &[FieldDefinition], phases: &[Phase]) -> Result<Compiled> {
    if phases.is_empty() {
        return Err(GuardError::schema("schema must declare at least one phase"));
    }

    let mut phase_index = HashMap::with_capacity(phases.len());
    for (i, phase) in phases.iter().enumerate() {
        if phase.name().is_empty() {
            return Err(GuardError::schema("phase names must not be empty"));
        }
        if phase_index.insert(phase.name(), i).is_some() {
            return Err(GuardError::schema(format!(
                "duplicate phase name '{}'",
                phase.name()
            )));
        }
    }

    let mut field_index = HashMap::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        if field.name().is_empty() {
            return Err(GuardError::schema("field names must not be empty"));
        }
        if field_index.insert(field.name(), i).is_some() {
            return Err(GuardError::schema(format!(
                "duplicate field name '{}'",
                field.name()
            )));
        }
    }

    let structural = phases.iter().position(Phase::is_structural).unwrap_or(0);

    let mut entries: Vec<CheckEntry> = Vec::new();
    let mut by_id = HashMap::new();

    for (fi, field) in fields.iter().enumerate() {
        let derived = field
            .structural_checks()?
            .into_iter()
            .map(|check| (check, Some(structural)));
        let explicit = field.checks().iter().cloned().map(|check| (check, None));

        for (check, fixed_phase) in derived.chain(explicit) {
            if check.id().is_empty() {
                return Err(GuardError::schema(format!(
                    "check on field '{}' has an empty id",
                    field.name()
                )));
            }
            if by_id.contains_key(check.id()) {
                return Err(GuardError::schema(format!(
                    "duplicate check id '{}'",
                    check.id()
                )));
            }

            let phase = match (fixed_phase, check.phase()) {
                (Some(p), _) => p,
                (None, Some(name)) => *phase_index.get(name).ok_or_else(|| {
                    GuardError::schema(format!(
                        "check '{}' references unknown phase '{name}'",
                        check.id()
                    ))
                })?,
                (None, None) => 0,
            };

            let mut reads = vec![fi];
            for dep in check.depends_on() {
                let di = *field_index.get(dep.as_str()).ok_or_else(|| {
                    GuardError::schema(format!(
                        "check '{}' references unknown field '{dep}'",
                        check.id()
                    ))
                })?;
                if !reads.contains(&di) {
                    reads.push(di);
                }
            }

            let check = check.with_phase(phases[phase].name());
            let order = entries.len();
            by_id.insert(check.id().to_string(), order);
            entries.push(CheckEntry {
                check,
                field: fi,
                reads,
                phase,
                order,
            });
        }
    }

    let mut plans = vec![PhasePlan::default(); phases.len()];
    for entry in &entries {
        let plan = &mut plans[entry.phase];
        if entry.check.is_dataset_check() {
            plan.dataset_checks.push(entry.order);
        } else {
            plan.field_checks.push(entry.order);
        }
    }

    Ok(Compiled {
        entries,
        by_id,
        plans,
    })
}

/// Builder for [`Schema`].
///
/// Checks can be attached by field name through [`SchemaBuilder::check`];
/// the attachment is resolved when [`SchemaBuilder::build`] runs.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDefinition>,
    phases: Vec<Phase>,
    pending: Vec<(String, Check)>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            phases: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Adds a field definition.
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds several field definitions.
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Adds a phase. Without any phase, [`Phase::standard`] is used.
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Adds several phases.
    pub fn phases(mut self, phases: impl IntoIterator<Item = Phase>) -> Self {
        self.phases.extend(phases);
        self
    }

    /// Attaches a check to a field by name.
    pub fn check(mut self, field: impl Into<String>, check: Check) -> Self {
        self.pending.push((field.into(), check));
        self
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates and freezes the schema.
    pub fn build(self) -> Result<Schema> {
        let mut fields = self.fields;
        for (field, check) in self.pending {
            let target = fields
                .iter_mut()
                .find(|f| f.name() == field)
                .ok_or_else(|| {
                    GuardError::schema(format!(
                        "cannot attach check '{}': unknown field '{field}'",
                        check.id()
                    ))
                })?;
            target.push_check(check);
        }
        let phases = if self.phases.is_empty() {
            Phase::standard()
        } else {
            self.phases
        };
        Schema::build(self.name, fields, phases)
    }
}

/// A declarative schema document: name, phases and field specs.
///
/// ```rust
/// use regtech_guard::core::SchemaSpec;
///
/// let spec = SchemaSpec::from_json(r#"{
///     "name": "sblar",
///     "fields": [
///         {"name": "uid", "type": "string", "nullable": false, "format": "^[A-Z0-9]{21,45}$"},
///         {"name": "app_method", "type": "enumeration", "allowed_values": ["1", "2", "3", "4"]}
///     ]
/// }"#).unwrap();
///
/// let schema = spec.into_builder().unwrap().build().unwrap();
/// assert_eq!(schema.fields().len(), 2);
/// assert_eq!(schema.phases().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Schema name
    pub name: String,
    /// Phases in order; the standard pair when empty
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// Field specs in order
    pub fields: Vec<FieldSpec>,
}

impl SchemaSpec {
    /// Parses a schema document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GuardError::schema(format!("invalid schema document: {e}")))
    }

    /// Reads a schema document from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| match e {
            GuardError::SchemaDefinition { message } => {
                GuardError::schema(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Converts the document into a builder, ready for code-attached checks.
    pub fn into_builder(self) -> Result<SchemaBuilder> {
        let mut seen = HashSet::new();
        let mut builder = SchemaBuilder::new(self.name).phases(self.phases);
        for spec in self.fields {
            if !seen.insert(spec.name.clone()) {
                return Err(GuardError::schema(format!(
                    "duplicate field name '{}'",
                    spec.name
                )));
            }
            builder = builder.field(FieldDefinition::try_from(spec)?);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldType, PhaseKind};

    fn amount() -> FieldDefinition {
        FieldDefinition::new("loan_amount", FieldType::Number).required()
    }

    #[test]
    fn test_derived_checks_precede_explicit_ones() {
        let schema = Schema::builder("loans")
            .field(amount().check(
                Check::field("loan_amount.positive", |v, _| Ok(v.as_f64().unwrap_or(0.0) > 0.0))
                    .phase("logical")
                    .build(),
            ))
            .build()
            .unwrap();

        let ids: Vec<_> = schema.checks().map(Check::id).collect();
        assert_eq!(
            ids,
            vec![
                "loan_amount.required",
                "loan_amount.invalid_number",
                "loan_amount.positive"
            ]
        );
        let entries = schema.entries();
        assert_eq!(entries[0].phase, 0);
        assert_eq!(entries[2].phase, 1);
        assert_eq!(schema.check("loan_amount.positive").and_then(Check::phase), Some("logical"));
    }

    #[test]
    fn test_unphased_checks_go_to_first_phase() {
        let schema = Schema::builder("s")
            .field(FieldDefinition::new("a", FieldType::String))
            .check("a", Check::field("a.x", |_, _| Ok(true)).build())
            .build()
            .unwrap();
        assert_eq!(schema.check("a.x").and_then(Check::phase), Some("syntactical"));
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let err = Schema::build(
            "s",
            vec![amount(), amount()],
            Phase::standard(),
        )
        .unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains("duplicate field name 'loan_amount'"));
    }

    #[test]
    fn test_duplicate_check_ids_rejected() {
        let schema = Schema::builder("s").field(amount()).build().unwrap();
        let err = schema
            .attach_check(
                "loan_amount",
                Check::field("loan_amount.required", |_, _| Ok(true)).build(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("duplicate check id"));
    }

    #[test]
    fn test_unknown_references_rejected() {
        let unknown_field = Schema::builder("s")
            .field(amount())
            .check("missing", Check::field("m.x", |_, _| Ok(true)).build())
            .build();
        assert!(unknown_field.unwrap_err().is_schema_error());

        let unknown_phase = Schema::builder("s")
            .field(amount())
            .check("loan_amount", Check::field("m.x", |_, _| Ok(true)).phase("later").build())
            .build();
        assert!(unknown_phase.unwrap_err().to_string().contains("unknown phase 'later'"));

        let no_phases = Schema::build("s", vec![amount()], vec![]);
        assert!(no_phases.unwrap_err().is_schema_error());

        let duplicate_phase = Schema::build(
            "s",
            vec![amount()],
            vec![Phase::structural("p"), Phase::logical("p")],
        );
        assert!(duplicate_phase.unwrap_err().is_schema_error());
    }

    #[test]
    fn test_attach_check_returns_new_schema() {
        let schema = Schema::builder("s")
            .field(amount())
            .field(FieldDefinition::new("action_taken", FieldType::String))
            .build()
            .unwrap();
        let before = schema.check_count();

        let extended = schema
            .clone()
            .attach_check(
                "action_taken",
                Check::field("action_taken.x", |_, _| Ok(true))
                    .depends_on("loan_amount")
                    .build(),
            )
            .unwrap();

        assert_eq!(schema.check_count(), before);
        assert_eq!(extended.check_count(), before + 1);
        let entry = &extended.entries()[extended.check_count() - 1];
        assert_eq!(entry.reads, vec![1, 0]);
    }

    #[test]
    fn test_plans_split_by_variant() {
        let schema = Schema::builder("s")
            .field(FieldDefinition::new("uid", FieldType::String).required())
            .check("uid", Check::dataset("uid.duplicates", |_| Ok(vec![])).build())
            .build()
            .unwrap();
        let plan = schema.plan(0).unwrap();
        assert_eq!(plan.field_checks, vec![0]);
        assert_eq!(plan.dataset_checks, vec![1]);
        assert!(schema.plan(1).unwrap().field_checks.is_empty());
    }

    #[test]
    fn test_derived_checks_land_in_first_structural_phase() {
        let schema = Schema::build(
            "s",
            vec![amount()],
            vec![Phase::logical("pre"), Phase::structural("syntax")],
        )
        .unwrap();
        assert_eq!(schema.phases()[1].kind(), PhaseKind::Structural);
        assert!(schema.entries().iter().all(|e| e.phase == 1));
    }

    #[test]
    fn test_schema_spec_errors_are_schema_errors() {
        let bad_type = SchemaSpec::from_json(
            r#"{"name": "s", "fields": [{"name": "a", "type": "blob"}]}"#,
        );
        assert!(bad_type.unwrap_err().is_schema_error());

        let dup = SchemaSpec::from_json(
            r#"{"name": "s", "fields": [{"name": "a", "type": "string"}, {"name": "a", "type": "number"}]}"#,
        )
        .unwrap()
        .into_builder();
        assert!(dup.unwrap_err().is_schema_error());
    }
}
