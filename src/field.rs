//! Typed stream fields ("parameters").
//!
//! A field couples a declared kind, a default, and a `constant` flag
//! with its current value. Constant fields reject direct assignment;
//! the update protocol lifts the flag for the duration of one update
//! via [`ConstantLift`] and always restores it.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, UpdateError};
use crate::value::{Value, ValueMap};

/// Declared type constraint of a field.
///
/// `Number` accepts either `Int` or `Float`, since UI event bridges do
/// not distinguish the two. `Any` accepts everything, including `Null`.
/// All other kinds are exact.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Any,
    Bool,
    Int,
    Float,
    Number,
    String,
    List,
    Structured,
}

impl FieldKind {
    /// Returns true if this kind accepts the given value.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Bool => value.is_bool(),
            Self::Int => value.is_int(),
            Self::Float => value.is_float(),
            Self::Number => value.is_int() || value.is_float(),
            Self::String => value.is_string(),
            Self::List => value.is_list(),
            Self::Structured => value.is_structured(),
        }
    }

    /// Returns a human-readable kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Number => "number",
            Self::String => "string",
            Self::List => "list",
            Self::Structured => "structured",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Declaration of a single stream field.
///
/// # Examples
///
/// ```
/// use vizstream::{FieldKind, FieldSpec, Value};
///
/// let spec = FieldSpec::new("x", FieldKind::Number, Value::Float(0.0)).constant();
/// assert!(spec.constant);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name; keys update sets and value projections.
    pub name: String,
    /// Declared type constraint.
    pub kind: FieldKind,
    /// Initial value.
    pub default: Value,
    /// Forbids direct assignment outside the update protocol.
    #[serde(default)]
    pub constant: bool,
}

impl FieldSpec {
    /// Creates a mutable field declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            constant: false,
        }
    }

    /// Marks the field constant: only the update protocol may change it.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Checks that the name is non-empty and the default matches the kind.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyFieldName);
        }
        if !self.kind.accepts(&self.default) {
            return Err(ConfigError::DefaultTypeMismatch {
                field: self.name.clone(),
                expected: self.kind.name(),
                actual: self.default.type_name(),
            });
        }
        Ok(())
    }
}

/// A declared field plus its current value.
#[derive(Debug, Clone)]
pub struct Field {
    spec: FieldSpec,
    value: Value,
    constant: bool,
}

impl Field {
    pub(crate) fn from_spec(spec: FieldSpec) -> Self {
        let value = spec.default.clone();
        let constant = spec.constant;
        Self {
            spec,
            value,
            constant,
        }
    }

    /// The field's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The declared type constraint.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.spec.kind
    }

    /// The current value.
    #[must_use]
    pub const fn current(&self) -> &Value {
        &self.value
    }

    /// The declared default value.
    #[must_use]
    pub const fn default_value(&self) -> &Value {
        &self.spec.default
    }

    /// True if the field currently rejects direct assignment.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        self.constant
    }

    /// Assigns a new value, honoring the constant flag and the kind.
    pub fn set(&mut self, value: Value) -> Result<(), UpdateError> {
        if self.constant {
            return Err(UpdateError::ConstantField {
                field: self.spec.name.clone(),
            });
        }
        if !self.spec.kind.accepts(&value) {
            return Err(UpdateError::TypeMismatch {
                field: self.spec.name.clone(),
                expected: self.spec.kind.name(),
                actual: value.type_name(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Assigns without honoring the constant flag. Construction-time
    /// overrides only; the kind is still enforced.
    pub(crate) fn set_initial(&mut self, value: Value) -> Result<(), ConfigError> {
        if !self.spec.kind.accepts(&value) {
            return Err(ConfigError::DefaultTypeMismatch {
                field: self.spec.name.clone(),
                expected: self.spec.kind.name(),
                actual: value.type_name(),
            });
        }
        self.value = value;
        Ok(())
    }
}

/// Declaration-ordered set of fields with name lookup.
///
/// Field counts are UI-bound (a handful per stream), so lookup is a
/// linear scan.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    pub(crate) fn from_specs(specs: Vec<FieldSpec>) -> Self {
        Self {
            fields: specs.into_iter().map(Field::from_spec).collect(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Snapshot of all current values, keyed by declared name.
    pub(crate) fn current_values(&self) -> ValueMap {
        self.fields
            .iter()
            .map(|f| (f.name().to_string(), f.current().clone()))
            .collect()
    }
}

/// Scoped lift of every field's constant flag.
///
/// Construction clears the flags; `Drop` restores the saved flags even
/// if an assignment in between failed, so an error mid-update can never
/// leave fields permanently unlocked.
pub(crate) struct ConstantLift<'a> {
    stream: &'a str,
    fields: &'a mut FieldSet,
    saved: Vec<bool>,
}

impl<'a> ConstantLift<'a> {
    pub(crate) fn new(stream: &'a str, fields: &'a mut FieldSet) -> Self {
        let saved = fields.fields.iter().map(|f| f.constant).collect();
        for field in &mut fields.fields {
            field.constant = false;
        }
        Self {
            stream,
            fields,
            saved,
        }
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) -> Result<(), UpdateError> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| UpdateError::UnknownField {
                stream: self.stream.to_string(),
                field: name.to_string(),
            })?;
        field.set(value)
    }
}

impl Drop for ConstantLift<'_> {
    fn drop(&mut self) {
        for (field, saved) in self.fields.fields.iter_mut().zip(self.saved.iter()) {
            field.constant = *saved;
        }
    }
}
