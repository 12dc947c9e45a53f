//! The stream: a named, versioned bundle of typed fields.
//!
//! A stream's fields change over time in response to update events.
//! Reading [`Stream::value`] projects the current field values through
//! the name mapping and the preprocessor chain; mutation goes through
//! [`Stream::apply`] (the update protocol) or [`Stream::set`] (direct
//! assignment, which constant fields reject). Trigger fan-out lives in
//! the registry, since subscribers are shared across streams.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, UpdateError};
use crate::field::{ConstantLift, FieldKind, FieldSet, FieldSpec};
use crate::mapping::NameMapping;
use crate::preprocess::{apply_chain, Preprocessor};
use crate::registry::SubscriberId;
use crate::value::{Value, ValueMap};

/// Process-unique stream identity, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Creates a new random stream id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity token for the visualization object a stream observes.
///
/// Streams hold the token, never the object: the relation is by
/// identity only, and [`crate::StreamRegistry::find`] compares tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    /// Creates a new random source id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variant-level declaration of a stream: a name plus its fields.
///
/// The schema name is metadata and never part of the value projection.
///
/// # Examples
///
/// ```
/// use vizstream::{FieldKind, FieldSpec, StreamSchema, Value};
///
/// let schema = StreamSchema::new("PositionX")
///     .field(FieldSpec::new("x", FieldKind::Number, Value::Float(0.0)).constant());
/// assert_eq!(schema.field_names(), vec!["x"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl StreamSchema {
    /// Creates an empty schema with the given variant name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field declaration.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// The variant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field names, in declaration order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, spec) in self.fields.iter().enumerate() {
            spec.validate()?;
            if self.fields[..i].iter().any(|prev| prev.name == spec.name) {
                return Err(ConfigError::DuplicateField {
                    stream: self.name.clone(),
                    field: spec.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`Stream`].
///
/// Collects the mapping, source, preprocessors, and initial field
/// overrides, then validates everything in one place at `build`.
#[derive(Debug)]
pub struct StreamBuilder {
    schema: StreamSchema,
    mapping: NameMapping,
    source: Option<SourceId>,
    preprocessors: Vec<Box<dyn Preprocessor>>,
    overrides: ValueMap,
}

impl StreamBuilder {
    fn new(schema: StreamSchema) -> Self {
        Self {
            schema,
            mapping: NameMapping::Identity,
            source: None,
            preprocessors: Vec::new(),
            overrides: ValueMap::new(),
        }
    }

    /// Sets the name mapping.
    #[must_use]
    pub fn mapping(mut self, mapping: impl Into<NameMapping>) -> Self {
        self.mapping = mapping.into();
        self
    }

    /// Sets the source this stream observes.
    #[must_use]
    pub fn source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    /// Appends a preprocessor to the chain.
    #[must_use]
    pub fn preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Overrides a field's initial value. Overrides bypass the constant
    /// flag because they happen at construction; kinds still apply.
    #[must_use]
    pub fn value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(field.into(), value.into());
        self
    }

    /// Validates the configuration and constructs the stream.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the schema declares duplicate or
    /// unnamed fields, a default or override is rejected by its field's
    /// kind, the mapping references undeclared fields, or a scalar
    /// alias is supplied to a multi-field stream.
    pub fn build(self) -> Result<Stream, ConfigError> {
        self.schema.validate()?;
        self.mapping
            .validate(self.schema.name(), &self.schema.field_names())?;

        let name = self.schema.name.clone();
        let mut fields = FieldSet::from_specs(self.schema.fields);

        for (key, value) in self.overrides {
            let field = fields.get_mut(&key).ok_or_else(|| ConfigError::UnknownField {
                stream: name.clone(),
                field: key.clone(),
            })?;
            field.set_initial(value)?;
        }

        let now = Utc::now();
        Ok(Stream {
            id: StreamId::new(),
            name,
            fields,
            mapping: self.mapping,
            source: self.source,
            preprocessors: self.preprocessors,
            subscribers: Vec::new(),
            hidden_subscribers: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A live, observable bundle of event-derived field values.
#[derive(Debug)]
pub struct Stream {
    id: StreamId,
    name: String,
    fields: FieldSet,
    mapping: NameMapping,
    source: Option<SourceId>,
    preprocessors: Vec<Box<dyn Preprocessor>>,
    pub(crate) subscribers: Vec<SubscriberId>,
    pub(crate) hidden_subscribers: Vec<SubscriberId>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Stream {
    /// Starts building a stream from a schema.
    #[must_use]
    pub fn builder(schema: StreamSchema) -> StreamBuilder {
        StreamBuilder::new(schema)
    }

    /// The stream's identity token.
    #[must_use]
    pub const fn id(&self) -> StreamId {
        self.id
    }

    /// The variant name (metadata, never projected).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source this stream observes, if any.
    #[must_use]
    pub const fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// Number of state changes applied so far, starting at 1.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// When the stream was constructed.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the stream last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Declared field names, in declaration order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(crate::field::Field::name).collect()
    }

    /// The current raw value of a field, before any remapping.
    #[must_use]
    pub fn current(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(crate::field::Field::current)
    }

    /// True if the named field is declared and currently constant.
    #[must_use]
    pub fn is_constant(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(crate::field::Field::is_constant)
    }

    /// The value projection: current field values, remapped through the
    /// name mapping, then threaded through the preprocessor chain.
    ///
    /// Pure read; never mutates the stream.
    #[must_use]
    pub fn value(&self) -> ValueMap {
        let remapped = self.mapping.remap(self.fields.current_values());
        apply_chain(&self.preprocessors, remapped)
    }

    /// Direct assignment to a single field, outside the update protocol.
    ///
    /// # Errors
    ///
    /// Fails with [`UpdateError::ConstantField`] on constant fields,
    /// [`UpdateError::UnknownField`] on undeclared names, and
    /// [`UpdateError::TypeMismatch`] when the kind rejects the value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), UpdateError> {
        let target = self
            .fields
            .get_mut(field)
            .ok_or_else(|| UpdateError::UnknownField {
                stream: self.name.clone(),
                field: field.to_string(),
            })?;
        target.set(value.into())?;
        self.touch();
        Ok(())
    }

    /// Applies an update set: the mutation half of the update protocol.
    ///
    /// Every name and value is validated before any state changes, so a
    /// failed update leaves the stream untouched and subscribers only
    /// ever observe fully-updated snapshots. Constant flags are lifted
    /// for the duration of the write and always restored.
    ///
    /// Triggering is the registry's job; use
    /// [`crate::StreamRegistry::update`] for apply-then-notify.
    ///
    /// # Errors
    ///
    /// Fails with [`UpdateError::UnknownField`] on undeclared names and
    /// [`UpdateError::TypeMismatch`] when a kind rejects its new value.
    pub fn apply(&mut self, updates: ValueMap) -> Result<(), UpdateError> {
        for (key, value) in &updates {
            let field = self
                .fields
                .get(key)
                .ok_or_else(|| UpdateError::UnknownField {
                    stream: self.name.clone(),
                    field: key.clone(),
                })?;
            if !field.kind().accepts(value) {
                return Err(UpdateError::TypeMismatch {
                    field: key.clone(),
                    expected: field.kind().name(),
                    actual: value.type_name(),
                });
            }
        }

        {
            let mut lift = ConstantLift::new(&self.name, &mut self.fields);
            for (key, value) in updates {
                lift.set(&key, value)?;
            }
        }

        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kwargs = self
            .fields
            .iter()
            .map(|field| format!("{}={}", field.name(), field.current()))
            .collect::<Vec<_>>()
            .join(", ");
        if self.mapping.is_identity() {
            write!(f, "{}({kwargs})", self.name)
        } else {
            write!(f, "{}({:?}, {kwargs})", self.name, self.mapping)
        }
    }
}

/// A convenience for single-field numeric schemas.
pub(crate) fn number_spec(name: &str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Number, Value::Float(0.0)).constant()
}
