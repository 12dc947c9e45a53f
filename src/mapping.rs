//! Field-name remapping for value projections.
//!
//! Multiple streams with similar event state can feed the same
//! subscriber by remapping field names to external event-key names.
//! The mapping is an explicit tagged variant resolved and validated at
//! stream construction, never a duck-typed argument.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::value::ValueMap;

/// How a stream renames its field names on read.
///
/// # Examples
///
/// ```
/// use vizstream::NameMapping;
///
/// let identity = NameMapping::Identity;
/// let alias = NameMapping::alias("posx");
/// let table = NameMapping::table([("x", "posx")]);
///
/// assert!(identity.is_identity());
/// assert!(!alias.is_identity());
/// assert!(!table.is_identity());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NameMapping {
    /// No remapping; field names pass through unchanged.
    #[default]
    Identity,
    /// External name for a stream's single data field. Configuration
    /// error on streams declaring more than one field.
    Alias(String),
    /// Field-name to external-name table. Keys must reference declared
    /// field names; fields absent from the table pass through.
    Table(HashMap<String, String>),
}

impl NameMapping {
    /// Creates a single-field alias mapping.
    #[must_use]
    pub fn alias(name: impl Into<String>) -> Self {
        Self::Alias(name.into())
    }

    /// Creates a mapping table from name pairs.
    #[must_use]
    pub fn table<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Table(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns true if this mapping leaves names unchanged.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Validates this mapping against a stream's declared field names.
    pub(crate) fn validate(&self, stream: &str, field_names: &[&str]) -> Result<(), ConfigError> {
        match self {
            Self::Identity => Ok(()),
            Self::Alias(_) => {
                if field_names.len() == 1 {
                    Ok(())
                } else {
                    Err(ConfigError::AmbiguousMapping {
                        stream: stream.to_string(),
                        fields: field_names.len(),
                    })
                }
            }
            Self::Table(table) => {
                for key in table.keys() {
                    if !field_names.contains(&key.as_str()) {
                        return Err(ConfigError::UnknownField {
                            stream: stream.to_string(),
                            field: key.clone(),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Remaps the keys of a raw value projection.
    ///
    /// For `Alias`, validation guarantees the input holds a single
    /// entry, which takes the alias as its key.
    pub(crate) fn remap(&self, values: ValueMap) -> ValueMap {
        match self {
            Self::Identity => values,
            Self::Alias(alias) => values.into_values().map(|v| (alias.clone(), v)).collect(),
            Self::Table(table) => values
                .into_iter()
                .map(|(k, v)| match table.get(&k) {
                    Some(renamed) => (renamed.clone(), v),
                    None => (k, v),
                })
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for NameMapping {
    fn from(table: HashMap<String, String>) -> Self {
        Self::Table(table)
    }
}

impl From<&str> for NameMapping {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<String> for NameMapping {
    fn from(alias: String) -> Self {
        Self::Alias(alias)
    }
}
