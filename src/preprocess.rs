//! Value preprocessors.
//!
//! A preprocessor is a pure transform applied to a stream's remapped
//! value projection before delivery to subscribers. Chains apply in
//! declared order, each output threading into the next input.

use std::collections::HashMap;

use crate::value::ValueMap;

/// A pure transform from one value mapping to another.
///
/// Implementations must be side-effect free and safely callable any
/// number of times, including on empty input.
pub trait Preprocessor: std::fmt::Debug {
    /// Transforms a value mapping.
    fn apply(&self, values: ValueMap) -> ValueMap;
}

/// The identity preprocessor: returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Preprocessor for Identity {
    fn apply(&self, values: ValueMap) -> ValueMap {
        values
    }
}

/// Renames keys according to a fixed alias table.
///
/// Keys absent from the table pass through unchanged; values are never
/// touched. When two keys alias to the same name, the later key in
/// iteration order wins.
///
/// # Examples
///
/// ```
/// use vizstream::{Preprocessor, Rename, Value, ValueMap};
///
/// let rename = Rename::single("x", "posx");
/// let mut values = ValueMap::new();
/// values.insert("x".to_string(), Value::Int(3));
///
/// let out = rename.apply(values);
/// assert_eq!(out["posx"], Value::Int(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Rename {
    table: HashMap<String, String>,
}

impl Rename {
    /// Creates a rename preprocessor from name pairs.
    #[must_use]
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Creates a rename for a single key.
    #[must_use]
    pub fn single(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new([(from.into(), to.into())])
    }
}

impl Preprocessor for Rename {
    fn apply(&self, values: ValueMap) -> ValueMap {
        values
            .into_iter()
            .map(|(k, v)| match self.table.get(&k) {
                Some(renamed) => (renamed.clone(), v),
                None => (k, v),
            })
            .collect()
    }
}

/// Threads a value mapping through a preprocessor chain in order.
pub(crate) fn apply_chain(chain: &[Box<dyn Preprocessor>], values: ValueMap) -> ValueMap {
    chain.iter().fold(values, |acc, p| p.apply(acc))
}
