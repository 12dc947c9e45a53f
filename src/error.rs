//! Error types for vizstream.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific failure conditions and keeps configuration
//! mistakes distinguishable from runtime update/dispatch failures.

use thiserror::Error;

use crate::registry::SubscriberId;
use crate::stream::StreamId;

/// Configuration errors raised while constructing a stream.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A scalar alias mapping was supplied to a stream that does not
    /// declare exactly one data field.
    #[error("stream '{stream}' declares {fields} fields; a scalar alias requires exactly one, supply a mapping table instead")]
    AmbiguousMapping {
        stream: String,
        fields: usize,
    },

    /// A mapping table key or an initial value override names a field
    /// the schema does not declare.
    #[error("stream '{stream}' has no field named '{field}'")]
    UnknownField {
        stream: String,
        field: String,
    },

    /// The schema declares the same field name twice.
    #[error("stream '{stream}' declares field '{field}' more than once")]
    DuplicateField {
        stream: String,
        field: String,
    },

    /// A field's default value is rejected by its declared kind.
    #[error("field '{field}' declares kind {expected} but defaults to a {actual}")]
    DefaultTypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Field names cannot be empty.
    #[error("field name cannot be empty")]
    EmptyFieldName,
}

/// Errors raised while mutating stream field values.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The update names a field the stream does not declare.
    #[error("stream '{stream}' has no field named '{field}'")]
    UnknownField {
        stream: String,
        field: String,
    },

    /// The new value is rejected by the field's declared kind.
    #[error("field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Direct assignment to a constant field outside the update protocol.
    #[error("field '{field}' is constant and can only change via update")]
    ConstantField {
        field: String,
    },
}

/// Errors raised by registry operations and trigger fan-out.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registry holds no stream under this id.
    #[error("unknown stream: {id}")]
    UnknownStream {
        id: StreamId,
    },

    /// No subscriber is registered under this id.
    #[error("unknown subscriber: {id}")]
    UnknownSubscriber {
        id: SubscriberId,
    },

    /// Hidden subscribers are installed internally and cannot be removed.
    #[error("subscriber {id} is hidden and cannot be removed")]
    HiddenSubscriber {
        id: SubscriberId,
    },

    /// A subscriber callback failed; delivery to the remaining
    /// subscribers in that trigger pass was aborted.
    #[error("subscriber {id} failed: {reason}")]
    SubscriberFailed {
        id: SubscriberId,
        reason: String,
    },
}

/// Errors raised while decoding inbound bridge messages.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The message payload could not be decoded.
    #[error("malformed event message: {reason}")]
    MalformedMessage {
        reason: String,
    },
}

/// The error a subscriber callback reports to abort a trigger pass.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    /// Creates a subscriber error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Top-level error type for vizstream.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("update error: {0}")]
    Update(#[from] UpdateError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("internal error: {message}")]
    Internal {
        message: String,
    },
}

impl StreamError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an update error.
    #[must_use]
    pub const fn is_update(&self) -> bool {
        matches!(self, Self::Update(_))
    }

    /// Returns true if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns true if this is a bridge error.
    #[must_use]
    pub const fn is_bridge(&self) -> bool {
        matches!(self, Self::Bridge(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for vizstream operations.
pub type StreamResult<T> = Result<T, StreamError>;
