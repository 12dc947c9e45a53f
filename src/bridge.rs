//! Inbound event messages from a UI or notebook bridge.
//!
//! The external event source (a JavaScript callback, a notebook
//! message handler) addresses a registered stream by id and carries
//! new field values as JSON. Decoding is transport-neutral; plotting
//! specific callback glue stays out of this crate.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{BridgeError, StreamResult};
use crate::registry::StreamRegistry;
use crate::stream::StreamId;
use crate::value::ValueMap;

const fn default_trigger() -> bool {
    true
}

/// One inbound update event addressed to a registered stream.
///
/// # Examples
///
/// ```
/// use vizstream::bridge::EventMessage;
///
/// let msg = EventMessage::from_json(
///     r#"{
///         "stream": "9b6c963f-6253-4f4d-9267-0c9fe5b5a364",
///         "values": {"x": {"type": "float", "value": 3.5}}
///     }"#,
/// ).unwrap();
/// assert!(msg.trigger);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// The target stream.
    pub stream: StreamId,
    /// New field values, keyed by declared field name.
    #[serde(default)]
    pub values: ValueMap,
    /// Whether to notify subscribers immediately (the default) or stage
    /// the change for a later batch trigger.
    #[serde(default = "default_trigger")]
    pub trigger: bool,
}

impl EventMessage {
    /// Decodes a message from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Fails with [`BridgeError::MalformedMessage`] on undecodable
    /// payloads.
    pub fn from_json(payload: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(payload).map_err(|err| BridgeError::MalformedMessage {
            reason: err.to_string(),
        })
    }

    /// Encodes the message to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Fails with [`BridgeError::MalformedMessage`] if a structured
    /// value cannot be serialized.
    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|err| BridgeError::MalformedMessage {
            reason: err.to_string(),
        })
    }
}

/// Routes one decoded message into the registry: `update` when the
/// message asks for an immediate trigger, `stage` otherwise.
///
/// # Errors
///
/// Propagates the registry's dispatch and update errors.
pub fn dispatch(registry: &mut StreamRegistry, message: EventMessage) -> StreamResult<()> {
    trace!(stream = %message.stream, trigger = message.trigger, "bridge event");
    if message.trigger {
        registry.update(message.stream, message.values)
    } else {
        registry.stage(message.stream, message.values)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::StreamError;
    use crate::value::Value;
    use crate::variants::position_x;

    #[test]
    fn test_message_round_trip() {
        let mut values = ValueMap::new();
        values.insert("x".to_string(), Value::Float(3.5));
        let msg = EventMessage {
            stream: StreamId::new(),
            values,
            trigger: false,
        };

        let json = msg.to_json().unwrap();
        let back = EventMessage::from_json(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn test_trigger_defaults_to_true() {
        let id = StreamId::new();
        let json = format!(r#"{{"stream": "{id}"}}"#);
        let msg = EventMessage::from_json(&json).unwrap();
        assert!(msg.trigger);
        assert!(msg.values.is_empty());
    }

    #[test]
    fn test_malformed_message_rejected() {
        let err = EventMessage::from_json("not json").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedMessage { .. }));
    }

    #[test]
    fn test_dispatch_updates_and_notifies() {
        let mut registry = StreamRegistry::new();
        let id = registry.insert(position_x().mapping("posx").build().unwrap());

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        registry
            .subscribe(
                id,
                Box::new(move |values: &ValueMap| {
                    sink.borrow_mut().push(values.clone());
                    Ok(())
                }),
            )
            .unwrap();

        let mut values = ValueMap::new();
        values.insert("x".to_string(), Value::Float(7.0));
        dispatch(
            &mut registry,
            EventMessage {
                stream: id,
                values,
                trigger: true,
            },
        )
        .unwrap();

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0]["posx"], Value::Float(7.0));
    }

    #[test]
    fn test_dispatch_stage_is_silent() {
        let mut registry = StreamRegistry::new();
        let id = registry.insert(position_x().build().unwrap());

        let fired = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&fired);
        registry
            .subscribe(
                id,
                Box::new(move |_| {
                    *sink.borrow_mut() += 1;
                    Ok(())
                }),
            )
            .unwrap();

        let mut values = ValueMap::new();
        values.insert("x".to_string(), Value::Float(7.0));
        dispatch(
            &mut registry,
            EventMessage {
                stream: id,
                values,
                trigger: false,
            },
        )
        .unwrap();

        assert_eq!(*fired.borrow(), 0);
        assert_eq!(
            registry.get(id).unwrap().current("x"),
            Some(&Value::Float(7.0))
        );
    }

    #[test]
    fn test_dispatch_unknown_stream() {
        let mut registry = StreamRegistry::new();
        let err = dispatch(
            &mut registry,
            EventMessage {
                stream: StreamId::new(),
                values: ValueMap::new(),
                trigger: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Dispatch(_)));
    }
}
