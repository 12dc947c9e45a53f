//! # vizstream - Reactive event streams for visualization backends
//!
//! vizstream is the event-stream subsystem of a declarative
//! data-visualization rendering backend. Visualizations respond to
//! events, originating either server-side or from a JavaScript bridge
//! in a notebook, through streams: named, versioned bundles of typed
//! fields that fan out change notifications to subscribers.
//!
//! ## Core Concepts
//!
//! - **Stream**: a live, observable bundle of event-derived field values
//! - **Subscriber**: a callable notified with merged field values on trigger
//! - **Trigger**: merging values across streams and notifying the combined
//!   subscriber set
//! - **Preprocessor**: a pure value-mapping transform applied before delivery
//!
//! ## Usage
//!
//! ```rust
//! use vizstream::{StreamRegistry, Value, ValueMap};
//! use vizstream::variants::position_xy;
//!
//! let mut registry = StreamRegistry::new();
//! let cursor = registry.insert(position_xy().build().unwrap());
//!
//! registry
//!     .subscribe(cursor, Box::new(|values: &ValueMap| {
//!         // A plotting component would redraw here.
//!         assert_eq!(values["x"], Value::Float(3.0));
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let mut moved = ValueMap::new();
//! moved.insert("x".to_string(), Value::Float(3.0));
//! registry.update(cursor, moved).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod field;
pub mod mapping;
pub mod preprocess;
pub mod value;

// Streams, registry, and the inbound bridge
pub mod bridge;
pub mod registry;
pub mod stream;
pub mod variants;

// Re-export primary types at crate root for convenience
pub use bridge::EventMessage;
pub use error::{
    BridgeError, ConfigError, DispatchError, StreamError, StreamResult, SubscriberError,
    UpdateError,
};
pub use field::{Field, FieldKind, FieldSpec};
pub use mapping::NameMapping;
pub use preprocess::{Identity, Preprocessor, Rename};
pub use registry::{StreamRegistry, SubscriberFn, SubscriberId};
pub use stream::{SourceId, Stream, StreamBuilder, StreamId, StreamSchema};
pub use value::{Value, ValueMap};
