//! The stream registry: ownership, subscriptions, and trigger fan-out.
//!
//! The registry owns every live stream, keyed by [`StreamId`] in
//! insertion order, and owns the subscriber callbacks so one callback
//! can be attached to many streams yet fire exactly once per trigger.
//! Streams are never auto-pruned; [`StreamRegistry::remove`] retires
//! them deterministically.
//!
//! All operations are synchronous and intended for a single
//! event-processing thread; the `&mut` receiver makes the
//! single-writer assumption a compile-time fact rather than a
//! convention.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{DispatchError, StreamResult, SubscriberError};
use crate::stream::{SourceId, Stream, StreamId};
use crate::value::ValueMap;

/// Unique identifier for a subscriber callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Creates a new random subscriber id.
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

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscriber callback: receives the merged value mapping, returns
/// an error to abort the remaining fan-out of that trigger pass.
pub type SubscriberFn = Box<dyn FnMut(&ValueMap) -> Result<(), SubscriberError>>;

struct SubscriberEntry {
    callback: SubscriberFn,
    hidden: bool,
}

impl fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

/// Owns all live streams and their subscriber callbacks.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<StreamId, Stream>,
    order: Vec<StreamId>,
    callbacks: HashMap<SubscriberId, SubscriberEntry>,
}

impl StreamRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// True if no streams are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// True if the registry holds a stream under this id.
    #[must_use]
    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id)
    }

    /// Registered stream ids, in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<StreamId> {
        self.order.clone()
    }

    /// Borrows a registered stream.
    #[must_use]
    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    /// Mutably borrows a registered stream, e.g. for direct `set`.
    #[must_use]
    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    /// Registers a stream and returns its identity token.
    pub fn insert(&mut self, stream: Stream) -> StreamId {
        let id = stream.id();
        debug!(stream = %id, name = stream.name(), "registering stream");
        self.order.push(id);
        self.streams.insert(id, stream);
        id
    }

    /// Retires a stream, dropping any callbacks no other stream
    /// references. Returns the stream, or `None` if the id is unknown.
    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        let stream = self.streams.remove(&id)?;
        self.order.retain(|other| *other != id);

        let orphaned: Vec<SubscriberId> = stream
            .subscribers
            .iter()
            .chain(stream.hidden_subscribers.iter())
            .copied()
            .filter(|sub| !self.is_referenced(*sub))
            .collect();
        for sub in orphaned {
            self.callbacks.remove(&sub);
        }

        debug!(stream = %id, "retired stream");
        Some(stream)
    }

    fn is_referenced(&self, sub: SubscriberId) -> bool {
        self.streams
            .values()
            .any(|s| s.subscribers.contains(&sub) || s.hidden_subscribers.contains(&sub))
    }

    /// Registers a callback as a visible subscriber of a stream.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] if the id is unknown.
    pub fn subscribe(&mut self, id: StreamId, callback: SubscriberFn) -> StreamResult<SubscriberId> {
        self.subscribe_inner(id, callback, false)
    }

    /// Registers an internally-installed subscriber: it receives
    /// triggers but is not listed by [`Self::subscribers`] and cannot
    /// be removed with [`Self::unsubscribe`].
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] if the id is unknown.
    pub fn subscribe_hidden(
        &mut self,
        id: StreamId,
        callback: SubscriberFn,
    ) -> StreamResult<SubscriberId> {
        self.subscribe_inner(id, callback, true)
    }

    fn subscribe_inner(
        &mut self,
        id: StreamId,
        callback: SubscriberFn,
        hidden: bool,
    ) -> StreamResult<SubscriberId> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(DispatchError::UnknownStream { id })?;

        let sub = SubscriberId::new();
        self.callbacks.insert(sub, SubscriberEntry { callback, hidden });
        if hidden {
            stream.hidden_subscribers.push(sub);
        } else {
            stream.subscribers.push(sub);
        }
        trace!(stream = %id, subscriber = %sub, hidden, "subscribed");
        Ok(sub)
    }

    /// Attaches an existing visible subscriber to another stream, so
    /// one callback observes several streams but fires once per
    /// trigger. Attaching twice to the same stream is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] or
    /// [`DispatchError::UnknownSubscriber`], and with
    /// [`DispatchError::HiddenSubscriber`] for hidden subscribers.
    pub fn attach(&mut self, id: StreamId, sub: SubscriberId) -> StreamResult<()> {
        let entry = self
            .callbacks
            .get(&sub)
            .ok_or(DispatchError::UnknownSubscriber { id: sub })?;
        if entry.hidden {
            return Err(DispatchError::HiddenSubscriber { id: sub }.into());
        }
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(DispatchError::UnknownStream { id })?;
        if !stream.subscribers.contains(&sub) {
            stream.subscribers.push(sub);
        }
        Ok(())
    }

    /// Detaches a visible subscriber from every stream and drops its
    /// callback.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownSubscriber`] if the id is
    /// unknown, or [`DispatchError::HiddenSubscriber`] for hidden
    /// subscribers, which are not user-removable.
    pub fn unsubscribe(&mut self, sub: SubscriberId) -> StreamResult<()> {
        let entry = self
            .callbacks
            .get(&sub)
            .ok_or(DispatchError::UnknownSubscriber { id: sub })?;
        if entry.hidden {
            return Err(DispatchError::HiddenSubscriber { id: sub }.into());
        }
        for stream in self.streams.values_mut() {
            stream.subscribers.retain(|other| *other != sub);
        }
        self.callbacks.remove(&sub);
        trace!(subscriber = %sub, "unsubscribed");
        Ok(())
    }

    /// Visible subscriber ids of a stream, in subscription order.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] if the id is unknown.
    pub fn subscribers(&self, id: StreamId) -> StreamResult<&[SubscriberId]> {
        let stream = self
            .streams
            .get(&id)
            .ok_or(DispatchError::UnknownStream { id })?;
        Ok(&stream.subscribers)
    }

    /// A stream's value projection.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] if the id is unknown.
    pub fn value(&self, id: StreamId) -> StreamResult<ValueMap> {
        let stream = self
            .streams
            .get(&id)
            .ok_or(DispatchError::UnknownStream { id })?;
        Ok(stream.value())
    }

    /// The update protocol: applies the update set, then triggers this
    /// single stream. Subscribers observe the fully-updated snapshot.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`], any
    /// [`crate::UpdateError`] from validation, or a subscriber failure
    /// from the trigger pass.
    pub fn update(&mut self, id: StreamId, updates: ValueMap) -> StreamResult<()> {
        self.stage(id, updates)?;
        self.trigger(&[id])
    }

    /// Applies an update set without triggering, staging the change for
    /// a later explicit multi-stream [`Self::trigger`].
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] or any
    /// [`crate::UpdateError`] from validation.
    pub fn stage(&mut self, id: StreamId, updates: ValueMap) -> StreamResult<()> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(DispatchError::UnknownStream { id })?;
        trace!(stream = %id, fields = updates.len(), "applying update");
        stream.apply(updates)?;
        Ok(())
    }

    /// Computes the merged values of the given streams and notifies the
    /// union of their subscribers.
    ///
    /// Values merge in list order with last-write-wins on key
    /// collisions. Visible and hidden subscribers are deduplicated by
    /// identity and each invoked exactly once, synchronously, in an
    /// unspecified order. A subscriber error aborts delivery to the
    /// remaining subscribers and propagates to the caller.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::UnknownStream`] before any delivery,
    /// or [`DispatchError::SubscriberFailed`] mid-pass.
    pub fn trigger(&mut self, ids: &[StreamId]) -> StreamResult<()> {
        let mut merged = ValueMap::new();
        let mut seen = HashSet::new();
        let mut recipients = Vec::new();

        for id in ids {
            let stream = self
                .streams
                .get(id)
                .ok_or(DispatchError::UnknownStream { id: *id })?;
            merged.extend(stream.value());
            for sub in stream
                .subscribers
                .iter()
                .chain(stream.hidden_subscribers.iter())
            {
                if seen.insert(*sub) {
                    recipients.push(*sub);
                }
            }
        }

        debug!(
            streams = ids.len(),
            subscribers = recipients.len(),
            "trigger fan-out"
        );

        for sub in recipients {
            let entry = self
                .callbacks
                .get_mut(&sub)
                .ok_or_else(|| crate::error::StreamError::internal(format!(
                    "stream references unregistered subscriber {sub}"
                )))?;
            (entry.callback)(&merged).map_err(|err| DispatchError::SubscriberFailed {
                id: sub,
                reason: err.to_string(),
            })?;
        }

        Ok(())
    }

    /// Every registered stream observing the given source, by identity,
    /// in insertion order. Linear scan; stream counts are UI-bound.
    #[must_use]
    pub fn find(&self, source: SourceId) -> Vec<StreamId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.streams
                    .get(id)
                    .is_some_and(|s| s.source() == Some(source))
            })
            .collect()
    }
}
