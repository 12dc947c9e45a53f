//! Concrete stream constructors for common event shapes.
//!
//! Each variant is a fixed declaration of constant numeric fields
//! defaulting to zero. Instead of one thin subclass per shape, a single
//! parameterized constructor ([`numeric`]) builds the schema and the
//! named variants wrap it.

use crate::stream::{number_spec, Stream, StreamBuilder, StreamSchema};

/// Builds a stream of constant `Number` fields defaulting to `0.0`.
///
/// # Examples
///
/// ```
/// use vizstream::variants::numeric;
///
/// let stream = numeric("Extents", &["x0", "y0", "x1", "y1"]).build().unwrap();
/// assert_eq!(stream.field_names(), vec!["x0", "y0", "x1", "y1"]);
/// ```
#[must_use]
pub fn numeric(name: &str, fields: &[&str]) -> StreamBuilder {
    let schema = fields
        .iter()
        .fold(StreamSchema::new(name), |schema, field| {
            schema.field(number_spec(field))
        });
    Stream::builder(schema)
}

/// A position along the x-axis in data coordinates.
///
/// With the appropriate plotting backend, this corresponds to the
/// position of the mouse/trackpad cursor.
#[must_use]
pub fn position_x() -> StreamBuilder {
    numeric("PositionX", &["x"])
}

/// A position along the y-axis in data coordinates.
#[must_use]
pub fn position_y() -> StreamBuilder {
    numeric("PositionY", &["y"])
}

/// A position along the x- and y-axes in data coordinates.
#[must_use]
pub fn position_xy() -> StreamBuilder {
    numeric("PositionXY", &["x", "y"])
}
