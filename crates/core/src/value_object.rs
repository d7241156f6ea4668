//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. Clinic
/// opening hours are a value object: two configurations with the same open,
/// close and granularity produce the same slot grid and are interchangeable.
///
/// To "modify" a value object, construct a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
