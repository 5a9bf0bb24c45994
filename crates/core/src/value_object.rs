//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. `Money` is the
/// canonical example in this workspace: two amounts of 500 kopecks are the same
/// amount regardless of which line they came from.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
