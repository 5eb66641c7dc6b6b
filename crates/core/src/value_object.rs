//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: an ingredient use of 2 units of flour is
/// equal to any other ingredient use of 2 units of flour. They are immutable;
/// "changing" one means building a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Portion {
///     grams: u32,
/// }
///
/// impl ValueObject for Portion {}
///
/// assert_eq!(Portion { grams: 250 }, Portion { grams: 250 });
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
