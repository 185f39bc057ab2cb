// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A typed identifier.
//!
//! The goal of this crate is to create compile-time associations between IDs and types.
//! An `Id<Brick>` and an `Id<Graph>` are distinct types even though both wrap a [`Uuid`],
//! which keeps handle types from being conflated without writing a separate `FooId`
//! newtype per handle.

use core::fmt::{Debug, Formatter};
use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// An abstract, typed ID.
///
/// The type parameter `T` is a compile-time tag only; it consumes no space and has no
/// runtime cost. The only function of `T` is to distinguish this id type from other
/// [`Id`] types.
///
/// ```rust,compile_fail
/// # use brickline_id::Id;
/// # struct Brick; // stub, for example
/// # struct Graph; // stub, for example
/// fn example(mut brick_id: Id<Brick>, graph_id: Id<Graph>) {
///     brick_id = graph_id; // <- this won't compile, and that's a good thing
/// }
/// ```
#[repr(transparent)]
pub struct Id<T: ?Sized, U = Uuid>(U, PhantomData<T>);

impl<T, U> Copy for Id<T, U> where U: Copy {}

impl<T, U> Hash for Id<T, U>
where
    U: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T, U> Clone for Id<T, U>
where
    U: Clone,
{
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T, U> PartialEq for Id<T, U>
where
    U: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T, U> Eq for Id<T, U> where U: Eq {}

impl<T, U> PartialOrd for Id<T, U>
where
    U: Ord,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, U> Ord for Id<T, U>
where
    U: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T, U> AsRef<U> for Id<T, U> {
    fn as_ref(&self) -> &U {
        &self.0
    }
}

impl<T, U> Display for Id<T, U>
where
    U: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Display>::fmt(&self.0, f)
    }
}

impl<T, U> Debug for Id<T, U>
where
    U: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Debug>::fmt(&self.0, f)
    }
}

impl<T, U> Default for Id<T, U>
where
    U: Default,
{
    fn default() -> Self {
        Self(U::default(), PhantomData)
    }
}

impl<T> Id<T> {
    /// Namespace UUID used for generating namespaced [UUIDv5] identifiers
    ///
    /// [UUIDv5]: https://datatracker.ietf.org/doc/html/rfc9562#section-5.5
    pub const NAMESPACE_UUID: Uuid = Uuid::from_u128(0x2f1be459_7c11_4a28_9cf5_8df31ea2a0d3);

    /// Generate a new [`Id<T>`].
    ///
    /// This method returns a transparently wrapped random [`Uuid`] which is
    /// compile-time tagged with the type parameter `T`.
    #[must_use]
    pub fn new() -> Id<T> {
        Id(Uuid::new_v4(), PhantomData)
    }

    /// Strip type safety and return the wrapped (untyped) [`Uuid`]
    #[must_use]
    pub const fn into_raw(self) -> Uuid {
        self.0
    }

    /// Return a reference to the underlying (untyped) [`Uuid`].
    #[must_use]
    pub const fn as_raw(&self) -> &Uuid {
        &self.0
    }

    /// Create a typed version of `uuid`.
    ///
    /// # Note
    ///
    /// You generally should not need this method. The appropriate use is to add a
    /// compile-time annotation to a [`Uuid`] received in a context where the associated
    /// type may be conclusively inferred. To mint a fresh id, use [`Id::new`] instead.
    #[must_use]
    pub const fn from_raw(uuid: Uuid) -> Self {
        Self(uuid, PhantomData)
    }

    /// Generate a compile-time-stable "typed" [UUID version 5] from a tag.
    ///
    /// This value will not change between runs if `tag` does not.
    ///
    /// [UUID version 5]: https://datatracker.ietf.org/doc/html/rfc9562#section-5.5
    pub fn new_static(tag: impl AsRef<str>) -> Self {
        Self(
            Uuid::new_v5(&Self::NAMESPACE_UUID, tag.as_ref().as_bytes()),
            PhantomData,
        )
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(value: Id<T>) -> Self {
        value.0
    }
}

#[cfg(test)]
mod test {
    use crate::Id;
    use uuid::Uuid;

    #[test]
    fn new_generates_unique() {
        bolero::check!().with_type().for_each(|raw: &[u8; 16]| {
            let x = Id::<()>::from_raw(uuid::Builder::from_random_bytes(*raw).into_uuid());
            let y = Id::<()>::new();
            assert_ne!(x, y);
        });
    }

    #[test]
    fn static_ids_are_stable() {
        bolero::check!().with_type().for_each(|tag: &String| {
            let raw = Id::<()>::new_static(tag.as_str()).into_raw();
            let reference = Uuid::new_v5(&Id::<()>::NAMESPACE_UUID, tag.as_bytes());
            assert_eq!(raw, reference);
        });
    }

    #[test]
    fn raw_round_trip() {
        let id = Id::<()>::new();
        assert_eq!(id, Id::<()>::from_raw(id.into_raw()));
    }
}
