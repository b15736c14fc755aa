//! Numeric keys and the composite ordering used inside the tree.

use std::cmp::Ordering;
use std::fmt;

use crate::error::TreeError;

/// A numeric key that is guaranteed to be comparable.
///
/// NaN is rejected at construction and `-0.0` is folded into `0.0`, so the
/// bitwise total order used for comparisons agrees with `==` on the wrapped
/// value.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Key(f64);

impl Key {
    pub fn new(value: f64) -> Result<Self, TreeError> {
        if value.is_nan() {
            return Err(TreeError::InvalidKey(value));
        }
        // -0.0 + 0.0 == +0.0
        Ok(Self(value + 0.0))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Key {
    type Error = TreeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Key> for f64 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A payload that carries the identity used to break ties between equal keys.
///
/// Two entries with the same numeric key are ordered by their identities;
/// inserting an entry whose `(key, id)` pair already exists replaces the
/// stored payload instead of adding a node.
pub trait Record {
    type Id: Ord + ?Sized;

    fn id(&self) -> &Self::Id;
}

impl Record for String {
    type Id = str;

    fn id(&self) -> &str {
        self
    }
}

impl Record for &str {
    type Id = str;

    fn id(&self) -> &str {
        self
    }
}

/// Compares `(key, id)` against an entry's composite key.
#[inline]
pub(crate) fn cmp_composite<I: Ord + ?Sized>(
    key: Key,
    id: &I,
    other_key: Key,
    other_id: &I,
) -> Ordering {
    key.cmp(&other_key).then_with(|| id.cmp(other_id))
}
