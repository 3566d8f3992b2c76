// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pseudo-class tags and value-semantic tag sets.

use core::fmt;

use smallvec::SmallVec;
use smol_str::SmolStr;

/// A dynamic state tag such as `hover` or `focused`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PseudoClass(SmolStr);

impl PseudoClass {
    /// The tag the scene sets on its focus owner.
    pub const FOCUSED: &'static str = "focused";

    /// Creates a pseudo-class from its name (without the leading `:`).
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl From<&str> for PseudoClass {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A sorted, duplicate-free set of pseudo-classes.
///
/// This is a plain value: cloning takes a snapshot, and equality and hashing
/// depend only on the members. Style cache keys are built from these
/// snapshots, so later changes to a node's state never alter a stored key.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PseudoClassSet {
    items: SmallVec<[PseudoClass; 2]>,
}

impl PseudoClassSet {
    /// The empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `pc`, returning whether it was newly added.
    pub fn insert(&mut self, pc: PseudoClass) -> bool {
        match self.items.binary_search(&pc) {
            Ok(_) => false,
            Err(pos) => {
                self.items.insert(pos, pc);
                true
            }
        }
    }

    /// Removes `pc`, returning whether it was present.
    pub fn remove(&mut self, pc: &PseudoClass) -> bool {
        match self.items.binary_search(pc) {
            Ok(pos) => {
                self.items.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Whether `pc` is a member.
    #[must_use]
    pub fn contains(&self, pc: &PseudoClass) -> bool {
        self.items.binary_search(pc).is_ok()
    }

    /// Whether every member of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.items.iter().all(|pc| other.contains(pc))
    }

    /// Adds every member of `other`.
    pub fn union_with(&mut self, other: &Self) {
        for pc in &other.items {
            self.insert(pc.clone());
        }
    }

    /// Returns the members present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|pc| other.contains(pc))
                .cloned()
                .collect(),
        }
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterates the members in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &PseudoClass> {
        self.items.iter()
    }
}

impl fmt::Debug for PseudoClassSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

impl<P: Into<PseudoClass>> FromIterator<P> for PseudoClassSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = Self::new();
        for pc in iter {
            set.insert(pc.into());
        }
        set
    }
}
