//! Code-set arithmetic with strict append/retract guards.
//!
//! [`SetOfCodeIds`] is the atomic building block of the version-history
//! engine. It is *not* a general-purpose set type: adding a code that is
//! already present, or removing one that is absent, indicates a caller bug
//! (for example two changesets in one commit touching the same code) and
//! fails immediately instead of being silently absorbed. Generic set algebra
//! (intersection, symmetric difference, subset comparisons) is deliberately
//! not provided.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A set of numeric code identifiers.
///
/// Construction from an iterator deduplicates silently (plain set
/// semantics); the arithmetic operations are the guarded ones:
///
/// - [`add`](Self::add) fails when the code is already present,
/// - [`union`](Self::union) fails when the two sets overlap,
/// - [`difference`](Self::difference) fails when any code of the subtrahend
///   is absent from `self`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetOfCodeIds(BTreeSet<i64>);

impl SetOfCodeIds {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single code id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateCode`] if the id is already present.
    pub fn add(&mut self, code_id: i64) -> CoreResult<()> {
        if !self.0.insert(code_id) {
            return Err(CoreError::DuplicateCode(code_id));
        }
        Ok(())
    }

    /// Returns a new set containing the codes of both sets.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateCode`] if the sets overlap.
    pub fn union(&self, other: &SetOfCodeIds) -> CoreResult<SetOfCodeIds> {
        let mut result = self.clone();
        result.union_in_place(other)?;
        Ok(result)
    }

    /// In-place variant of [`union`](Self::union).
    ///
    /// On error the set is left unmodified.
    pub fn union_in_place(&mut self, other: &SetOfCodeIds) -> CoreResult<()> {
        if let Some(code_id) = other.0.iter().find(|id| self.0.contains(id)) {
            return Err(CoreError::DuplicateCode(*code_id));
        }
        self.0.extend(other.0.iter().copied());
        Ok(())
    }

    /// Returns a new set containing the codes of `self` without those of
    /// `other`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingCode`] if any code of `other` is absent
    /// from `self`.
    pub fn difference(&self, other: &SetOfCodeIds) -> CoreResult<SetOfCodeIds> {
        let mut result = self.clone();
        result.difference_in_place(other)?;
        Ok(result)
    }

    /// In-place variant of [`difference`](Self::difference).
    ///
    /// On error the set is left unmodified.
    pub fn difference_in_place(&mut self, other: &SetOfCodeIds) -> CoreResult<()> {
        if let Some(code_id) = other.0.iter().find(|id| !self.0.contains(id)) {
            return Err(CoreError::MissingCode(*code_id));
        }
        for code_id in &other.0 {
            self.0.remove(code_id);
        }
        Ok(())
    }

    pub fn contains(&self, code_id: i64) -> bool {
        self.0.contains(&code_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the code ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<i64> for SetOfCodeIds {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[i64; N]> for SetOfCodeIds {
    fn from(code_ids: [i64; N]) -> Self {
        code_ids.into_iter().collect()
    }
}
