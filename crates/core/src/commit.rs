//! The differential version-history model.
//!
//! A codelist never stores its content directly. Its history is an ordered
//! sequence of [`Commit`]s; each commit bundles one [`Changeset`] per
//! affected ontology. The current membership, [`Codesets`], is materialized
//! by left-folding the commits over the empty state with
//! [`Codesets::apply`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codeset::SetOfCodeIds;
use crate::error::CoreResult;
use clb_ids::UserId;

/// All codes that were added to and removed from one ontology within a
/// commit.
///
/// Callers must not both add and remove the same code in one changeset; the
/// [`SetOfCodeIds`] guards surface such requests as errors when the
/// changeset is applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub ontology_id: String,
    pub code_ids_added: SetOfCodeIds,
    pub code_ids_removed: SetOfCodeIds,
}

impl Changeset {
    pub fn new(
        ontology_id: impl Into<String>,
        code_ids_added: SetOfCodeIds,
        code_ids_removed: SetOfCodeIds,
    ) -> Self {
        Self {
            ontology_id: ontology_id.into(),
            code_ids_added,
            code_ids_removed,
        }
    }

    /// A changeset that only adds codes.
    pub fn additions(ontology_id: impl Into<String>, code_ids_added: SetOfCodeIds) -> Self {
        Self::new(ontology_id, code_ids_added, SetOfCodeIds::new())
    }

    /// A changeset that only removes codes.
    pub fn removals(ontology_id: impl Into<String>, code_ids_removed: SetOfCodeIds) -> Self {
        Self::new(ontology_id, SetOfCodeIds::new(), code_ids_removed)
    }
}

/// One step of codelist history: an immutable, authored bundle of
/// changesets.
///
/// Commits contain at most one changeset per ontology. They are value types
/// (`Clone` copies the contained sets), and immutable once created; there is
/// no amend and no revert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    changesets: Vec<Changeset>,
    author_id: UserId,
    created_at: DateTime<Utc>,
    message: String,
}

impl Commit {
    pub fn new(
        changesets: Vec<Changeset>,
        author_id: UserId,
        created_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            changesets,
            author_id,
            created_at,
            message: message.into(),
        }
    }

    pub fn changesets(&self) -> &[Changeset] {
        &self.changesets
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The current membership of one ontology within a codelist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codeset {
    pub ontology_id: String,
    pub code_ids: SetOfCodeIds,
}

impl Codeset {
    pub fn new(ontology_id: impl Into<String>, code_ids: SetOfCodeIds) -> Self {
        Self {
            ontology_id: ontology_id.into(),
            code_ids,
        }
    }

    pub fn number_of_codes(&self) -> usize {
        self.code_ids.len()
    }

    /// Expresses this membership as a pure-addition changeset.
    pub fn to_changeset(&self) -> Changeset {
        Changeset::additions(self.ontology_id.clone(), self.code_ids.clone())
    }
}

/// The materialized membership of a codelist across all of its ontologies.
///
/// Holds one [`Codeset`] per ontology that currently has at least one member
/// code, in first-touched order, plus a version counter that starts at 1 and
/// increments by exactly one per applied commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codesets {
    codesets: Vec<Codeset>,
    version: u64,
}

impl Default for Codesets {
    fn default() -> Self {
        Self::new()
    }
}

impl Codesets {
    /// The empty state, version 1.
    pub fn new() -> Self {
        Self {
            codesets: Vec::new(),
            version: 1,
        }
    }

    /// Rebuilds a materialized state from its parts.
    pub fn from_parts(codesets: Vec<Codeset>, version: u64) -> Self {
        Self { codesets, version }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.codesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codesets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Codeset> {
        self.codesets.iter()
    }

    pub fn get(&self, ontology_id: &str) -> Option<&Codeset> {
        self.codesets.iter().find(|cs| cs.ontology_id == ontology_id)
    }

    /// Applies a commit, producing the next version.
    ///
    /// This is the fold of the version-history engine and it is pure: `self`
    /// is never mutated, and the same inputs always produce the same output.
    /// Per changeset, additions are applied before removals (the two must be
    /// disjoint, which the [`SetOfCodeIds`] guards enforce). Ontologies new
    /// to this codelist are appended; ontologies whose membership drops to
    /// zero are removed entirely. The version increments by exactly 1 no
    /// matter how many changesets the commit contains.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::DuplicateCode`] /
    /// [`crate::CoreError::MissingCode`] when the commit adds a present code
    /// or removes an absent one.
    pub fn apply(&self, commit: &Commit) -> CoreResult<Codesets> {
        let mut codesets = self.codesets.clone();

        for changeset in commit.changesets() {
            let idx = match codesets
                .iter()
                .position(|cs| cs.ontology_id == changeset.ontology_id)
            {
                Some(idx) => idx,
                None => {
                    codesets.push(Codeset::new(
                        changeset.ontology_id.clone(),
                        SetOfCodeIds::new(),
                    ));
                    codesets.len() - 1
                }
            };

            let code_ids = &mut codesets[idx].code_ids;
            code_ids.union_in_place(&changeset.code_ids_added)?;
            code_ids.difference_in_place(&changeset.code_ids_removed)?;
        }

        codesets.retain(|cs| cs.number_of_codes() > 0);

        Ok(Codesets {
            codesets,
            version: self.version + 1,
        })
    }
}

impl<'a> IntoIterator for &'a Codesets {
    type Item = &'a Codeset;
    type IntoIter = std::slice::Iter<'a, Codeset>;

    fn into_iter(self) -> Self::IntoIter {
        self.codesets.iter()
    }
}
