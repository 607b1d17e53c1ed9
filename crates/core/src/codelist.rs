//! Codelists: versioned, container-held code collections.
//!
//! A [`Codelist`] owns its append-only commit history plus at most one
//! *transient* commit, an uncommitted draft that previews the next version
//! without entering history. The materialized [`Codesets`] is derived state:
//! it is recomputed from the commit list whenever that list changes, so it
//! can always be reproduced from `commits` alone.

use chrono::Utc;
use serde::Serialize;

use crate::commit::{Codesets, Commit};
use crate::container::{Container, ContainerItem, ContainerSpec, ItemId};
use crate::error::CoreResult;
use clb_ids::{CodelistId, UserId};

/// A named, versioned set of medical codes across one or more ontologies.
#[derive(Clone, Debug, Serialize)]
pub struct Codelist {
    id: CodelistId,
    pub name: String,
    pub description: String,
    commits: Vec<Commit>,
    transient_commit: Option<Commit>,
    /// Back-reference to the collection or phenotype holding this codelist.
    container: ContainerSpec,
    /// The codelist this one was cloned or squashed from, if any.
    pub reference_id: Option<CodelistId>,
    /// Materialized state, kept in lockstep with `commits`.
    #[serde(skip)]
    codesets: Codesets,
}

impl Codelist {
    /// Creates an empty codelist (no commits, version 1).
    pub fn new(
        id: CodelistId,
        name: impl Into<String>,
        description: impl Into<String>,
        container: ContainerSpec,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            commits: Vec::new(),
            transient_commit: None,
            container,
            reference_id: None,
            codesets: Codesets::new(),
        }
    }

    /// Rebuilds a codelist from already-recorded history, e.g. when
    /// rehydrating from persistence or assembling an import.
    ///
    /// The commit list is validated by replaying it from the empty state; a
    /// transient commit, when given, must apply cleanly on top.
    ///
    /// # Errors
    ///
    /// Propagates the fold error of the first commit that does not apply.
    #[allow(clippy::too_many_arguments)]
    pub fn with_commits(
        id: CodelistId,
        name: impl Into<String>,
        description: impl Into<String>,
        commits: Vec<Commit>,
        transient_commit: Option<Commit>,
        container: ContainerSpec,
        reference_id: Option<CodelistId>,
    ) -> CoreResult<Self> {
        let mut codesets = Codesets::new();
        for commit in &commits {
            codesets = codesets.apply(commit)?;
        }
        if let Some(transient) = &transient_commit {
            codesets.apply(transient)?;
        }

        Ok(Self {
            id,
            name: name.into(),
            description: description.into(),
            commits,
            transient_commit,
            container,
            reference_id,
            codesets,
        })
    }

    /// Assembles an imported codelist around its synthesized initial
    /// commit. The commit is pure additions over the empty state, so its
    /// materialization is passed in instead of being replayed.
    pub(crate) fn from_import(
        id: CodelistId,
        name: impl Into<String>,
        description: impl Into<String>,
        commit: Commit,
        codesets: Codesets,
        container: ContainerSpec,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            commits: vec![commit],
            transient_commit: None,
            container,
            reference_id: None,
            codesets,
        }
    }

    pub fn id(&self) -> CodelistId {
        self.id
    }

    /// The committed history, oldest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn transient_commit(&self) -> Option<&Commit> {
        self.transient_commit.as_ref()
    }

    /// The materialized per-ontology membership of the committed history.
    pub fn codesets(&self) -> &Codesets {
        &self.codesets
    }

    /// The version of the committed state: 1 plus the number of commits.
    pub fn version(&self) -> u64 {
        self.codesets.version()
    }

    /// The materialized state with the transient commit applied on top, or
    /// `None` when there is no transient commit.
    ///
    /// The preview does not count towards [`version`](Self::version).
    pub fn transient_codesets(&self) -> CoreResult<Option<Codesets>> {
        match &self.transient_commit {
            None => Ok(None),
            Some(transient) => Ok(Some(self.codesets.apply(transient)?)),
        }
    }

    /// Appends a commit to history.
    ///
    /// The commit is validated by folding the current state with it; on
    /// success it is appended, any transient commit is discarded, and the
    /// materialized state moves to the next version.
    ///
    /// # Errors
    ///
    /// Propagates the fold error; the commit list is unchanged in that case.
    pub fn add_commit(&mut self, commit: Commit) -> CoreResult<()> {
        let next = self.codesets.apply(&commit)?;
        self.commits.push(commit);
        self.transient_commit = None;
        self.codesets = next;
        Ok(())
    }

    /// Stores a draft commit without touching history.
    ///
    /// The draft is validated the same way as a real commit, but `commits`
    /// and the version stay as they are.
    ///
    /// # Errors
    ///
    /// Propagates the fold error; no transient commit is stored then.
    pub fn store_transient(&mut self, commit: Commit) -> CoreResult<()> {
        self.codesets.apply(&commit)?;
        self.transient_commit = Some(commit);
        Ok(())
    }

    /// Drops the transient commit. Idempotent.
    pub fn discard_transient(&mut self) {
        self.transient_commit = None;
    }
}

impl ContainerItem for Codelist {
    fn item_id(&self) -> ItemId {
        ItemId::Codelist(self.id)
    }

    fn container(&self) -> ContainerSpec {
        self.container
    }

    fn set_container(&mut self, spec: ContainerSpec) {
        self.container = spec;
    }
}

/// Finds a name for a cloned codelist that does not collide with its
/// siblings: the original name if free, then "{name} (copy)",
/// "{name} (copy 2)", "{name} (copy 3)", ...
pub fn create_cloned_codelist_name(codelist_name: &str, illegal_names: &[String]) -> String {
    let taken = |candidate: &str| illegal_names.iter().any(|n| n == candidate);

    if !taken(codelist_name) {
        return codelist_name.to_string();
    }

    let mut candidate = format!("{codelist_name} (copy)");
    let mut i = 2;
    while taken(&candidate) {
        candidate = format!("{codelist_name} (copy {i})");
        i += 1;
    }
    candidate
}

/// Collapses a codelist's entire history into a single commit.
///
/// The new codelist has exactly one commit whose changesets express the
/// source's materialized state as pure additions, one changeset per
/// ontology. The materialized state is preserved exactly; only the history
/// is flattened (the result is always at version 2). A transient commit on
/// the source is carried over as a fresh transient commit authored by
/// `author_id`.
///
/// Used when cloning a phenotype: history is not meaningful to share across
/// independent copies, but the current state must be.
pub fn squash_codelist(codelist: &Codelist, new_id: CodelistId, author_id: UserId) -> Codelist {
    let provenance = format!("Squashed from codelist {} ({})", codelist.name, codelist.id);

    let squashed_commit = Commit::new(
        codelist.codesets().iter().map(|cs| cs.to_changeset()).collect(),
        author_id,
        Utc::now(),
        provenance.clone(),
    );

    let transient_commit = codelist.transient_commit().map(|transient| {
        Commit::new(
            transient.changesets().to_vec(),
            author_id,
            Utc::now(),
            "transient",
        )
    });

    // The single commit reproduces the source's materialized state, so the
    // cache can be built directly instead of replaying.
    let codesets = Codesets::from_parts(codelist.codesets().iter().cloned().collect(), 2);

    Codelist {
        id: new_id,
        name: codelist.name.clone(),
        description: format!("{provenance}\n\n{}", codelist.description),
        commits: vec![squashed_commit],
        transient_commit,
        container: codelist.container(),
        reference_id: Some(codelist.id()),
        codesets,
    }
}

/// Detaches `codelist` from `container` and clears the back-reference of
/// every codelist in `referencing_codelists` that pointed at it.
///
/// The caller is responsible for deleting the codelist itself from
/// persistence and for saving the mutated aggregates.
pub fn delete_codelist(
    container: &mut dyn Container,
    codelist: &Codelist,
    referencing_codelists: &mut [Codelist],
) {
    container.items_mut().remove_item(codelist.item_id());

    for cl in referencing_codelists {
        cl.reference_id = None;
    }
}
