//! Import merge: building a codelist's initial commit from external data.
//!
//! Callers resolve raw code strings against the ontology catalogue first
//! (see [`crate::services::CodelistService::import`]); this module merges
//! the resolved per-ontology sets into a single initial commit and composes
//! the human-readable import report. Resolution misses are degraded into the
//! report, never raised.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::codelist::Codelist;
use crate::codeset::SetOfCodeIds;
use crate::commit::{Changeset, Codeset, Codesets, Commit};
use crate::container::ContainerSpec;
use clb_ids::{CodelistId, UserId};

/// One ontology's worth of import input after code resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCodeset {
    pub ontology_id: String,
    /// The successfully resolved code ids.
    pub code_ids: SetOfCodeIds,
    pub num_invalid_codes: usize,
    pub num_total_codes: usize,
    /// The raw code strings that did not resolve.
    pub invalid_codes: Vec<String>,
}

/// The outcome summary of importing one codelist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// True when any ontology was skipped or any code failed to resolve.
    pub partial_import: bool,
    pub report: String,
}

/// Builds a codelist from validated import data.
///
/// A single commit is synthesized from the resolved code ids across all
/// ontologies; ontologies without any valid code must already have been
/// filtered into `skipped_ontologies` (they are reported, not an error).
/// `new_codelist_id` is only invoked when there is something to import.
///
/// Returns `None` when no ontology contributed any resolvable code.
pub fn import_codelist(
    name: &str,
    filename: &str,
    codesets: &[ValidatedCodeset],
    skipped_ontologies: &[String],
    new_codelist_id: impl FnOnce() -> CodelistId,
    author_id: UserId,
    container_spec: ContainerSpec,
) -> Option<(Codelist, ImportReport)> {
    if codesets.is_empty() {
        return None;
    }

    let mut partial_import = !skipped_ontologies.is_empty();
    let mut changesets: Vec<Changeset> = Vec::new();

    for codeset in codesets {
        if codeset.code_ids.is_empty() {
            continue;
        }
        if codeset.num_invalid_codes > 0 {
            partial_import = true;
        }
        changesets.push(Changeset::additions(
            codeset.ontology_id.clone(),
            codeset.code_ids.clone(),
        ));
    }

    if changesets.is_empty() {
        return None;
    }

    let (commit_message, description) =
        create_import_messages(codesets, skipped_ontologies, name, filename);

    let commit = Commit::new(changesets.clone(), author_id, Utc::now(), commit_message);

    // The initial commit is pure additions, so the materialized state is the
    // changesets themselves at version 2.
    let materialized = Codesets::from_parts(
        changesets
            .into_iter()
            .map(|cs| Codeset::new(cs.ontology_id, cs.code_ids_added))
            .collect(),
        2,
    );

    let codelist = Codelist::from_import(
        new_codelist_id(),
        name,
        description.clone(),
        commit,
        materialized,
        container_spec,
    );

    Some((
        codelist,
        ImportReport {
            partial_import,
            report: description,
        },
    ))
}

fn create_import_messages(
    codesets: &[ValidatedCodeset],
    skipped_ontologies: &[String],
    codelist_name: &str,
    filename: &str,
) -> (String, String) {
    let code_count_summary = codesets
        .iter()
        .filter(|cs| !cs.code_ids.is_empty())
        .map(|cs| format!("{}: {}/{}", cs.ontology_id, cs.code_ids.len(), cs.num_total_codes))
        .collect::<Vec<_>>()
        .join(", ");
    let sum_imported: usize = codesets.iter().map(|cs| cs.code_ids.len()).sum();

    let mut commit_message = format!(
        "Imported '{codelist_name}' from file '{filename}' with {sum_imported} codes \
         from {} ontologies ({code_count_summary}).",
        codesets.len()
    );

    if !skipped_ontologies.is_empty() {
        commit_message.push_str(
            " The following ontologies were skipped because they didn't have any valid codes: ",
        );
        commit_message.push_str(&skipped_ontologies.join(", "));
    }

    let mut codelist_description = commit_message.clone();
    if codesets.iter().any(|cs| !cs.invalid_codes.is_empty()) {
        codelist_description.push_str("\n\nThe following codes were not imported:\n");
        codelist_description.push_str(
            &codesets
                .iter()
                .filter(|cs| !cs.invalid_codes.is_empty())
                .map(|cs| format!("{}: {}", cs.ontology_id, cs.invalid_codes.join(",")))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    (commit_message, codelist_description)
}
