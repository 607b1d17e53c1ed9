//! Codelist operations: lifecycle, placement and history.

use tracing::debug;

use crate::codelist::{create_cloned_codelist_name, delete_codelist, Codelist};
use crate::codeset::SetOfCodeIds;
use crate::commit::{Changeset, Commit};
use crate::constants::DEFAULT_CODELIST_DESCRIPTION;
use crate::container::{add_or_move_item, Container, ContainerItem, ContainerSpec, ItemId, ItemType};
use crate::error::{CoreError, CoreResult};
use crate::importer::{import_codelist, ValidatedCodeset};
use crate::repo::{CodeRepository, CodelistRepository, OntologyRepository, Session};
use crate::services::base::{
    codelist_ids, ensure_unlocked, identify_ref, is_readable_by, is_writable_by, load_container,
    load_container_filtered, root_collection_of, root_collection_of_container, ReferencePosition,
};
use crate::user::User;
use chrono::Utc;
use clb_ids::CodelistId;

pub struct CreateCodelistRequest {
    pub name: String,
    pub description: Option<String>,
    pub position: ReferencePosition,
    pub reference_id: Option<CodelistId>,
}

pub struct UpdateCodelistRequest {
    pub codelist_id: CodelistId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub reference_id: Option<CodelistId>,
}

pub struct CloneCodelistRequest {
    pub codelist_id: CodelistId,
    /// Where the clone goes; defaults to directly after the original.
    pub position: Option<ReferencePosition>,
}

pub struct MoveCodelistRequest {
    pub codelist_id: CodelistId,
    pub position: ReferencePosition,
}

/// One ontology's changes as supplied by a caller.
pub struct ChangesetInput {
    pub ontology_id: String,
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}

impl ChangesetInput {
    fn into_changeset(self) -> Changeset {
        Changeset::new(
            self.ontology_id,
            self.added.into_iter().collect::<SetOfCodeIds>(),
            self.removed.into_iter().collect::<SetOfCodeIds>(),
        )
    }
}

pub struct CommitInput {
    pub message: String,
    pub changes: Vec<ChangesetInput>,
}

pub struct CommitChangesRequest {
    pub codelist_id: CodelistId,
    pub commit: CommitInput,
}

pub struct StoreTransientChangesRequest {
    pub codelist_id: CodelistId,
    pub changes: Vec<ChangesetInput>,
}

/// Raw per-ontology code strings of one codelist to import.
pub struct CodesetInput {
    pub ontology_id: String,
    pub codes: Vec<String>,
}

pub struct CodelistInput {
    pub name: String,
    pub codesets: Vec<CodesetInput>,
}

pub struct ImportCodelistsRequest {
    pub container: ContainerSpec,
    pub filename: String,
    pub codelists: Vec<CodelistInput>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub fully: usize,
    pub partially: usize,
    pub skipped: usize,
}

#[derive(Clone, Debug)]
pub struct ImportReportEntry {
    pub codelist_name: String,
    pub skipped: bool,
    pub codelist_id: Option<CodelistId>,
    pub report: String,
    pub partial: bool,
}

#[derive(Clone, Debug)]
pub struct ImportCodelistsResponse {
    pub stats: ImportStats,
    pub reports: Vec<ImportReportEntry>,
}

/// Codelist operations on behalf of one acting user.
pub struct CodelistService<'a> {
    session: &'a mut Session,
    user: User,
}

impl<'a> CodelistService<'a> {
    pub fn new(session: &'a mut Session, user: User) -> Self {
        Self { session, user }
    }

    /// Loads a codelist and checks the required permission. Not-found and
    /// not-accessible are indistinguishable by design.
    fn load_codelist(&self, codelist_id: CodelistId, writable: bool) -> CoreResult<Codelist> {
        let codelist = self
            .session
            .codelists
            .get(codelist_id)
            .ok_or(CoreError::CodelistNotFound(codelist_id))?;

        let permitted = if writable {
            is_writable_by(self.session, &self.user, &codelist)?
        } else {
            is_readable_by(self.session, &self.user, &codelist)?
        };
        if !permitted {
            return Err(CoreError::CodelistNotFound(codelist_id));
        }

        Ok(codelist)
    }

    /// Creates a new, empty codelist at the requested position.
    pub fn create(&mut self, req: CreateCodelistRequest) -> CoreResult<Codelist> {
        let (mut ref_ctr, ref_item) =
            identify_ref(self.session, &req.position, None, Some(ItemType::Codelist))?;

        let root = root_collection_of_container(self.session, &ref_ctr)?;
        if !self.user.workspace.contains_collection(root.id()) {
            return Err(CoreError::ContainerNotFound(ref_ctr.spec()));
        }
        ensure_unlocked(&root)?;

        let mut codelist = Codelist::new(
            self.session.codelists.new_id(),
            req.name,
            req.description
                .unwrap_or_else(|| DEFAULT_CODELIST_DESCRIPTION.to_string()),
            ref_ctr.spec(),
        );
        codelist.reference_id = req.reference_id;

        add_or_move_item(None, &mut codelist, ref_ctr.as_container_mut(), ref_item)?;

        self.session.codelists.save(codelist.clone());
        ref_ctr.save(self.session);

        Ok(codelist)
    }

    /// Updates name, description and/or reference of a codelist.
    pub fn update(&mut self, req: UpdateCodelistRequest) -> CoreResult<Codelist> {
        let mut codelist = self.load_codelist(req.codelist_id, true)?;

        let root = root_collection_of(self.session, &codelist)?;
        ensure_unlocked(&root)?;

        if let Some(name) = req.name {
            codelist.name = name;
        }
        if let Some(description) = req.description {
            codelist.description = description;
        }
        if let Some(reference_id) = req.reference_id {
            codelist.reference_id = Some(reference_id);
        }

        self.session.codelists.save(codelist.clone());
        Ok(codelist)
    }

    /// Deletes a codelist, detaching it from its container and clearing the
    /// back-reference of every codelist that pointed at it.
    pub fn delete(&mut self, codelist_id: CodelistId) -> CoreResult<()> {
        let codelist = self.load_codelist(codelist_id, true)?;
        let mut container = load_container(self.session, codelist.container())?;

        let root = root_collection_of_container(self.session, &container)?;
        ensure_unlocked(&root)?;

        let mut referencing = self.session.codelists.find_referencing(codelist_id);
        delete_codelist(container.as_container_mut(), &codelist, &mut referencing);

        for cl in referencing {
            self.session.codelists.save(cl);
        }
        container.save(self.session);
        self.session.codelists.delete(codelist_id);

        debug!(codelist = %codelist_id, "deleted codelist");
        Ok(())
    }

    /// Clones a codelist, history included, under a collision-proofed name.
    pub fn clone_codelist(&mut self, req: CloneCodelistRequest) -> CoreResult<Codelist> {
        let codelist = self.load_codelist(req.codelist_id, true)?;

        let (mut ref_ctr, ref_item) = match req.position {
            None => (
                load_container(self.session, codelist.container())?,
                Some(codelist.item_id()),
            ),
            Some(position) => identify_ref(
                self.session,
                &position,
                Some(codelist.container()),
                Some(ItemType::Codelist),
            )?,
        };

        let root = root_collection_of_container(self.session, &ref_ctr)?;
        if !self.user.workspace.contains_collection(root.id()) {
            return Err(CoreError::ContainerNotFound(ref_ctr.spec()));
        }
        ensure_unlocked(&root)?;

        let sibling_ids = codelist_ids(ref_ctr.as_container().items());
        let illegal_names: Vec<String> = self
            .session
            .codelists
            .get_all(&sibling_ids)
            .into_iter()
            .map(|cl| cl.name)
            .collect();

        let mut new_codelist = Codelist::with_commits(
            self.session.codelists.new_id(),
            create_cloned_codelist_name(&codelist.name, &illegal_names),
            codelist.description.clone(),
            codelist.commits().to_vec(),
            codelist.transient_commit().cloned(),
            ref_ctr.spec(),
            Some(codelist.id()),
        )?;

        add_or_move_item(None, &mut new_codelist, ref_ctr.as_container_mut(), ref_item)?;

        self.session.codelists.save(new_codelist.clone());
        ref_ctr.save(self.session);

        Ok(new_codelist)
    }

    /// Moves a codelist, possibly into a different container.
    ///
    /// The destination is a [`ReferencePosition`]: with no container the
    /// codelist stays in its current one, with no item it moves to the
    /// first position.
    pub fn move_codelist(&mut self, req: MoveCodelistRequest) -> CoreResult<()> {
        let mut codelist = self.load_codelist(req.codelist_id, true)?;
        let source_spec = codelist.container();

        let (mut ref_ctr, ref_item) = identify_ref(
            self.session,
            &req.position,
            Some(source_spec),
            Some(ItemType::Codelist),
        )?;

        let dest_root = root_collection_of_container(self.session, &ref_ctr)?;
        if !self.user.workspace.contains_collection(dest_root.id()) {
            return Err(CoreError::ContainerNotFound(ref_ctr.spec()));
        }
        ensure_unlocked(&dest_root)?;

        let source_root = root_collection_of(self.session, &codelist)?;
        ensure_unlocked(&source_root)?;

        if ref_ctr.spec() == source_spec {
            // reorder within one container
            add_or_move_item(None, &mut codelist, ref_ctr.as_container_mut(), ref_item)?;
            self.session.codelists.save(codelist);
            ref_ctr.save(self.session);
        } else {
            let mut source = load_container(self.session, source_spec)?;
            add_or_move_item(
                Some(source.as_container_mut()),
                &mut codelist,
                ref_ctr.as_container_mut(),
                ref_item,
            )?;
            self.session.codelists.save(codelist);
            source.save(self.session);
            ref_ctr.save(self.session);
        }

        Ok(())
    }

    /// Commits a new version of a codelist.
    pub fn commit_changes(&mut self, req: CommitChangesRequest) -> CoreResult<Codelist> {
        let mut codelist = self.load_codelist(req.codelist_id, true)?;

        let root = root_collection_of(self.session, &codelist)?;
        ensure_unlocked(&root)?;

        let changesets = req
            .commit
            .changes
            .into_iter()
            .map(ChangesetInput::into_changeset)
            .collect();

        codelist.add_commit(Commit::new(
            changesets,
            self.user.id,
            Utc::now(),
            req.commit.message,
        ))?;

        self.session.codelists.save(codelist.clone());
        Ok(codelist)
    }

    /// Stores uncommitted draft changes on a codelist.
    pub fn store_transient_changes(
        &mut self,
        req: StoreTransientChangesRequest,
    ) -> CoreResult<Codelist> {
        let mut codelist = self.load_codelist(req.codelist_id, true)?;

        let root = root_collection_of(self.session, &codelist)?;
        ensure_unlocked(&root)?;

        let changesets = req
            .changes
            .into_iter()
            .map(ChangesetInput::into_changeset)
            .collect();

        codelist.store_transient(Commit::new(
            changesets,
            self.user.id,
            Utc::now(),
            "transient",
        ))?;

        self.session.codelists.save(codelist.clone());
        Ok(codelist)
    }

    /// Discards the draft changes of a codelist, if any.
    pub fn discard_transient_changes(&mut self, codelist_id: CodelistId) -> CoreResult<Codelist> {
        let mut codelist = self.load_codelist(codelist_id, true)?;

        let root = root_collection_of(self.session, &codelist)?;
        ensure_unlocked(&root)?;

        codelist.discard_transient();

        self.session.codelists.save(codelist.clone());
        Ok(codelist)
    }

    /// Imports codelists from an external source.
    ///
    /// Each entry receives a report; entries without any resolvable code
    /// are skipped, not failed. Structural problems (name collision within
    /// the container or the request, an ontology repeated in one entry, a
    /// reference to a nonexistent ontology) reject the request.
    pub fn import(&mut self, req: ImportCodelistsRequest) -> CoreResult<ImportCodelistsResponse> {
        let mut container =
            load_container_filtered(self.session, req.container, Some(ItemType::Codelist))?;

        let root = root_collection_of_container(self.session, &container)?;
        if !self.user.workspace.contains_collection(root.id()) {
            return Err(CoreError::ContainerNotFound(container.spec()));
        }
        ensure_unlocked(&root)?;

        let container_spec = container.spec();
        let existing_ids = codelist_ids(container.as_container().items());
        let mut existing_names: Vec<String> = self
            .session
            .codelists
            .get_all(&existing_ids)
            .into_iter()
            .map(|cl| cl.name)
            .collect();

        // every imported codelist lands after the last pre-existing one;
        // iterating the input back to front keeps the input order
        let ref_item = existing_ids.last().map(|id| ItemId::Codelist(*id));

        let mut stats = ImportStats::default();
        let mut reports = Vec::new();

        for codelist_data in req.codelists.iter().rev() {
            let mut entry = ImportReportEntry {
                codelist_name: codelist_data.name.clone(),
                skipped: true,
                codelist_id: None,
                report: String::new(),
                partial: false,
            };

            let (validated, skipped_ontologies) =
                self.validate_input(codelist_data, &existing_names)?;

            let import_result = import_codelist(
                &codelist_data.name,
                &req.filename,
                &validated,
                &skipped_ontologies,
                || self.session.codelists.new_id(),
                self.user.id,
                container_spec,
            );

            let Some((mut codelist, import_report)) = import_result else {
                debug!(codelist = %codelist_data.name, "nothing to import, skipping");
                stats.skipped += 1;
                reports.push(entry);
                continue;
            };

            add_or_move_item(None, &mut codelist, container.as_container_mut(), ref_item)?;
            self.session.codelists.save(codelist.clone());
            existing_names.push(codelist_data.name.clone());

            entry.skipped = false;
            entry.codelist_id = Some(codelist.id());
            entry.report = import_report.report;
            entry.partial = import_report.partial_import;
            if import_report.partial_import {
                stats.partially += 1;
            } else {
                stats.fully += 1;
            }
            reports.push(entry);
        }

        container.save(self.session);

        Ok(ImportCodelistsResponse { stats, reports })
    }

    /// Validates one import entry and resolves its codes.
    ///
    /// Returns the per-ontology resolution results plus the ontologies that
    /// ended up without a single valid code.
    fn validate_input(
        &self,
        codelist_data: &CodelistInput,
        existing_names: &[String],
    ) -> CoreResult<(Vec<ValidatedCodeset>, Vec<String>)> {
        if existing_names.iter().any(|n| *n == codelist_data.name) {
            return Err(CoreError::NameCollision(codelist_data.name.clone()));
        }

        let mut seen = std::collections::BTreeSet::new();
        for codeset in &codelist_data.codesets {
            if !seen.insert(codeset.ontology_id.as_str()) {
                return Err(CoreError::DuplicateOntology(codeset.ontology_id.clone()));
            }
        }

        let known: std::collections::BTreeSet<String> = self
            .session
            .ontologies
            .get_all()
            .into_iter()
            .map(|o| o.id)
            .collect();
        let unknown: Vec<&str> = codelist_data
            .codesets
            .iter()
            .map(|cs| cs.ontology_id.as_str())
            .filter(|id| !known.contains(*id))
            .collect();
        if !unknown.is_empty() {
            return Err(CoreError::UnknownOntologies(unknown.join(", ")));
        }

        let mut validated = Vec::new();
        let mut skipped_ontologies = Vec::new();

        for codeset in &codelist_data.codesets {
            let cleaned: Vec<String> = codeset.codes.iter().map(|c| c.trim().to_string()).collect();
            let resolved = self.session.codes.find_codes(&cleaned, &codeset.ontology_id);

            let code_ids: SetOfCodeIds =
                resolved.iter().filter_map(|(_, id)| *id).collect();
            let invalid_codes: Vec<String> = resolved
                .iter()
                .filter(|(_, id)| id.is_none())
                .map(|(code, _)| code.clone())
                .collect();

            if code_ids.is_empty() {
                skipped_ontologies.push(codeset.ontology_id.clone());
                continue;
            }

            validated.push(ValidatedCodeset {
                ontology_id: codeset.ontology_id.clone(),
                num_invalid_codes: invalid_codes.len(),
                num_total_codes: code_ids.len() + invalid_codes.len(),
                code_ids,
                invalid_codes,
            });
        }

        Ok((validated, skipped_ontologies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::repo::CollectionRepository;
    use crate::services::fixtures::fixture;
    use clb_ids::CollectionId;

    fn commit_request(
        codelist_id: CodelistId,
        ontology: &str,
        added: &[i64],
        removed: &[i64],
    ) -> CommitChangesRequest {
        CommitChangesRequest {
            codelist_id,
            commit: CommitInput {
                message: "changes".into(),
                changes: vec![ChangesetInput {
                    ontology_id: ontology.into(),
                    added: added.to_vec(),
                    removed: removed.to_vec(),
                }],
            },
        }
    }

    #[test]
    fn test_create_positions_codelist() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let first = fx.add_codelist_to_collection(collection_id, 11, "first");

        let created = fx
            .codelist_service()
            .create(CreateCodelistRequest {
                name: "second".into(),
                description: None,
                position: ReferencePosition {
                    container: Some(ContainerSpec::Collection(collection_id)),
                    item_id: Some(ItemId::Codelist(first)),
                },
                reference_id: None,
            })
            .unwrap();

        assert_eq!(created.description, DEFAULT_CODELIST_DESCRIPTION);
        assert_eq!(
            created.container(),
            ContainerSpec::Collection(collection_id)
        );

        let collection = fx.session.collections.get(collection_id).unwrap();
        assert_eq!(
            collection.items().ids(),
            &[ItemId::Codelist(first), ItemId::Codelist(created.id())]
        );
        assert!(fx.session.codelists.get(created.id()).is_some());
    }

    #[test]
    fn test_create_rejects_foreign_container() {
        let mut fx = fixture();
        let stranger = fx.add_user(2);
        let foreign = fx.add_foreign_collection(10, &stranger, ItemType::Codelist);

        let got = fx.codelist_service().create(CreateCodelistRequest {
            name: "CL".into(),
            description: None,
            position: ReferencePosition {
                container: Some(ContainerSpec::Collection(foreign)),
                item_id: None,
            },
            reference_id: None,
        });
        assert!(matches!(got, Err(CoreError::ContainerNotFound(_))));
    }

    #[test]
    fn test_commit_bumps_version_and_clears_transient() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "CL");

        fx.codelist_service()
            .store_transient_changes(StoreTransientChangesRequest {
                codelist_id,
                changes: vec![ChangesetInput {
                    ontology_id: "ICD-10-CM".into(),
                    added: vec![1],
                    removed: vec![],
                }],
            })
            .unwrap();

        let got = fx
            .codelist_service()
            .commit_changes(commit_request(codelist_id, "ICD-10-CM", &[1, 2], &[]))
            .unwrap();

        assert_eq!(got.version(), 2);
        assert!(got.transient_commit().is_none());
        assert_eq!(
            got.codesets().get("ICD-10-CM").unwrap().code_ids,
            SetOfCodeIds::from([1, 2])
        );
    }

    #[test]
    fn test_invalid_commit_rejected_and_not_persisted() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "CL");

        let got = fx
            .codelist_service()
            .commit_changes(commit_request(codelist_id, "ICD-10-CM", &[], &[7]));
        assert!(matches!(got, Err(CoreError::MissingCode(7))));

        let stored = fx.session.codelists.get(codelist_id).unwrap();
        assert_eq!(stored.version(), 1);
        assert!(stored.commits().is_empty());
    }

    #[test]
    fn test_locked_root_blocks_mutations() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "CL");
        fx.lock_collection(collection_id);

        let commit = fx
            .codelist_service()
            .commit_changes(commit_request(codelist_id, "ICD-10-CM", &[1], &[]));
        assert!(matches!(commit, Err(CoreError::CollectionLocked(_))));

        let rename = fx.codelist_service().update(UpdateCodelistRequest {
            codelist_id,
            name: Some("renamed".into()),
            description: None,
            reference_id: None,
        });
        assert!(matches!(rename, Err(CoreError::CollectionLocked(_))));

        let delete = fx.codelist_service().delete(codelist_id);
        assert!(matches!(delete, Err(CoreError::CollectionLocked(_))));

        assert_eq!(fx.session.codelists.get(codelist_id).unwrap().name, "CL");
    }

    #[test]
    fn test_lock_propagates_through_phenotype() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Phenotype);
        let phenotype_id = fx.add_phenotype(collection_id, 20, "PH");
        let codelist_id = fx.add_codelist_to_phenotype(phenotype_id, 30, "CL");
        fx.lock_collection(collection_id);

        let got = fx
            .codelist_service()
            .commit_changes(commit_request(codelist_id, "ICD-10-CM", &[1], &[]));
        assert!(matches!(got, Err(CoreError::CollectionLocked(_))));
    }

    #[test]
    fn test_move_between_containers_rewrites_back_reference() {
        let mut fx = fixture();
        let collection_a = fx.add_collection(10, ItemType::Codelist);
        let collection_b = fx.add_collection(20, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_a, 11, "CL");
        let target_first = fx.add_codelist_to_collection(collection_b, 21, "existing");

        fx.codelist_service()
            .move_codelist(MoveCodelistRequest {
                codelist_id,
                position: ReferencePosition {
                    container: Some(ContainerSpec::Collection(collection_b)),
                    item_id: Some(ItemId::Codelist(target_first)),
                },
            })
            .unwrap();

        let source = fx.session.collections.get(collection_a).unwrap();
        let dest = fx.session.collections.get(collection_b).unwrap();
        assert!(source.items().is_empty());
        assert_eq!(
            dest.items().ids(),
            &[ItemId::Codelist(target_first), ItemId::Codelist(codelist_id)]
        );
        assert_eq!(
            fx.session.codelists.get(codelist_id).unwrap().container(),
            ContainerSpec::Collection(collection_b)
        );
    }

    #[test]
    fn test_move_after_itself_is_rejected() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "CL");

        let got = fx.codelist_service().move_codelist(MoveCodelistRequest {
            codelist_id,
            position: ReferencePosition {
                container: None,
                item_id: Some(ItemId::Codelist(codelist_id)),
            },
        });
        assert!(matches!(got, Err(CoreError::SelfMove)));
    }

    #[test]
    fn test_clone_picks_free_name_and_copies_history() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "Angina");
        fx.codelist_service()
            .commit_changes(commit_request(codelist_id, "ICD-10-CM", &[1, 2], &[]))
            .unwrap();

        let first_clone = fx
            .codelist_service()
            .clone_codelist(CloneCodelistRequest {
                codelist_id,
                position: None,
            })
            .unwrap();
        assert_eq!(first_clone.name, "Angina (copy)");
        assert_eq!(first_clone.reference_id, Some(codelist_id));
        assert_eq!(first_clone.commits().len(), 1);
        assert_eq!(
            first_clone.codesets().get("ICD-10-CM").unwrap().code_ids,
            SetOfCodeIds::from([1, 2])
        );

        let second_clone = fx
            .codelist_service()
            .clone_codelist(CloneCodelistRequest {
                codelist_id,
                position: None,
            })
            .unwrap();
        assert_eq!(second_clone.name, "Angina (copy 2)");

        // the clones sit directly after the original
        let collection = fx.session.collections.get(collection_id).unwrap();
        assert_eq!(
            collection.items().ids(),
            &[
                ItemId::Codelist(codelist_id),
                ItemId::Codelist(second_clone.id()),
                ItemId::Codelist(first_clone.id()),
            ]
        );
    }

    #[test]
    fn test_delete_clears_references() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "CL");
        let referencing_id = fx.add_codelist_to_collection(collection_id, 12, "other");

        let mut referencing = fx.session.codelists.get(referencing_id).unwrap();
        referencing.reference_id = Some(codelist_id);
        fx.session.codelists.save(referencing);

        fx.codelist_service().delete(codelist_id).unwrap();

        assert!(fx.session.codelists.get(codelist_id).is_none());
        assert_eq!(
            fx.session.codelists.get(referencing_id).unwrap().reference_id,
            None
        );
        let collection = fx.session.collections.get(collection_id).unwrap();
        assert!(!collection.items().contains(ItemId::Codelist(codelist_id)));
    }

    #[test]
    fn test_hidden_codelist_reads_as_not_found() {
        let mut fx = fixture();
        let stranger = fx.add_user(2);
        let foreign = fx.add_foreign_collection(10, &stranger, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(foreign, 11, "CL");

        let got = fx.codelist_service().update(UpdateCodelistRequest {
            codelist_id,
            name: Some("renamed".into()),
            description: None,
            reference_id: None,
        });
        assert!(matches!(got, Err(CoreError::CodelistNotFound(_))));
    }

    #[test]
    fn test_import_keeps_input_order_and_reports() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let existing = fx.add_codelist_to_collection(collection_id, 11, "existing");

        let response = fx
            .codelist_service()
            .import(ImportCodelistsRequest {
                container: ContainerSpec::Collection(collection_id),
                filename: "upload.xlsx".into(),
                codelists: vec![
                    CodelistInput {
                        name: "Angina".into(),
                        codesets: vec![CodesetInput {
                            ontology_id: "ICD-10-CM".into(),
                            codes: vec!["I20.0".into(), " I21.0 ".into()],
                        }],
                    },
                    CodelistInput {
                        name: "Partial".into(),
                        codesets: vec![
                            CodesetInput {
                                ontology_id: "ICD-10-CM".into(),
                                codes: vec!["I21.1".into(), "NOPE".into()],
                            },
                            CodesetInput {
                                ontology_id: "ICD-9-CM".into(),
                                codes: vec!["bogus".into()],
                            },
                        ],
                    },
                    CodelistInput {
                        name: "Empty".into(),
                        codesets: vec![CodesetInput {
                            ontology_id: "ICD-9-CM".into(),
                            codes: vec!["bogus".into()],
                        }],
                    },
                ],
            })
            .unwrap();

        assert_eq!(response.stats, ImportStats { fully: 1, partially: 1, skipped: 1 });

        let collection = fx.session.collections.get(collection_id).unwrap();
        let items = collection.items().ids().to_vec();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], ItemId::Codelist(existing));

        // imported codelists keep the input order after the existing ones
        let names: Vec<String> = items[1..]
            .iter()
            .map(|item| match item {
                ItemId::Codelist(id) => fx.session.codelists.get(*id).unwrap().name,
                ItemId::Phenotype(_) => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["Angina".to_string(), "Partial".to_string()]);

        let partial = response
            .reports
            .iter()
            .find(|r| r.codelist_name == "Partial")
            .unwrap();
        assert!(partial.partial);
        assert!(partial.report.contains("ICD-10-CM: NOPE"));
        assert!(partial.report.contains(
            "ontologies were skipped because they didn't have any valid codes: ICD-9-CM"
        ));

        let empty = response
            .reports
            .iter()
            .find(|r| r.codelist_name == "Empty")
            .unwrap();
        assert!(empty.skipped);
        assert!(empty.codelist_id.is_none());

        // the imported codelist is replayable at version 2
        let angina_id = response
            .reports
            .iter()
            .find(|r| r.codelist_name == "Angina")
            .unwrap()
            .codelist_id
            .unwrap();
        let angina = fx.session.codelists.get(angina_id).unwrap();
        assert_eq!(angina.version(), 2);
        assert_eq!(
            angina.codesets().get("ICD-10-CM").unwrap().code_ids,
            SetOfCodeIds::from([1, 2])
        );
    }

    #[test]
    fn test_import_rejects_structural_problems() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        fx.add_codelist_to_collection(collection_id, 11, "taken");
        let container = ContainerSpec::Collection(collection_id);

        let name_collision = fx.codelist_service().import(ImportCodelistsRequest {
            container,
            filename: "f".into(),
            codelists: vec![CodelistInput {
                name: "taken".into(),
                codesets: vec![],
            }],
        });
        assert!(matches!(name_collision, Err(CoreError::NameCollision(_))));

        let duplicated_ontology = fx.codelist_service().import(ImportCodelistsRequest {
            container,
            filename: "f".into(),
            codelists: vec![CodelistInput {
                name: "new".into(),
                codesets: vec![
                    CodesetInput {
                        ontology_id: "ICD-10-CM".into(),
                        codes: vec!["I20.0".into()],
                    },
                    CodesetInput {
                        ontology_id: "ICD-10-CM".into(),
                        codes: vec!["I21.0".into()],
                    },
                ],
            }],
        });
        assert!(matches!(duplicated_ontology, Err(CoreError::DuplicateOntology(_))));

        let unknown_ontology = fx.codelist_service().import(ImportCodelistsRequest {
            container,
            filename: "f".into(),
            codelists: vec![CodelistInput {
                name: "new".into(),
                codesets: vec![CodesetInput {
                    ontology_id: "SNOMED".into(),
                    codes: vec!["123".into()],
                }],
            }],
        });
        assert!(matches!(unknown_ontology, Err(CoreError::UnknownOntologies(_))));
    }

    #[test]
    fn test_import_into_unknown_collection_fails() {
        let mut fx = fixture();
        let got = fx.codelist_service().import(ImportCodelistsRequest {
            container: ContainerSpec::Collection(CollectionId::from_u128(999)),
            filename: "f".into(),
            codelists: vec![],
        });
        assert!(matches!(got, Err(CoreError::ContainerNotFound(_))));
    }

    #[test]
    fn test_discard_transient_is_idempotent_through_service() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let codelist_id = fx.add_codelist_to_collection(collection_id, 11, "CL");

        fx.codelist_service()
            .store_transient_changes(StoreTransientChangesRequest {
                codelist_id,
                changes: vec![ChangesetInput {
                    ontology_id: "ICD-10-CM".into(),
                    added: vec![1],
                    removed: vec![],
                }],
            })
            .unwrap();

        let first = fx
            .codelist_service()
            .discard_transient_changes(codelist_id)
            .unwrap();
        assert!(first.transient_commit().is_none());

        let second = fx
            .codelist_service()
            .discard_transient_changes(codelist_id)
            .unwrap();
        assert!(second.transient_commit().is_none());
    }
}
