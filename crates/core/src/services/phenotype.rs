//! Phenotype operations: lifecycle, placement and cloning.

use tracing::debug;

use crate::codelist::{delete_codelist, squash_codelist, Codelist};
use crate::container::{add_or_move_item, Container, ContainerItem, ItemType};
use crate::error::{CoreError, CoreResult};
use crate::phenotype::Phenotype;
use crate::repo::{CodelistRepository, PhenotypeRepository, Session};
use crate::services::base::{
    ensure_unlocked, identify_ref, is_readable_by, is_writable_by, load_container,
    root_collection_of, root_collection_of_container, ReferencePosition,
};
use crate::user::User;
use clb_ids::PhenotypeId;

pub struct CreatePhenotypeRequest {
    pub name: String,
    pub medical_description: Option<String>,
    pub operational_description: Option<String>,
    pub position: ReferencePosition,
    pub reference_id: Option<PhenotypeId>,
}

pub struct UpdatePhenotypeRequest {
    pub phenotype_id: PhenotypeId,
    pub name: Option<String>,
    pub medical_description: Option<String>,
    pub operational_description: Option<String>,
    pub reference_id: Option<PhenotypeId>,
    /// A new position moves the phenotype, possibly to another collection.
    pub position: Option<ReferencePosition>,
}

pub struct ClonePhenotypeRequest {
    pub phenotype_id: PhenotypeId,
    /// Where the clone goes; defaults to directly after the original.
    pub position: Option<ReferencePosition>,
}

/// Phenotype operations on behalf of one acting user.
pub struct PhenotypeService<'a> {
    session: &'a mut Session,
    user: User,
}

impl<'a> PhenotypeService<'a> {
    pub fn new(session: &'a mut Session, user: User) -> Self {
        Self { session, user }
    }

    /// Loads a phenotype and checks the required permission. Not-found and
    /// not-accessible are indistinguishable by design.
    fn load_phenotype(&self, phenotype_id: PhenotypeId, writable: bool) -> CoreResult<Phenotype> {
        let phenotype = self
            .session
            .phenotypes
            .get(phenotype_id)
            .ok_or(CoreError::PhenotypeNotFound(phenotype_id))?;

        let permitted = if writable {
            is_writable_by(self.session, &self.user, &phenotype)?
        } else {
            is_readable_by(self.session, &self.user, &phenotype)?
        };
        if !permitted {
            return Err(CoreError::PhenotypeNotFound(phenotype_id));
        }

        Ok(phenotype)
    }

    /// Creates a new, empty phenotype at the requested position.
    pub fn create(&mut self, req: CreatePhenotypeRequest) -> CoreResult<Phenotype> {
        let (mut ref_ctr, ref_item) =
            identify_ref(self.session, &req.position, None, Some(ItemType::Phenotype))?;

        let root = root_collection_of_container(self.session, &ref_ctr)?;
        if !self.user.workspace.contains_collection(root.id()) {
            return Err(CoreError::ContainerNotFound(ref_ctr.spec()));
        }
        ensure_unlocked(&root)?;

        let mut phenotype = Phenotype::new(
            self.session.phenotypes.new_id(),
            req.name,
            req.medical_description.unwrap_or_default(),
            req.operational_description.unwrap_or_default(),
            ref_ctr.spec(),
        );
        phenotype.reference_id = req.reference_id;

        add_or_move_item(None, &mut phenotype, ref_ctr.as_container_mut(), ref_item)?;

        self.session.phenotypes.save(phenotype.clone());
        ref_ctr.save(self.session);

        Ok(phenotype)
    }

    /// Updates descriptions, reference and/or position of a phenotype.
    pub fn update(&mut self, req: UpdatePhenotypeRequest) -> CoreResult<Phenotype> {
        let mut phenotype = self.load_phenotype(req.phenotype_id, true)?;

        let root = root_collection_of(self.session, &phenotype)?;
        ensure_unlocked(&root)?;

        if let Some(name) = req.name {
            phenotype.name = name;
        }
        if let Some(medical_description) = req.medical_description {
            phenotype.medical_description = medical_description;
        }
        if let Some(operational_description) = req.operational_description {
            phenotype.operational_description = operational_description;
        }
        if let Some(reference_id) = req.reference_id {
            phenotype.reference_id = Some(reference_id);
        }

        if let Some(position) = req.position {
            let source_spec = phenotype.container();
            let (mut ref_ctr, ref_item) = identify_ref(
                self.session,
                &position,
                Some(source_spec),
                Some(ItemType::Phenotype),
            )?;

            let dest_root = root_collection_of_container(self.session, &ref_ctr)?;
            if !self.user.workspace.contains_collection(dest_root.id()) {
                return Err(CoreError::ContainerNotFound(ref_ctr.spec()));
            }
            ensure_unlocked(&dest_root)?;

            if ref_ctr.spec() == source_spec {
                add_or_move_item(None, &mut phenotype, ref_ctr.as_container_mut(), ref_item)?;
                ref_ctr.save(self.session);
            } else {
                let mut source = load_container(self.session, source_spec)?;
                add_or_move_item(
                    Some(source.as_container_mut()),
                    &mut phenotype,
                    ref_ctr.as_container_mut(),
                    ref_item,
                )?;
                source.save(self.session);
                ref_ctr.save(self.session);
            }
        }

        self.session.phenotypes.save(phenotype.clone());
        Ok(phenotype)
    }

    /// Deletes a phenotype and all codelists it contains.
    pub fn delete(&mut self, phenotype_id: PhenotypeId) -> CoreResult<()> {
        let mut phenotype = self.load_phenotype(phenotype_id, true)?;
        let mut container = load_container(self.session, phenotype.container())?;

        let root = root_collection_of_container(self.session, &container)?;
        ensure_unlocked(&root)?;

        container
            .as_container_mut()
            .items_mut()
            .remove_item(phenotype.item_id());

        for codelist_id in phenotype.codelist_ids() {
            let Some(codelist) = self.session.codelists.get(codelist_id) else {
                continue;
            };
            let mut referencing = self.session.codelists.find_referencing(codelist_id);
            delete_codelist(&mut phenotype, &codelist, &mut referencing);
            for cl in referencing {
                self.session.codelists.save(cl);
            }
            self.session.codelists.delete(codelist_id);
        }

        self.session.phenotypes.delete(phenotype_id);
        container.save(self.session);

        debug!(phenotype = %phenotype_id, "deleted phenotype with its codelists");
        Ok(())
    }

    /// Clones a phenotype. The contained codelists are squashed into the
    /// clone: each copy starts with a single commit reproducing the
    /// original's materialized state, history not included.
    pub fn clone_phenotype(&mut self, req: ClonePhenotypeRequest) -> CoreResult<Phenotype> {
        let phenotype = self.load_phenotype(req.phenotype_id, true)?;

        let (mut ref_ctr, ref_item) = match req.position {
            None => (
                load_container(self.session, phenotype.container())?,
                Some(phenotype.item_id()),
            ),
            Some(position) => identify_ref(
                self.session,
                &position,
                Some(phenotype.container()),
                Some(ItemType::Phenotype),
            )?,
        };

        let root = root_collection_of_container(self.session, &ref_ctr)?;
        if !self.user.workspace.contains_collection(root.id()) {
            return Err(CoreError::ContainerNotFound(ref_ctr.spec()));
        }
        ensure_unlocked(&root)?;

        let codelists = self
            .session
            .codelists
            .get_all(&phenotype.codelist_ids());

        let mut new_codelists: Vec<Codelist> = Vec::with_capacity(codelists.len());
        for codelist in &codelists {
            let new_id = self.session.codelists.new_id();
            new_codelists.push(squash_codelist(codelist, new_id, self.user.id));
        }

        let mut new_phenotype = Phenotype::from_parts(
            self.session.phenotypes.new_id(),
            phenotype.name.clone(),
            phenotype.medical_description.clone(),
            phenotype.operational_description.clone(),
            new_codelists.iter().map(|cl| cl.item_id()).collect(),
            ref_ctr.spec(),
            Some(phenotype.id()),
        )?;

        // squashing keeps the source's back-reference; the copies belong to
        // the new phenotype
        for codelist in &mut new_codelists {
            codelist.set_container(new_phenotype.to_spec());
        }

        add_or_move_item(None, &mut new_phenotype, ref_ctr.as_container_mut(), ref_item)?;

        for codelist in new_codelists {
            self.session.codelists.save(codelist);
        }
        self.session.phenotypes.save(new_phenotype.clone());
        ref_ctr.save(self.session);

        Ok(new_phenotype)
    }
}
