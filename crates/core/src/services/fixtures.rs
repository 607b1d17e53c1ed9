//! Shared test fixtures for the service layer: an in-memory session with a
//! small ontology catalogue and one user.

use crate::codelist::Codelist;
use crate::collection::Collection;
use crate::container::{add_or_move_item, Container, ItemType};
use crate::memory::{InMemoryCodes, InMemoryOntologies};
use crate::ontology::{Code, Ontology};
use crate::phenotype::Phenotype;
use crate::repo::{
    CodelistRepository, CollectionRepository, PhenotypeRepository, Session, UserRepository,
};
use crate::services::codelist::CodelistService;
use crate::services::phenotype::PhenotypeService;
use crate::services::workspace::WorkspaceService;
use crate::user::{User, Workspace};
use clb_ids::{CodelistId, CollectionId, PhenotypeId, UserId, WorkspaceId};

pub(crate) struct Fixture {
    pub session: Session,
    pub user: User,
}

/// A session with the ontologies "ICD-10-CM" (codes I20.0, I21.0, I21.1)
/// and "ICD-9-CM" (codes 410, 411), plus one stored user.
pub(crate) fn fixture() -> Fixture {
    let mut session = Session::in_memory();

    let mut ontologies = InMemoryOntologies::default();
    ontologies.register(Ontology {
        id: "ICD-10-CM".into(),
        root_code_ids: vec![1],
    });
    ontologies.register(Ontology {
        id: "ICD-9-CM".into(),
        root_code_ids: vec![100],
    });
    session.ontologies = Box::new(ontologies);

    let mut codes = InMemoryCodes::default();
    for (id, code, ontology) in [
        (1, "I20.0", "ICD-10-CM"),
        (2, "I21.0", "ICD-10-CM"),
        (3, "I21.1", "ICD-10-CM"),
        (100, "410", "ICD-9-CM"),
        (101, "411", "ICD-9-CM"),
    ] {
        codes.register(Code {
            id,
            code: code.into(),
            ontology_id: ontology.into(),
            description: String::new(),
            path: vec![id],
            children_ids: vec![],
            last_descendant_id: id,
        });
    }
    session.codes = Box::new(codes);

    let user = User {
        id: UserId::from_u128(1),
        external_id: "user-1".into(),
        name: "User One".into(),
        workspace: Workspace::new(WorkspaceId::from_u128(1)),
    };
    session.users.save(user.clone());

    Fixture { session, user }
}

impl Fixture {
    pub fn codelist_service(&mut self) -> CodelistService<'_> {
        CodelistService::new(&mut self.session, self.user.clone())
    }

    pub fn phenotype_service(&mut self) -> PhenotypeService<'_> {
        PhenotypeService::new(&mut self.session, self.user.clone())
    }

    pub fn workspace_service(&mut self) -> WorkspaceService<'_> {
        WorkspaceService::new(&mut self.session, self.user.clone())
    }

    /// Re-reads the acting user after workspace mutations.
    pub fn refresh_user(&mut self) {
        self.user = self.session.users.get(self.user.id).unwrap();
    }

    /// Stores an additional user.
    pub fn add_user(&mut self, n: u128) -> User {
        let user = User {
            id: UserId::from_u128(n),
            external_id: format!("user-{n}"),
            name: format!("User {n}"),
            workspace: Workspace::new(WorkspaceId::from_u128(n)),
        };
        self.session.users.save(user.clone());
        user
    }

    /// A collection owned by the fixture user, inside their workspace.
    pub fn add_collection(&mut self, n: u128, item_type: ItemType) -> CollectionId {
        let id = CollectionId::from_u128(n);
        let collection = Collection::new(id, format!("Collection {n}"), "", item_type, self.user.id);
        self.session.collections.save(collection);
        self.user.workspace.add_collection(id);
        self.session.users.save(self.user.clone());
        id
    }

    /// A collection owned by somebody else, outside the fixture user's
    /// workspace.
    pub fn add_foreign_collection(&mut self, n: u128, owner: &User, item_type: ItemType) -> CollectionId {
        let id = CollectionId::from_u128(n);
        let collection = Collection::new(id, format!("Collection {n}"), "", item_type, owner.id);
        self.session.collections.save(collection);

        let mut owner = owner.clone();
        owner.workspace.add_collection(id);
        self.session.users.save(owner);
        id
    }

    pub fn add_codelist_to_collection(
        &mut self,
        collection_id: CollectionId,
        n: u128,
        name: &str,
    ) -> CodelistId {
        let mut collection = self.session.collections.get(collection_id).unwrap();
        let id = CodelistId::from_u128(n);
        let mut codelist = Codelist::new(id, name, "", collection.to_spec());
        let after = collection.items().ids().last().copied();
        add_or_move_item(None, &mut codelist, &mut collection, after).unwrap();
        self.session.codelists.save(codelist);
        self.session.collections.save(collection);
        id
    }

    pub fn add_phenotype(
        &mut self,
        collection_id: CollectionId,
        n: u128,
        name: &str,
    ) -> PhenotypeId {
        let mut collection = self.session.collections.get(collection_id).unwrap();
        let id = PhenotypeId::from_u128(n);
        let mut phenotype = Phenotype::new(id, name, "", "", collection.to_spec());
        let after = collection.items().ids().last().copied();
        add_or_move_item(None, &mut phenotype, &mut collection, after).unwrap();
        self.session.phenotypes.save(phenotype);
        self.session.collections.save(collection);
        id
    }

    pub fn add_codelist_to_phenotype(
        &mut self,
        phenotype_id: PhenotypeId,
        n: u128,
        name: &str,
    ) -> CodelistId {
        let mut phenotype = self.session.phenotypes.get(phenotype_id).unwrap();
        let id = CodelistId::from_u128(n);
        let mut codelist = Codelist::new(id, name, "", phenotype.to_spec());
        let after = phenotype.items().ids().last().copied();
        add_or_move_item(None, &mut codelist, &mut phenotype, after).unwrap();
        self.session.codelists.save(codelist);
        self.session.phenotypes.save(phenotype);
        id
    }

    pub fn lock_collection(&mut self, collection_id: CollectionId) {
        let mut collection = self.session.collections.get(collection_id).unwrap();
        collection.locked = true;
        self.session.collections.save(collection);
    }
}
