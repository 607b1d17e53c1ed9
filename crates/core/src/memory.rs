//! In-memory repository implementations.
//!
//! Hash-map-backed implementations of every repository trait, used by the
//! core's own tests and by the demo CLI. They model the value semantics a
//! real persistence layer provides: `get` clones, mutations only become
//! visible through `save`.

use std::collections::HashMap;

use crate::codelist::Codelist;
use crate::collection::Collection;
use crate::ontology::{Code, Ontology};
use crate::phenotype::Phenotype;
use crate::repo::{
    CodeRepository, CodelistRepository, CollectionRepository, OntologyRepository,
    PhenotypeRepository, Session, UserRepository,
};
use crate::user::User;
use clb_ids::{CodelistId, CollectionId, PhenotypeId, UserId};

#[derive(Default)]
pub struct InMemoryCodelists {
    codelists: HashMap<CodelistId, Codelist>,
}

impl CodelistRepository for InMemoryCodelists {
    fn get(&self, id: CodelistId) -> Option<Codelist> {
        self.codelists.get(&id).cloned()
    }

    fn get_all(&self, ids: &[CodelistId]) -> Vec<Codelist> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    fn find_referencing(&self, id: CodelistId) -> Vec<Codelist> {
        self.codelists
            .values()
            .filter(|cl| cl.reference_id == Some(id))
            .cloned()
            .collect()
    }

    fn new_id(&mut self) -> CodelistId {
        CodelistId::random()
    }

    fn save(&mut self, codelist: Codelist) {
        self.codelists.insert(codelist.id(), codelist);
    }

    fn delete(&mut self, id: CodelistId) {
        self.codelists.remove(&id);
    }
}

#[derive(Default)]
pub struct InMemoryPhenotypes {
    phenotypes: HashMap<PhenotypeId, Phenotype>,
}

impl PhenotypeRepository for InMemoryPhenotypes {
    fn get(&self, id: PhenotypeId) -> Option<Phenotype> {
        self.phenotypes.get(&id).cloned()
    }

    fn get_all(&self, ids: &[PhenotypeId]) -> Vec<Phenotype> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    fn new_id(&mut self) -> PhenotypeId {
        PhenotypeId::random()
    }

    fn save(&mut self, phenotype: Phenotype) {
        self.phenotypes.insert(phenotype.id(), phenotype);
    }

    fn delete(&mut self, id: PhenotypeId) {
        self.phenotypes.remove(&id);
    }
}

#[derive(Default)]
pub struct InMemoryCollections {
    collections: HashMap<CollectionId, Collection>,
}

impl CollectionRepository for InMemoryCollections {
    fn get(&self, id: CollectionId) -> Option<Collection> {
        self.collections.get(&id).cloned()
    }

    fn get_all(&self, ids: &[CollectionId]) -> Vec<Collection> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    fn new_id(&mut self) -> CollectionId {
        CollectionId::random()
    }

    fn save(&mut self, collection: Collection) {
        self.collections.insert(collection.id(), collection);
    }

    fn delete(&mut self, id: CollectionId) {
        self.collections.remove(&id);
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: HashMap<UserId, User>,
}

impl UserRepository for InMemoryUsers {
    fn get(&self, id: UserId) -> Option<User> {
        self.users.get(&id).cloned()
    }

    fn get_all(&self, ids: &[UserId]) -> Vec<User> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    fn save(&mut self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[derive(Default)]
pub struct InMemoryOntologies {
    /// Ontologies in registration order.
    ontologies: Vec<Ontology>,
}

impl InMemoryOntologies {
    pub fn register(&mut self, ontology: Ontology) {
        self.ontologies.retain(|o| o.id != ontology.id);
        self.ontologies.push(ontology);
    }
}

impl OntologyRepository for InMemoryOntologies {
    fn get(&self, id: &str) -> Option<Ontology> {
        self.ontologies.iter().find(|o| o.id == id).cloned()
    }

    fn get_all(&self) -> Vec<Ontology> {
        self.ontologies.clone()
    }
}

#[derive(Default)]
pub struct InMemoryCodes {
    codes: HashMap<i64, Code>,
    /// (ontology id, raw code) to code id.
    by_code: HashMap<(String, String), i64>,
}

impl InMemoryCodes {
    pub fn register(&mut self, code: Code) {
        self.by_code
            .insert((code.ontology_id.clone(), code.code.clone()), code.id);
        self.codes.insert(code.id, code);
    }
}

impl CodeRepository for InMemoryCodes {
    fn get(&self, id: i64) -> Option<Code> {
        self.codes.get(&id).cloned()
    }

    fn find_codes(&self, codes: &[String], ontology_id: &str) -> Vec<(String, Option<i64>)> {
        codes
            .iter()
            .map(|code| {
                let id = self
                    .by_code
                    .get(&(ontology_id.to_string(), code.clone()))
                    .copied();
                (code.clone(), id)
            })
            .collect()
    }
}

impl Session {
    /// A session over fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self {
            codelists: Box::new(InMemoryCodelists::default()),
            phenotypes: Box::new(InMemoryPhenotypes::default()),
            collections: Box::new(InMemoryCollections::default()),
            users: Box::new(InMemoryUsers::default()),
            ontologies: Box::new(InMemoryOntologies::default()),
            codes: Box::new(InMemoryCodes::default()),
        }
    }
}
