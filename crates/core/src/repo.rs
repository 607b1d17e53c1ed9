//! Repository traits: the seam between the core and persistence.
//!
//! The core never talks to a database. Every operation receives a
//! [`Session`] holding one repository per entity kind; implementations map
//! the aggregates to whatever store backs them. Repositories are
//! value-semantic: `get` hands out owned data, mutations become visible to
//! others only through `save`.
//!
//! A `Session` is assumed to span exactly one externally-initiated unit of
//! work (one request, one CLI invocation). The core performs no locking,
//! retries or conflict detection of its own; it relies on the surrounding
//! transaction isolation to never be invoked concurrently on the same
//! aggregate.

use crate::codelist::Codelist;
use crate::collection::Collection;
use crate::ontology::{Code, Ontology};
use crate::phenotype::Phenotype;
use crate::user::User;
use clb_ids::{CodelistId, CollectionId, PhenotypeId, UserId};

pub trait CodelistRepository {
    fn get(&self, id: CodelistId) -> Option<Codelist>;

    /// Resolves `ids` in order, silently skipping unknown ones.
    fn get_all(&self, ids: &[CodelistId]) -> Vec<Codelist>;

    /// All codelists whose `reference_id` points at `id`.
    fn find_referencing(&self, id: CodelistId) -> Vec<Codelist>;

    fn new_id(&mut self) -> CodelistId;

    fn save(&mut self, codelist: Codelist);

    fn delete(&mut self, id: CodelistId);
}

pub trait PhenotypeRepository {
    fn get(&self, id: PhenotypeId) -> Option<Phenotype>;

    fn get_all(&self, ids: &[PhenotypeId]) -> Vec<Phenotype>;

    fn new_id(&mut self) -> PhenotypeId;

    fn save(&mut self, phenotype: Phenotype);

    fn delete(&mut self, id: PhenotypeId);
}

pub trait CollectionRepository {
    fn get(&self, id: CollectionId) -> Option<Collection>;

    fn get_all(&self, ids: &[CollectionId]) -> Vec<Collection>;

    fn new_id(&mut self) -> CollectionId;

    fn save(&mut self, collection: Collection);

    fn delete(&mut self, id: CollectionId);
}

pub trait UserRepository {
    fn get(&self, id: UserId) -> Option<User>;

    fn get_all(&self, ids: &[UserId]) -> Vec<User>;

    fn save(&mut self, user: User);
}

pub trait OntologyRepository {
    fn get(&self, id: &str) -> Option<Ontology>;

    fn get_all(&self) -> Vec<Ontology>;
}

pub trait CodeRepository {
    fn get(&self, id: i64) -> Option<Code>;

    /// Resolves raw code strings within one ontology.
    ///
    /// Returns one entry per input code, in input order, with `None` for
    /// codes unknown to the ontology.
    fn find_codes(&self, codes: &[String], ontology_id: &str) -> Vec<(String, Option<i64>)>;
}

/// One unit of work's view onto persistence.
pub struct Session {
    pub codelists: Box<dyn CodelistRepository>,
    pub phenotypes: Box<dyn PhenotypeRepository>,
    pub collections: Box<dyn CollectionRepository>,
    pub users: Box<dyn UserRepository>,
    pub ontologies: Box<dyn OntologyRepository>,
    pub codes: Box<dyn CodeRepository>,
}
