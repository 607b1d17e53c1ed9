//! # CLB Core
//!
//! Core business logic for the CLB codelist builder.
//!
//! A *codelist* is a named, versioned set of medical codes spanning one or
//! more coding systems (ontologies). Its content is never stored directly:
//! it accumulates through an append-only sequence of [`Commit`]s, each
//! bundling per-ontology differential changes, and the current state is
//! materialized by replaying that history. Codelists live inside an ordered
//! containment hierarchy (collections at the root, phenotypes in between)
//! which drives both navigation and permission inheritance.
//!
//! This crate contains pure in-memory data transformation:
//! - Code-set arithmetic with strict duplicate/missing guards
//! - The changeset/commit model and the codesets fold
//! - The codelist commit lifecycle (committed history + transient draft)
//! - Ordered containers with the single placement primitive
//! - Root-collection resolution, readability/writability and lock checks
//! - Clone, squash and import-merge operations
//!
//! **No API concerns**: persistence, HTTP/query protocols and authentication
//! belong to the surrounding application. They are reached exclusively
//! through the repository traits in [`repo`], and all operations here run
//! under whatever transaction boundary that layer provides.

pub mod codelist;
pub mod codeset;
pub mod collection;
pub mod commit;
pub mod constants;
pub mod container;
pub mod error;
pub mod importer;
pub mod memory;
pub mod ontology;
pub mod phenotype;
pub mod repo;
pub mod services;
pub mod user;

pub use codelist::{create_cloned_codelist_name, delete_codelist, squash_codelist, Codelist};
pub use codeset::SetOfCodeIds;
pub use collection::{collection_readable_by_user, transfer_ownership, Collection};
pub use commit::{Changeset, Codeset, Codesets, Commit};
pub use constants::PUBLIC_USER_ID;
pub use container::{
    add_or_move_item, Container, ContainerItem, ContainerSpec, ContainerType, ItemId, ItemList,
    ItemType,
};
pub use error::{CoreError, CoreResult};
pub use importer::{import_codelist, ImportReport, ValidatedCodeset};
pub use ontology::{Code, Ontology};
pub use phenotype::Phenotype;
pub use repo::Session;
pub use user::{User, Workspace};
