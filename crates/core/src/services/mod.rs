//! The operation layer of the core.
//!
//! Services bundle one unit of work's repositories ([`Session`]) with the
//! acting user and expose the externally callable operations: codelist
//! lifecycle and history, phenotype lifecycle, collection/workspace
//! management. The acting user is always passed in explicitly; there is no
//! ambient identity.
//!
//! [`Session`]: crate::repo::Session

mod base;
mod codelist;
#[cfg(test)]
mod fixtures;
mod phenotype;
mod workspace;

pub use base::{
    collection_visibility, container_hierarchy_of, load_container, root_collection_of,
    root_collection_of_spec, root_locked, CollectionVisibility, LoadedContainer,
    ReferencePosition,
};
pub use codelist::{
    ChangesetInput, CodelistInput, CodelistService, CodesetInput, CommitChangesRequest,
    CommitInput, CloneCodelistRequest, CreateCodelistRequest, ImportCodelistsRequest,
    ImportCodelistsResponse, ImportReportEntry, ImportStats, MoveCodelistRequest,
    StoreTransientChangesRequest, UpdateCodelistRequest,
};
pub use phenotype::{
    ClonePhenotypeRequest, CreatePhenotypeRequest, PhenotypeService, UpdatePhenotypeRequest,
};
pub use workspace::{
    CreateCollectionRequest, MoveCollectionRequest, UpdateCollectionRequest, WorkspaceService,
};
