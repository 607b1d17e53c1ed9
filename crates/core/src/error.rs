use crate::container::{ContainerSpec, ItemId, ItemType};
use clb_ids::{CodelistId, CollectionId, PhenotypeId, UserId};

/// Errors raised by the core.
///
/// Two families live here. *Invariant violations* (duplicate code, missing
/// code, placement errors, locked-collection mutations) mean the caller
/// passed an inconsistent request; the targeted aggregate is left unmodified
/// and the operation is rejected as a whole. *Not-found* variants
/// deliberately conflate "does not exist" with "exists but is not visible to
/// this user" so that probing cannot reveal the existence of foreign data.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("code {0} already exists")]
    DuplicateCode(i64),
    #[error("code {0} does not exist")]
    MissingCode(i64),

    #[error(
        "cannot place item {item} of type {item_type} into container {container} \
         which holds items of type {container_item_type}"
    )]
    ItemTypeMismatch {
        item: ItemId,
        item_type: ItemType,
        container: ContainerSpec,
        container_item_type: ItemType,
    },
    #[error("cannot move an item after itself")]
    SelfMove,
    #[error("the reference container does not contain the reference item")]
    RefItemNotInContainer,
    #[error("the source container does not contain the item")]
    ItemNotInContainer,

    #[error("collection {0} is locked and cannot be modified")]
    CollectionLocked(CollectionId),

    #[error("collection {0} does not exist or is not in your workspace")]
    CollectionNotFound(CollectionId),
    #[error("container {0} does not exist or is not in your workspace")]
    ContainerNotFound(ContainerSpec),
    #[error("item {0} does not exist or is not accessible")]
    ItemNotFound(ItemId),
    #[error("codelist {0} does not exist or is not accessible")]
    CodelistNotFound(CodelistId),
    #[error("phenotype {0} does not exist or is not accessible")]
    PhenotypeNotFound(PhenotypeId),
    #[error("user {0} does not exist")]
    UserNotFound(UserId),
    #[error("collection {0} is not in your workspace")]
    CollectionNotInWorkspace(CollectionId),

    #[error("a codelist with the name '{0}' already exists")]
    NameCollision(String),
    #[error("an ontology must only occur once in a codelist's codesets")]
    DuplicateOntology(String),
    #[error("the following referenced ontologies do not exist: {0}")]
    UnknownOntologies(String),

    #[error("inconsistent state: {0}")]
    InconsistentState(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
