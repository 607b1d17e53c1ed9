//! Shared service plumbing: container loading, root resolution and
//! permission checks.

use serde::{Deserialize, Serialize};

use crate::collection::{collection_readable_by_user, Collection};
use crate::constants::PUBLIC_USER_ID;
use crate::container::{Container, ContainerItem, ContainerSpec, ItemId, ItemList, ItemType};
use crate::error::{CoreError, CoreResult};
use crate::phenotype::Phenotype;
use crate::repo::{CodelistRepository, CollectionRepository, PhenotypeRepository, Session};
use crate::user::User;
use clb_ids::CodelistId;

/// A position within the workspace tree: a container, and optionally an
/// item within it that the subject is placed after.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePosition {
    /// The destination container. `None` means "stay where you are" for
    /// operations that have a natural default container.
    pub container: Option<ContainerSpec>,
    /// The sibling to be placed after; `None` places first.
    pub item_id: Option<ItemId>,
}

/// A container loaded from persistence, with its concrete kind resolved.
///
/// This is the one place that decides "which repository do I call" for a
/// [`ContainerSpec`]; every dispatch goes through the exhaustive matches
/// here.
pub enum LoadedContainer {
    Collection(Collection),
    Phenotype(Phenotype),
}

impl LoadedContainer {
    pub fn spec(&self) -> ContainerSpec {
        match self {
            LoadedContainer::Collection(c) => c.to_spec(),
            LoadedContainer::Phenotype(p) => p.to_spec(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LoadedContainer::Collection(c) => &c.name,
            LoadedContainer::Phenotype(p) => &p.name,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            LoadedContainer::Collection(c) => c.item_type(),
            LoadedContainer::Phenotype(p) => p.items().item_type(),
        }
    }

    pub fn as_container(&self) -> &dyn Container {
        match self {
            LoadedContainer::Collection(c) => c,
            LoadedContainer::Phenotype(p) => p,
        }
    }

    pub fn as_container_mut(&mut self) -> &mut dyn Container {
        match self {
            LoadedContainer::Collection(c) => c,
            LoadedContainer::Phenotype(p) => p,
        }
    }

    /// Writes the container back through the matching repository.
    pub fn save(self, session: &mut Session) {
        match self {
            LoadedContainer::Collection(c) => session.collections.save(c),
            LoadedContainer::Phenotype(p) => session.phenotypes.save(p),
        }
    }
}

/// Loads the container a [`ContainerSpec`] points at.
///
/// # Errors
///
/// Returns [`CoreError::ContainerNotFound`] when the spec dangles.
pub fn load_container(session: &Session, spec: ContainerSpec) -> CoreResult<LoadedContainer> {
    match spec {
        ContainerSpec::Collection(id) => session
            .collections
            .get(id)
            .map(LoadedContainer::Collection)
            .ok_or(CoreError::ContainerNotFound(spec)),
        ContainerSpec::Phenotype(id) => session
            .phenotypes
            .get(id)
            .map(LoadedContainer::Phenotype)
            .ok_or(CoreError::ContainerNotFound(spec)),
    }
}

/// Like [`load_container`], but additionally requires the container to hold
/// items of `item_type` (reported as not-found on mismatch, so that probing
/// cannot distinguish "wrong kind" from "absent").
pub fn load_container_filtered(
    session: &Session,
    spec: ContainerSpec,
    item_type: Option<ItemType>,
) -> CoreResult<LoadedContainer> {
    let container = load_container(session, spec)?;
    if let Some(item_type) = item_type {
        if container.item_type() != item_type {
            return Err(CoreError::ContainerNotFound(spec));
        }
    }
    Ok(container)
}

/// Walks `spec`'s back-references upward until a collection is reached.
///
/// A phenotype's container is always a collection, so the walk takes at
/// most one extra hop; the loop keeps the exhaustive dispatch in one place.
pub fn root_collection_of_spec(session: &Session, spec: ContainerSpec) -> CoreResult<Collection> {
    let mut spec = spec;
    loop {
        match load_container(session, spec)? {
            LoadedContainer::Collection(c) => return Ok(c),
            LoadedContainer::Phenotype(p) => spec = p.container(),
        }
    }
}

/// The root collection above `item`: the unit of ownership, sharing and
/// locking.
pub fn root_collection_of(session: &Session, item: &dyn ContainerItem) -> CoreResult<Collection> {
    root_collection_of_spec(session, item.container())
}

/// The root collection of an already-loaded container (itself, when it is a
/// collection).
pub(crate) fn root_collection_of_container(
    session: &Session,
    container: &LoadedContainer,
) -> CoreResult<Collection> {
    match container {
        LoadedContainer::Collection(c) => Ok(c.clone()),
        LoadedContainer::Phenotype(p) => root_collection_of_spec(session, p.container()),
    }
}

/// The chain of container specs from the root collection down to (and
/// including) `item`'s direct container.
pub fn container_hierarchy_of(
    session: &Session,
    item: &dyn ContainerItem,
) -> CoreResult<Vec<ContainerSpec>> {
    let mut hierarchy = Vec::new();
    let mut spec = item.container();
    loop {
        hierarchy.insert(0, spec);
        match load_container(session, spec)? {
            LoadedContainer::Collection(_) => return Ok(hierarchy),
            LoadedContainer::Phenotype(p) => spec = p.container(),
        }
    }
}

/// True when the root collection above `spec` is locked, i.e. every
/// mutation beneath it is rejected.
pub fn root_locked(session: &Session, spec: ContainerSpec) -> CoreResult<bool> {
    Ok(root_collection_of_spec(session, spec)?.locked)
}

/// How a collection presents itself to a given user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionVisibility {
    Private,
    Shared,
    Public,
}

/// Resolves the visibility of the collection above `spec` for `user`.
///
/// # Errors
///
/// Returns [`CoreError::InconsistentState`] when the user can see a
/// collection that is neither public, owned, nor shared with them; callers
/// only reach this for containers they already resolved.
pub fn collection_visibility(
    session: &Session,
    user: &User,
    spec: ContainerSpec,
) -> CoreResult<CollectionVisibility> {
    let root = root_collection_of_spec(session, spec)?;

    if root.shared_with.contains(&PUBLIC_USER_ID) {
        return Ok(CollectionVisibility::Public);
    }
    if root.owner_id() == user.id {
        return Ok(CollectionVisibility::Private);
    }
    if !root.shared_with.contains(&user.id) {
        return Err(CoreError::InconsistentState(format!(
            "access problem with collection {}: it is neither public, nor is it \
             shared with or owned by the user {}",
            root.id(),
            user.id
        )));
    }
    Ok(CollectionVisibility::Shared)
}

/// True when `user` may read the tree `item` lives in.
pub(crate) fn is_readable_by(
    session: &Session,
    user: &User,
    item: &dyn ContainerItem,
) -> CoreResult<bool> {
    let root = root_collection_of(session, item)?;
    Ok(collection_readable_by_user(&root, user))
}

/// True when `user` may write the tree `item` lives in. Ownership is
/// singular and workspace-based; sharing never grants write access.
pub(crate) fn is_writable_by(
    session: &Session,
    user: &User,
    item: &dyn ContainerItem,
) -> CoreResult<bool> {
    let root = root_collection_of(session, item)?;
    Ok(user.workspace.contains_collection(root.id()))
}

/// Rejects any mutation beneath a locked root collection.
pub(crate) fn ensure_unlocked(root: &Collection) -> CoreResult<()> {
    if root.locked {
        return Err(CoreError::CollectionLocked(root.id()));
    }
    Ok(())
}

/// Resolves a [`ReferencePosition`] into a loaded container and a verified
/// reference item.
///
/// The returned item, when present, is guaranteed to be a member of the
/// returned container and to exist in its repository. With `item_type`
/// given, only containers holding that kind are accepted.
pub(crate) fn identify_ref(
    session: &Session,
    position: &ReferencePosition,
    default_container: Option<ContainerSpec>,
    item_type: Option<ItemType>,
) -> CoreResult<(LoadedContainer, Option<ItemId>)> {
    let spec = match position.container.or(default_container) {
        Some(spec) => spec,
        None => {
            return Err(CoreError::InconsistentState(
                "a reference container needs to be given".into(),
            ))
        }
    };
    let container = load_container_filtered(session, spec, item_type)?;

    let item_id = match position.item_id {
        None => None,
        Some(item_id) => {
            if !container.as_container().items().contains(item_id) {
                return Err(CoreError::ItemNotFound(item_id));
            }
            let exists = match item_id {
                ItemId::Codelist(id) => session.codelists.get(id).is_some(),
                ItemId::Phenotype(id) => session.phenotypes.get(id).is_some(),
            };
            if !exists {
                return Err(CoreError::ItemNotFound(item_id));
            }
            Some(item_id)
        }
    };

    Ok((container, item_id))
}

/// The codelist ids of an item list, in container order.
pub(crate) fn codelist_ids(items: &ItemList) -> Vec<CodelistId> {
    items
        .ids()
        .iter()
        .filter_map(|item| match item {
            ItemId::Codelist(id) => Some(*id),
            ItemId::Phenotype(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::fixture;
    use clb_ids::{CollectionId, PhenotypeId};

    #[test]
    fn test_root_collection_walks_through_phenotype() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Phenotype);
        let phenotype_id = fx.add_phenotype(collection_id, 20, "PH");
        let codelist_id = fx.add_codelist_to_phenotype(phenotype_id, 30, "CL");

        let codelist = fx.session.codelists.get(codelist_id).unwrap();
        let root = root_collection_of(&fx.session, &codelist).unwrap();
        assert_eq!(root.id(), collection_id);

        let phenotype = fx.session.phenotypes.get(phenotype_id).unwrap();
        let root = root_collection_of(&fx.session, &phenotype).unwrap();
        assert_eq!(root.id(), collection_id);
    }

    #[test]
    fn test_root_collection_of_dangling_spec_fails() {
        let fx = fixture();
        let got = root_collection_of_spec(
            &fx.session,
            ContainerSpec::Phenotype(PhenotypeId::from_u128(99)),
        );
        assert!(matches!(got, Err(CoreError::ContainerNotFound(_))));
    }

    #[test]
    fn test_container_hierarchy_is_root_first() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Phenotype);
        let phenotype_id = fx.add_phenotype(collection_id, 20, "PH");
        let codelist_id = fx.add_codelist_to_phenotype(phenotype_id, 30, "CL");

        let codelist = fx.session.codelists.get(codelist_id).unwrap();
        let hierarchy = container_hierarchy_of(&fx.session, &codelist).unwrap();
        assert_eq!(
            hierarchy,
            vec![
                ContainerSpec::Collection(collection_id),
                ContainerSpec::Phenotype(phenotype_id),
            ]
        );
    }

    #[test]
    fn test_root_locked_propagates() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Phenotype);
        let phenotype_id = fx.add_phenotype(collection_id, 20, "PH");
        let spec = ContainerSpec::Phenotype(phenotype_id);

        assert!(!root_locked(&fx.session, spec).unwrap());
        fx.lock_collection(collection_id);
        assert!(root_locked(&fx.session, spec).unwrap());
    }

    #[test]
    fn test_collection_visibility() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let spec = ContainerSpec::Collection(collection_id);

        assert_eq!(
            collection_visibility(&fx.session, &fx.user, spec).unwrap(),
            CollectionVisibility::Private
        );

        let reader = fx.add_user(2);
        let mut collection = fx.session.collections.get(collection_id).unwrap();
        collection.shared_with.insert(reader.id);
        fx.session.collections.save(collection);
        assert_eq!(
            collection_visibility(&fx.session, &reader, spec).unwrap(),
            CollectionVisibility::Shared
        );

        let mut collection = fx.session.collections.get(collection_id).unwrap();
        collection.shared_with.insert(PUBLIC_USER_ID);
        fx.session.collections.save(collection);
        assert_eq!(
            collection_visibility(&fx.session, &reader, spec).unwrap(),
            CollectionVisibility::Public
        );
    }

    #[test]
    fn test_identify_ref_requires_member_item() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        fx.add_codelist_to_collection(collection_id, 11, "CL");
        let outsider = CollectionId::from_u128(99);

        let position = ReferencePosition {
            container: Some(ContainerSpec::Collection(collection_id)),
            item_id: Some(ItemId::Codelist(clb_ids::CodelistId::from_u128(999))),
        };
        let got = identify_ref(&fx.session, &position, None, Some(ItemType::Codelist));
        assert!(matches!(got, Err(CoreError::ItemNotFound(_))));

        let position = ReferencePosition {
            container: Some(ContainerSpec::Collection(outsider)),
            item_id: None,
        };
        let got = identify_ref(&fx.session, &position, None, None);
        assert!(matches!(got, Err(CoreError::ContainerNotFound(_))));
    }
}
