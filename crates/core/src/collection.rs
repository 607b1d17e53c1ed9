//! Collections: the roots of the containment hierarchy.
//!
//! A collection is an ordered container of either phenotypes or codelists.
//! It is the only node that carries sharing, locking and (workspace-based)
//! ownership; every item below inherits those through root-collection
//! resolution.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::constants::PUBLIC_USER_ID;
use crate::container::{Container, ContainerSpec, ItemId, ItemList, ItemType};
use crate::error::{CoreError, CoreResult};
use crate::user::User;
use clb_ids::{CollectionId, UserId};

/// A top-level, ordered container of phenotypes or codelists.
#[derive(Clone, Debug, Serialize)]
pub struct Collection {
    id: CollectionId,
    pub name: String,
    pub description: String,
    items: ItemList,
    /// Users this collection is shared with (readers). Containing
    /// [`PUBLIC_USER_ID`] makes the collection public.
    pub shared_with: BTreeSet<UserId>,
    /// The user who created the collection. Write permission is *not*
    /// derived from this but from workspace containment; see
    /// [`crate::services`].
    owner_id: UserId,
    /// The collection this one was cloned from, if any.
    pub reference_id: Option<CollectionId>,
    /// A locked collection rejects mutation of itself and of any item
    /// anywhere beneath it.
    pub locked: bool,
}

impl Collection {
    pub fn new(
        id: CollectionId,
        name: impl Into<String>,
        description: impl Into<String>,
        item_type: ItemType,
        owner_id: UserId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            items: ItemList::new(item_type),
            shared_with: BTreeSet::new(),
            owner_id,
            reference_id: None,
            locked: false,
        }
    }

    /// Rebuilds a collection from persisted parts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: CollectionId,
        name: impl Into<String>,
        description: impl Into<String>,
        item_type: ItemType,
        item_ids: Vec<ItemId>,
        shared_with: BTreeSet<UserId>,
        owner_id: UserId,
        reference_id: Option<CollectionId>,
        locked: bool,
    ) -> CoreResult<Self> {
        Ok(Self {
            id,
            name: name.into(),
            description: description.into(),
            items: ItemList::with_items(item_type, item_ids)?,
            shared_with,
            owner_id,
            reference_id,
            locked,
        })
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn item_type(&self) -> ItemType {
        self.items.item_type()
    }

    pub fn to_spec(&self) -> ContainerSpec {
        ContainerSpec::Collection(self.id)
    }

    /// Replaces the set of users this collection is shared with.
    pub fn set_readers(&mut self, users: impl IntoIterator<Item = UserId>) {
        self.shared_with = users.into_iter().collect();
    }
}

impl Container for Collection {
    fn container_spec(&self) -> ContainerSpec {
        ContainerSpec::Collection(self.id)
    }

    fn items(&self) -> &ItemList {
        &self.items
    }

    fn items_mut(&mut self) -> &mut ItemList {
        &mut self.items
    }
}

/// True when `user` may read `collection`: it is shared with the user or
/// with the public, or the user's own workspace contains it.
pub fn collection_readable_by_user(collection: &Collection, user: &User) -> bool {
    collection.shared_with.contains(&user.id)
        || collection.shared_with.contains(&PUBLIC_USER_ID)
        || user.workspace.contains_collection(collection.id)
}

/// Hands a collection from one user's workspace to another's.
///
/// The old owner keeps read access (they join `shared_with`), the new owner
/// stops being a mere reader, and the collection moves between the two
/// workspaces.
///
/// # Errors
///
/// Returns [`CoreError::CollectionNotInWorkspace`] when the old owner's
/// workspace does not contain the collection.
pub fn transfer_ownership(
    collection: &mut Collection,
    old_owner: &mut User,
    new_owner: &mut User,
) -> CoreResult<()> {
    if !old_owner.workspace.contains_collection(collection.id) {
        return Err(CoreError::CollectionNotInWorkspace(collection.id));
    }

    collection.shared_with.insert(old_owner.id);
    collection.shared_with.remove(&new_owner.id);

    new_owner.workspace.add_collection(collection.id);
    old_owner.workspace.remove_collection(collection.id)?;

    Ok(())
}
