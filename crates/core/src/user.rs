//! Users and their workspaces.
//!
//! A workspace is a user's ordered list of root collections. Containment in
//! a workspace is what makes a collection writable for its user; sharing
//! only ever grants read access.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use clb_ids::{CollectionId, UserId, WorkspaceId};

/// An account known to the system. Identity resolution happens outside the
/// core; operations receive the acting user explicitly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identifier of this user at the external identity provider.
    pub external_id: String,
    pub name: String,
    pub workspace: Workspace,
}

/// A user's ordered list of root collections.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    collection_ids: Vec<CollectionId>,
}

impl Workspace {
    pub fn new(id: WorkspaceId) -> Self {
        Self {
            id,
            collection_ids: Vec::new(),
        }
    }

    pub fn with_collections(id: WorkspaceId, collection_ids: Vec<CollectionId>) -> Self {
        Self { id, collection_ids }
    }

    /// The collection ids in workspace order.
    pub fn collection_ids(&self) -> &[CollectionId] {
        &self.collection_ids
    }

    pub fn contains_collection(&self, collection_id: CollectionId) -> bool {
        self.collection_ids.contains(&collection_id)
    }

    /// Adds a collection in first position. A no-op when already present.
    pub fn add_collection(&mut self, collection_id: CollectionId) {
        if !self.contains_collection(collection_id) {
            self.collection_ids.insert(0, collection_id);
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::CollectionNotInWorkspace`] when the collection
    /// is not a member.
    pub fn remove_collection(&mut self, collection_id: CollectionId) -> CoreResult<()> {
        if !self.contains_collection(collection_id) {
            return Err(CoreError::CollectionNotInWorkspace(collection_id));
        }
        self.collection_ids.retain(|id| *id != collection_id);
        Ok(())
    }

    /// Moves a collection to first position (`ref_collection = None`) or
    /// directly after `ref_collection`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CollectionNotInWorkspace`] when either the moved
    /// or the reference collection is not a member.
    pub fn move_collection_after(
        &mut self,
        collection_id: CollectionId,
        ref_collection: Option<CollectionId>,
    ) -> CoreResult<()> {
        if !self.contains_collection(collection_id) {
            return Err(CoreError::CollectionNotInWorkspace(collection_id));
        }
        if let Some(ref_id) = ref_collection {
            if !self.contains_collection(ref_id) {
                return Err(CoreError::CollectionNotInWorkspace(ref_id));
            }
        }

        self.collection_ids.retain(|id| *id != collection_id);

        let new_pos = match ref_collection {
            None => 0,
            Some(ref_id) => {
                self.collection_ids
                    .iter()
                    .position(|id| *id == ref_id)
                    .unwrap_or(0)
                    + 1
            }
        };
        self.collection_ids.insert(new_pos, collection_id);

        Ok(())
    }
}
