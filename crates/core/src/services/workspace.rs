//! Workspace and collection operations.

use tracing::debug;

use crate::collection::{transfer_ownership, Collection};
use crate::constants::PUBLIC_USER_ID;
use crate::container::{Container, ItemId, ItemType};
use crate::error::{CoreError, CoreResult};
use crate::repo::{CollectionRepository, Session, UserRepository};
use crate::services::base::codelist_ids;
use crate::services::codelist::CodelistService;
use crate::services::phenotype::PhenotypeService;
use crate::user::User;
use clb_ids::{CollectionId, UserId};

pub struct CreateCollectionRequest {
    pub name: String,
    pub item_type: ItemType,
    pub description: Option<String>,
    pub reference_id: Option<CollectionId>,
}

pub struct UpdateCollectionRequest {
    pub collection_id: CollectionId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub reference_id: Option<CollectionId>,
    /// Hands the collection over to another user's workspace.
    pub owner_id: Option<UserId>,
    pub locked: Option<bool>,
}

pub struct MoveCollectionRequest {
    pub collection_id: CollectionId,
    /// The collection to be placed after; `None` moves to the top.
    pub ref_collection_id: Option<CollectionId>,
}

/// Workspace-level operations on behalf of one acting user.
pub struct WorkspaceService<'a> {
    session: &'a mut Session,
    user: User,
}

impl<'a> WorkspaceService<'a> {
    pub fn new(session: &'a mut Session, user: User) -> Self {
        Self { session, user }
    }

    /// The user's collections in workspace order, optionally restricted to
    /// those holding a given item kind.
    pub fn collections(&self, item_type: Option<ItemType>) -> Vec<Collection> {
        let collections = self
            .session
            .collections
            .get_all(self.user.workspace.collection_ids());

        match item_type {
            None => collections,
            Some(item_type) => collections
                .into_iter()
                .filter(|c| c.item_type() == item_type)
                .collect(),
        }
    }

    /// Creates an empty collection at the top of the user's workspace.
    pub fn create_collection(&mut self, req: CreateCollectionRequest) -> CoreResult<Collection> {
        let mut collection = Collection::new(
            self.session.collections.new_id(),
            req.name,
            req.description.unwrap_or_default(),
            req.item_type,
            self.user.id,
        );
        collection.reference_id = req.reference_id;

        self.session.collections.save(collection.clone());
        self.user.workspace.add_collection(collection.id());
        self.session.users.save(self.user.clone());

        Ok(collection)
    }

    /// Updates a collection from the user's workspace.
    ///
    /// A locked collection only accepts being unlocked; any other change is
    /// rejected until then.
    pub fn update_collection(&mut self, req: UpdateCollectionRequest) -> CoreResult<Collection> {
        if !self.user.workspace.contains_collection(req.collection_id) {
            return Err(CoreError::CollectionNotFound(req.collection_id));
        }
        let mut collection = self
            .session
            .collections
            .get(req.collection_id)
            .ok_or(CoreError::CollectionNotFound(req.collection_id))?;

        if collection.locked {
            let unlock_only = req.locked == Some(false)
                && req.name.is_none()
                && req.description.is_none()
                && req.reference_id.is_none()
                && req.owner_id.is_none();
            if !unlock_only {
                return Err(CoreError::CollectionLocked(collection.id()));
            }
        }

        if let Some(name) = req.name {
            collection.name = name;
        }
        if let Some(description) = req.description {
            collection.description = description;
        }
        if let Some(reference_id) = req.reference_id {
            collection.reference_id = Some(reference_id);
        }

        // transferring to oneself is a no-op
        if let Some(new_owner_id) = req.owner_id.filter(|id| *id != self.user.id) {
            let mut new_owner = self
                .session
                .users
                .get(new_owner_id)
                .ok_or(CoreError::UserNotFound(new_owner_id))?;

            transfer_ownership(&mut collection, &mut self.user, &mut new_owner)?;
            self.session.users.save(new_owner);
        }

        if let Some(locked) = req.locked {
            collection.locked = locked;
        }

        self.session.collections.save(collection.clone());
        self.session.users.save(self.user.clone());

        Ok(collection)
    }

    /// Replaces the reader set of a collection from the user's workspace.
    pub fn set_collection_permissions(
        &mut self,
        collection_id: CollectionId,
        reader_ids: Vec<UserId>,
    ) -> CoreResult<()> {
        if !self.user.workspace.contains_collection(collection_id) {
            return Err(CoreError::CollectionNotFound(collection_id));
        }

        for reader_id in &reader_ids {
            // the public user is a sentinel, not a stored account
            if *reader_id != PUBLIC_USER_ID && self.session.users.get(*reader_id).is_none() {
                return Err(CoreError::UserNotFound(*reader_id));
            }
        }

        let mut collection = self
            .session
            .collections
            .get(collection_id)
            .ok_or(CoreError::CollectionNotFound(collection_id))?;
        collection.set_readers(reader_ids);
        self.session.collections.save(collection);

        Ok(())
    }

    /// Deletes a collection and everything beneath it.
    pub fn delete_collection(&mut self, collection_id: CollectionId) -> CoreResult<()> {
        if !self.user.workspace.contains_collection(collection_id) {
            return Err(CoreError::CollectionNotFound(collection_id));
        }
        let collection = self
            .session
            .collections
            .get(collection_id)
            .ok_or(CoreError::CollectionNotFound(collection_id))?;

        if collection.locked {
            return Err(CoreError::CollectionLocked(collection.id()));
        }

        match collection.item_type() {
            ItemType::Codelist => {
                for codelist_id in codelist_ids(collection.items()) {
                    CodelistService::new(self.session, self.user.clone()).delete(codelist_id)?;
                }
            }
            ItemType::Phenotype => {
                for item in collection.items().ids().to_vec() {
                    if let ItemId::Phenotype(phenotype_id) = item {
                        PhenotypeService::new(self.session, self.user.clone())
                            .delete(phenotype_id)?;
                    }
                }
            }
        }

        self.user.workspace.remove_collection(collection_id)?;
        self.session.collections.delete(collection_id);
        self.session.users.save(self.user.clone());

        debug!(collection = %collection_id, "deleted collection with its items");
        Ok(())
    }

    /// Reorders the user's workspace.
    pub fn move_collection(&mut self, req: MoveCollectionRequest) -> CoreResult<()> {
        if Some(req.collection_id) == req.ref_collection_id {
            return Ok(());
        }

        self.user
            .workspace
            .move_collection_after(req.collection_id, req.ref_collection_id)
            .map_err(|e| match e {
                CoreError::CollectionNotInWorkspace(id) => CoreError::CollectionNotFound(id),
                e => e,
            })?;

        self.session.users.save(self.user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{CodelistRepository, PhenotypeRepository};
    use crate::services::fixtures::fixture;
    use clb_ids::WorkspaceId;

    #[test]
    fn test_collections_in_workspace_order_with_filter() {
        let mut fx = fixture();
        // add_collection inserts at the top, so workspace order is 12, 11, 10
        fx.add_collection(10, ItemType::Codelist);
        fx.add_collection(11, ItemType::Phenotype);
        fx.add_collection(12, ItemType::Codelist);

        let all = fx.workspace_service().collections(None);
        assert_eq!(
            all.iter().map(|c| c.id()).collect::<Vec<_>>(),
            vec![
                CollectionId::from_u128(12),
                CollectionId::from_u128(11),
                CollectionId::from_u128(10),
            ]
        );

        let codelists_only = fx.workspace_service().collections(Some(ItemType::Codelist));
        assert_eq!(codelists_only.len(), 2);
        assert!(codelists_only.iter().all(|c| c.item_type() == ItemType::Codelist));
    }

    #[test]
    fn test_create_collection_lands_in_workspace() {
        let mut fx = fixture();
        let collection = fx
            .workspace_service()
            .create_collection(CreateCollectionRequest {
                name: "Stork".into(),
                item_type: ItemType::Codelist,
                description: None,
                reference_id: None,
            })
            .unwrap();

        fx.refresh_user();
        assert!(fx.user.workspace.contains_collection(collection.id()));
        assert_eq!(collection.owner_id(), fx.user.id);
        assert!(fx.session.collections.get(collection.id()).is_some());
    }

    #[test]
    fn test_move_collection() {
        let mut fx = fixture();
        let a = fx.add_collection(10, ItemType::Codelist);
        let b = fx.add_collection(11, ItemType::Codelist);
        // workspace order is [b, a]

        fx.workspace_service()
            .move_collection(MoveCollectionRequest {
                collection_id: b,
                ref_collection_id: Some(a),
            })
            .unwrap();

        fx.refresh_user();
        assert_eq!(fx.user.workspace.collection_ids(), &[a, b]);

        // moving onto itself is a no-op, not an error
        fx.workspace_service()
            .move_collection(MoveCollectionRequest {
                collection_id: a,
                ref_collection_id: Some(a),
            })
            .unwrap();
    }

    #[test]
    fn test_move_unknown_collection_fails() {
        let mut fx = fixture();
        fx.add_collection(10, ItemType::Codelist);

        let got = fx.workspace_service().move_collection(MoveCollectionRequest {
            collection_id: CollectionId::from_u128(99),
            ref_collection_id: None,
        });
        assert!(matches!(got, Err(CoreError::CollectionNotFound(_))));
    }

    #[test]
    fn test_update_locked_collection_only_accepts_unlock() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);

        fx.workspace_service()
            .update_collection(UpdateCollectionRequest {
                collection_id,
                name: None,
                description: None,
                reference_id: None,
                owner_id: None,
                locked: Some(true),
            })
            .unwrap();

        let rename = fx.workspace_service().update_collection(UpdateCollectionRequest {
            collection_id,
            name: Some("renamed".into()),
            description: None,
            reference_id: None,
            owner_id: None,
            locked: None,
        });
        assert!(matches!(rename, Err(CoreError::CollectionLocked(_))));

        // renaming while unlocking is still rejected
        let rename_and_unlock = fx.workspace_service().update_collection(UpdateCollectionRequest {
            collection_id,
            name: Some("renamed".into()),
            description: None,
            reference_id: None,
            owner_id: None,
            locked: Some(false),
        });
        assert!(matches!(rename_and_unlock, Err(CoreError::CollectionLocked(_))));

        let unlocked = fx
            .workspace_service()
            .update_collection(UpdateCollectionRequest {
                collection_id,
                name: None,
                description: None,
                reference_id: None,
                owner_id: None,
                locked: Some(false),
            })
            .unwrap();
        assert!(!unlocked.locked);
    }

    #[test]
    fn test_transfer_ownership_moves_workspaces() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let new_owner = fx.add_user(2);

        let collection = fx
            .workspace_service()
            .update_collection(UpdateCollectionRequest {
                collection_id,
                name: None,
                description: None,
                reference_id: None,
                owner_id: Some(new_owner.id),
                locked: None,
            })
            .unwrap();

        fx.refresh_user();
        assert!(!fx.user.workspace.contains_collection(collection_id));
        assert!(collection.shared_with.contains(&fx.user.id));

        let new_owner = fx.session.users.get(new_owner.id).unwrap();
        assert!(new_owner.workspace.contains_collection(collection_id));
        assert!(!collection.shared_with.contains(&new_owner.id));
    }

    #[test]
    fn test_set_collection_permissions_validates_readers() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        let reader = fx.add_user(2);

        fx.workspace_service()
            .set_collection_permissions(collection_id, vec![reader.id, PUBLIC_USER_ID])
            .unwrap();
        let collection = fx.session.collections.get(collection_id).unwrap();
        assert!(collection.shared_with.contains(&reader.id));
        assert!(collection.shared_with.contains(&PUBLIC_USER_ID));

        let got = fx
            .workspace_service()
            .set_collection_permissions(collection_id, vec![UserId::from_u128(999)]);
        assert!(matches!(got, Err(CoreError::UserNotFound(_))));
    }

    #[test]
    fn test_delete_collection_cascades_through_phenotypes() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Phenotype);
        let phenotype_id = fx.add_phenotype(collection_id, 20, "PH");
        let codelist_id = fx.add_codelist_to_phenotype(phenotype_id, 30, "CL");

        fx.workspace_service()
            .delete_collection(collection_id)
            .unwrap();

        assert!(fx.session.collections.get(collection_id).is_none());
        assert!(fx.session.phenotypes.get(phenotype_id).is_none());
        assert!(fx.session.codelists.get(codelist_id).is_none());
        fx.refresh_user();
        assert!(!fx.user.workspace.contains_collection(collection_id));
    }

    #[test]
    fn test_delete_locked_collection_fails() {
        let mut fx = fixture();
        let collection_id = fx.add_collection(10, ItemType::Codelist);
        fx.add_codelist_to_collection(collection_id, 11, "CL");
        fx.lock_collection(collection_id);

        let got = fx.workspace_service().delete_collection(collection_id);
        assert!(matches!(got, Err(CoreError::CollectionLocked(_))));
        assert!(fx.session.collections.get(collection_id).is_some());
    }

    #[test]
    fn test_workspace_ids_are_distinct_per_user() {
        let mut fx = fixture();
        let other = fx.add_user(2);
        assert_ne!(fx.user.workspace.id, other.workspace.id);
        assert_eq!(other.workspace.id, WorkspaceId::from_u128(2));
    }
}
