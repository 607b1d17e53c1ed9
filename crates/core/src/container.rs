//! Ordered containers and item placement.
//!
//! Collections and phenotypes both hold an ordered, duplicate-free list of
//! child item ids. The list is only ever changed through the single
//! placement primitive [`ItemList::add_or_move_item_after`] and
//! [`ItemList::remove_item`]; external callers never splice it directly.
//!
//! An item records who contains it through a [`ContainerSpec`]: a plain
//! locator value (container kind + id), resolved lazily through the
//! repository layer. There is no live bidirectional object graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use clb_ids::{CodelistId, CollectionId, PhenotypeId};

/// The kind of a container node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    Collection,
    Phenotype,
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerType::Collection => write!(f, "Collection"),
            ContainerType::Phenotype => write!(f, "Phenotype"),
        }
    }
}

/// The kind of item a container holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Phenotype,
    Codelist,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Phenotype => write!(f, "Phenotype"),
            ItemType::Codelist => write!(f, "Codelist"),
        }
    }
}

/// Typed identifier of a container item.
///
/// The exhaustive case list here is what every "which repository do I call"
/// dispatch matches on; a future third item kind extends this enum and the
/// compiler points at every match that needs a new arm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemId {
    Phenotype(PhenotypeId),
    Codelist(CodelistId),
}

impl ItemId {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemId::Phenotype(_) => ItemType::Phenotype,
            ItemId::Codelist(_) => ItemType::Codelist,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Phenotype(id) => write!(f, "{id}"),
            ItemId::Codelist(id) => write!(f, "{id}"),
        }
    }
}

impl From<PhenotypeId> for ItemId {
    fn from(id: PhenotypeId) -> Self {
        ItemId::Phenotype(id)
    }
}

impl From<CodelistId> for ItemId {
    fn from(id: CodelistId) -> Self {
        ItemId::Codelist(id)
    }
}

/// Back-reference from an item to its container.
///
/// A lightweight locator, not an owning reference: holders resolve it
/// through the repository layer when they need the actual container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerSpec {
    Collection(CollectionId),
    Phenotype(PhenotypeId),
}

impl ContainerSpec {
    pub fn container_type(&self) -> ContainerType {
        match self {
            ContainerSpec::Collection(_) => ContainerType::Collection,
            ContainerSpec::Phenotype(_) => ContainerType::Phenotype,
        }
    }
}

impl fmt::Display for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerSpec::Collection(id) => write!(f, "{id}"),
            ContainerSpec::Phenotype(id) => write!(f, "{id}"),
        }
    }
}

/// The ordered, duplicate-free list of item ids a container holds.
///
/// All placement goes through [`ItemList::add_or_move_item_after`]: "add"
/// and "move" are the same operation, because an item cannot be in two
/// containers, so adding is a no-op move from nowhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    item_type: ItemType,
    item_ids: Vec<ItemId>,
}

impl ItemList {
    /// Creates an empty list holding items of `item_type`.
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            item_ids: Vec::new(),
        }
    }

    /// Creates a list from already-ordered item ids, e.g. when rehydrating
    /// from persistence.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InconsistentState`] when an id is of the wrong
    /// kind or occurs more than once.
    pub fn with_items(item_type: ItemType, item_ids: Vec<ItemId>) -> CoreResult<Self> {
        let mut list = Self::new(item_type);
        for item_id in item_ids {
            if item_id.item_type() != item_type {
                return Err(CoreError::InconsistentState(format!(
                    "item {item_id} is of type {} but the list holds {item_type}",
                    item_id.item_type()
                )));
            }
            if list.contains(item_id) {
                return Err(CoreError::InconsistentState(format!(
                    "item {item_id} occurs more than once"
                )));
            }
            list.item_ids.push(item_id);
        }
        Ok(list)
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// The item ids in container order.
    pub fn ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.item_ids.contains(&item_id)
    }

    /// Adds `item_id`, or moves it when already present.
    ///
    /// With `ref_item = None` the item ends up in first position, otherwise
    /// directly after `ref_item`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RefItemNotInContainer`] when `ref_item` is given
    /// but not a member, and [`CoreError::InconsistentState`] when `item_id`
    /// is of the wrong kind. The list is unchanged on error.
    pub fn add_or_move_item_after(
        &mut self,
        item_id: ItemId,
        ref_item: Option<ItemId>,
    ) -> CoreResult<()> {
        if item_id.item_type() != self.item_type {
            return Err(CoreError::InconsistentState(format!(
                "item {item_id} is of type {} but the list holds {}",
                item_id.item_type(),
                self.item_type
            )));
        }

        if ref_item == Some(item_id) {
            return Err(CoreError::SelfMove);
        }

        if let Some(ref_item) = ref_item {
            if !self.contains(ref_item) {
                return Err(CoreError::RefItemNotInContainer);
            }
        }

        self.remove_item(item_id);

        let new_pos = match ref_item {
            None => 0,
            // the ref item is a member, checked above
            Some(ref_item) => {
                self.item_ids
                    .iter()
                    .position(|id| *id == ref_item)
                    .unwrap_or(0)
                    + 1
            }
        };

        self.item_ids.insert(new_pos, item_id);
        Ok(())
    }

    /// Removes `item_id`. A no-op when the item is not a member.
    pub fn remove_item(&mut self, item_id: ItemId) {
        self.item_ids.retain(|id| *id != item_id);
    }
}

/// A node held by a container: a phenotype or a codelist.
pub trait ContainerItem {
    fn item_id(&self) -> ItemId;

    /// The back-reference to the containing node.
    fn container(&self) -> ContainerSpec;

    fn set_container(&mut self, spec: ContainerSpec);

    fn item_type(&self) -> ItemType {
        self.item_id().item_type()
    }
}

/// A node that holds ordered child items: a collection or a phenotype.
pub trait Container {
    fn container_spec(&self) -> ContainerSpec;

    fn items(&self) -> &ItemList;

    fn items_mut(&mut self) -> &mut ItemList;
}

/// Places `item` into `dest`, removing it from `source` first.
///
/// `source` is the container currently holding `item`. Pass `None` when the
/// item is being created, or when `dest` is the item's current container (a
/// reorder within one container; the placement primitive relocates the item
/// itself). `ref_item` defines the relative position: first when `None`,
/// directly after `ref_item` otherwise.
///
/// All validations run before any mutation, so a rejected move leaves every
/// aggregate untouched:
/// 1. the item kind must match `dest`'s item type,
/// 2. an item cannot be placed after itself,
/// 3. `ref_item`, when given, must be a member of `dest`,
/// 4. `item`, when a source is given, must be a member of `source`.
///
/// On success the item's own back-reference is rewritten to point at `dest`.
pub fn add_or_move_item(
    source: Option<&mut dyn Container>,
    item: &mut dyn ContainerItem,
    dest: &mut dyn Container,
    ref_item: Option<ItemId>,
) -> CoreResult<()> {
    let item_id = item.item_id();

    if item_id.item_type() != dest.items().item_type() {
        return Err(CoreError::ItemTypeMismatch {
            item: item_id,
            item_type: item_id.item_type(),
            container: dest.container_spec(),
            container_item_type: dest.items().item_type(),
        });
    }

    if ref_item == Some(item_id) {
        return Err(CoreError::SelfMove);
    }

    if let Some(ref_item) = ref_item {
        if !dest.items().contains(ref_item) {
            return Err(CoreError::RefItemNotInContainer);
        }
    }

    if let Some(source) = &source {
        if !source.items().contains(item_id) {
            return Err(CoreError::ItemNotInContainer);
        }
    }

    if let Some(source) = source {
        source.items_mut().remove_item(item_id);
    }

    dest.items_mut().add_or_move_item_after(item_id, ref_item)?;
    item.set_container(dest.container_spec());

    Ok(())
}
