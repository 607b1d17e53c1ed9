//! Phenotypes: the middle layer of the containment hierarchy.
//!
//! A phenotype is both a container item (held by a collection) and a
//! container (of codelists). It spans the two hierarchy levels between a
//! root collection and the codelists that operationalize it.

use serde::Serialize;

use crate::container::{Container, ContainerItem, ContainerSpec, ItemId, ItemList, ItemType};
use crate::error::CoreResult;
use clb_ids::{CodelistId, PhenotypeId};

/// An ordered container of codelists describing one medical phenotype.
#[derive(Clone, Debug, Serialize)]
pub struct Phenotype {
    id: PhenotypeId,
    pub name: String,
    pub medical_description: String,
    pub operational_description: String,
    items: ItemList,
    /// Back-reference to the collection holding this phenotype.
    container: ContainerSpec,
    /// The phenotype this one was cloned from, if any.
    pub reference_id: Option<PhenotypeId>,
}

impl Phenotype {
    pub fn new(
        id: PhenotypeId,
        name: impl Into<String>,
        medical_description: impl Into<String>,
        operational_description: impl Into<String>,
        container: ContainerSpec,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            medical_description: medical_description.into(),
            operational_description: operational_description.into(),
            items: ItemList::new(ItemType::Codelist),
            container,
            reference_id: None,
        }
    }

    /// Rebuilds a phenotype from persisted parts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: PhenotypeId,
        name: impl Into<String>,
        medical_description: impl Into<String>,
        operational_description: impl Into<String>,
        item_ids: Vec<ItemId>,
        container: ContainerSpec,
        reference_id: Option<PhenotypeId>,
    ) -> CoreResult<Self> {
        Ok(Self {
            id,
            name: name.into(),
            medical_description: medical_description.into(),
            operational_description: operational_description.into(),
            items: ItemList::with_items(ItemType::Codelist, item_ids)?,
            container,
            reference_id,
        })
    }

    pub fn id(&self) -> PhenotypeId {
        self.id
    }

    pub fn to_spec(&self) -> ContainerSpec {
        ContainerSpec::Phenotype(self.id)
    }

    /// The contained codelist ids in container order.
    pub fn codelist_ids(&self) -> Vec<CodelistId> {
        self.items
            .ids()
            .iter()
            .filter_map(|item| match item {
                ItemId::Codelist(id) => Some(*id),
                ItemId::Phenotype(_) => None,
            })
            .collect()
    }
}

impl Container for Phenotype {
    fn container_spec(&self) -> ContainerSpec {
        ContainerSpec::Phenotype(self.id)
    }

    fn items(&self) -> &ItemList {
        &self.items
    }

    fn items_mut(&mut self) -> &mut ItemList {
        &mut self.items
    }
}

impl ContainerItem for Phenotype {
    fn item_id(&self) -> ItemId {
        ItemId::Phenotype(self.id)
    }

    fn container(&self) -> ContainerSpec {
        self.container
    }

    fn set_container(&mut self, spec: ContainerSpec) {
        self.container = spec;
    }
}
