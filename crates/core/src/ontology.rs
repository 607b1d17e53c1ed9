//! Ontologies and codes.
//!
//! An ontology is a medical coding system (e.g. a release of a
//! classification scheme); codes are scoped to exactly one ontology and are
//! addressed internally by numeric identifiers. The code tree itself is
//! owned by an external catalogue; the core only consumes lookups through
//! [`crate::repo::CodeRepository`].

use serde::{Deserialize, Serialize};

/// A medical coding system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ontology {
    pub id: String,
    /// Entry points of the code hierarchy.
    pub root_code_ids: Vec<i64>,
}

impl Ontology {
    pub fn name(&self) -> &str {
        &self.id
    }
}

/// One node of an ontology's code hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub id: i64,
    /// The raw code string, e.g. "I21.0".
    pub code: String,
    pub ontology_id: String,
    pub description: String,
    /// Ids from the root down to (and including) this code.
    pub path: Vec<i64>,
    pub children_ids: Vec<i64>,
    /// Highest descendant id; `id..=last_descendant_id` spans the subtree.
    pub last_descendant_id: i64,
}

impl Code {
    pub fn parent_id(&self) -> Option<i64> {
        if self.path.len() <= 1 {
            return None;
        }
        self.path.get(self.path.len() - 2).copied()
    }
}
