use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::registration::ServiceName;

/// One instance inside a patch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct PatchEntry {
    #[schema(value_type = String)]
    pub name: ServiceName,
    pub url: String,
}

impl PatchEntry {
    pub fn new(name: impl Into<ServiceName>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Membership delta pushed to a dependent's update URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Patch {
    #[serde(default)]
    pub added: Vec<PatchEntry>,
    #[serde(default)]
    pub removed: Vec<PatchEntry>,
}

impl Patch {
    pub fn added(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: entries,
            removed: Vec::new(),
        }
    }

    pub fn removed(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: Vec::new(),
            removed: entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
