use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SubEntityKind;

/// Zero-or-one assignment to each kind of sub-entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgAssignment {
    #[serde(rename = "tribeId", default)]
    pub tribe_id: Option<i64>,
    #[serde(rename = "departmentId", default)]
    pub department_id: Option<i64>,
    #[serde(rename = "honorFamilyId", default)]
    pub honor_family_id: Option<i64>,
}

impl OrgAssignment {
    /// The sub-entity id assigned for the given kind, if any.
    pub fn id_for(&self, kind: SubEntityKind) -> Option<i64> {
        match kind {
            SubEntityKind::Tribe => self.tribe_id,
            SubEntityKind::Department => self.department_id,
            SubEntityKind::HonorFamily => self.honor_family_id,
        }
    }

    pub fn is_assigned_to(&self, kind: SubEntityKind, id: i64) -> bool {
        self.id_for(kind) == Some(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Sole signal used to classify a member as new or existing for a period.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assignment: OrgAssignment,
}

impl Member {
    /// Check if the member matches a free-text query against name and phone.
    /// Query should already be trimmed; an empty query matches everyone.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        crate::utils::contains_ignore_case(&self.name, query)
            || self
                .phone
                .as_deref()
                .map(|p| crate::utils::contains_ignore_case(p, query))
                .unwrap_or(false)
    }
}
