use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubEntityKind {
    Tribe,
    Department,
    HonorFamily,
}

impl std::fmt::Display for SubEntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubEntityKind::Tribe => write!(f, "Tribe"),
            SubEntityKind::Department => write!(f, "Department"),
            SubEntityKind::HonorFamily => write!(f, "Honor Family"),
        }
    }
}

/// A tribe, department or honor family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubEntity {
    pub id: i64,
    pub kind: SubEntityKind,
    pub name: String,
    #[serde(rename = "managerId")]
    pub manager_id: i64,
    #[serde(rename = "assistantManagerIds", default)]
    pub assistant_manager_ids: Vec<i64>,
}

impl SubEntity {
    /// Whether the member runs this sub-entity, as manager or assistant.
    pub fn is_managed_by(&self, member_id: i64) -> bool {
        self.manager_id == member_id || self.assistant_manager_ids.contains(&member_id)
    }
}

/// A sub-entity together with the ids of the members assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubEntityRoster {
    pub entity: SubEntity,
    pub member_ids: Vec<i64>,
}
