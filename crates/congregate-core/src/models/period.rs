use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SubEntityKind;

/// Inclusive calendar window `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn is_ordered(&self) -> bool {
        self.from <= self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// True when `other` lies entirely inside this window.
    pub fn encloses(&self, other: &DateWindow) -> bool {
        self.from <= other.from && other.to <= self.to
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.from, self.to)
    }
}

/// The sub-entity a service period belongs to.
/// Honor families do not schedule service periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodOwner {
    Tribe(i64),
    Department(i64),
}

impl PeriodOwner {
    pub fn id(&self) -> i64 {
        match self {
            PeriodOwner::Tribe(id) | PeriodOwner::Department(id) => *id,
        }
    }

    pub fn kind(&self) -> SubEntityKind {
        match self {
            PeriodOwner::Tribe(_) => SubEntityKind::Tribe,
            PeriodOwner::Department(_) => SubEntityKind::Department,
        }
    }
}

impl std::fmt::Display for PeriodOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePeriod {
    pub id: i64,
    pub owner: PeriodOwner,
    pub window: DateWindow,
}

/// Fields accepted by create and update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePeriodInput {
    pub owner: PeriodOwner,
    pub window: DateWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for PeriodAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodAction::Create => write!(f, "create"),
            PeriodAction::Update => write!(f, "update"),
            PeriodAction::Delete => write!(f, "delete"),
        }
    }
}
