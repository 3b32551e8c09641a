//! Persistence collaborators.
//!
//! The engine reads and writes through three traits:
//!
//! - `RosterStore`: sub-entity rosters and filtered member lists
//! - `AttendanceStore`: raw attendance rows for a member set and window
//! - `ServicePeriodStore`: service-period writes and duplicate-window checks
//!
//! `MemoryStore` implements all three over an in-memory dataset that can be
//! persisted as a JSON snapshot.

pub mod memory;
pub mod snapshot;

use thiserror::Error;

use crate::models::{
    AttendanceEntry, DateWindow, Member, PeriodOwner, ServicePeriod, ServicePeriodInput,
    SubEntityKind, SubEntityRoster,
};
use crate::scope::MemberQuery;

pub use memory::{Dataset, MemoryStore};
pub use snapshot::{Snapshot, SnapshotFile};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[allow(async_fn_in_trait)]
pub trait RosterStore {
    /// A sub-entity with its manager and member roster
    async fn sub_entity_roster(
        &self,
        kind: SubEntityKind,
        id: i64,
    ) -> Result<Option<SubEntityRoster>, StoreError>;

    /// Members matching the query, ordered and cut to `query.limit`
    async fn find_members(&self, query: &MemberQuery) -> Result<Vec<Member>, StoreError>;

    /// Number of members matching the query, ignoring the limit
    async fn count_members(&self, query: &MemberQuery) -> Result<usize, StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait AttendanceStore {
    /// Rows for `member_ids` dated inside `window`. Rows from cross-entity
    /// sheets are only returned when the sheet's whole span lies inside
    /// `window`.
    async fn attendance_entries(
        &self,
        member_ids: &[i64],
        window: DateWindow,
    ) -> Result<Vec<AttendanceEntry>, StoreError>;
}

#[allow(async_fn_in_trait)]
pub trait ServicePeriodStore {
    /// Whether `owner` already has a period with exactly this window,
    /// ignoring the period with id `excluding`.
    async fn window_exists(
        &self,
        owner: PeriodOwner,
        window: DateWindow,
        excluding: Option<i64>,
    ) -> Result<bool, StoreError>;

    async fn get_period(&self, id: i64) -> Result<Option<ServicePeriod>, StoreError>;

    async fn insert_period(&self, input: ServicePeriodInput) -> Result<ServicePeriod, StoreError>;

    async fn update_period(
        &self,
        id: i64,
        input: ServicePeriodInput,
    ) -> Result<ServicePeriod, StoreError>;

    /// Removes and returns the period
    async fn delete_period(&self, id: i64) -> Result<ServicePeriod, StoreError>;

    async fn list_periods(&self, owner: PeriodOwner) -> Result<Vec<ServicePeriod>, StoreError>;
}
