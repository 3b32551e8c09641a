use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{AttendanceStore, RosterStore, ServicePeriodStore, SnapshotFile, StoreError};
use crate::models::{
    AttendanceEntry, AttendanceSheet, DateWindow, Member, PeriodOwner, ServicePeriod,
    ServicePeriodInput, SheetKind, SubEntity, SubEntityKind, SubEntityRoster,
};
use crate::scope::MemberQuery;

/// Everything the in-memory store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(rename = "subEntities", default)]
    pub sub_entities: Vec<SubEntity>,
    #[serde(default)]
    pub sheets: Vec<AttendanceSheet>,
    #[serde(rename = "servicePeriods", default)]
    pub service_periods: Vec<ServicePeriod>,
}

impl Dataset {
    fn next_period_id(&self) -> i64 {
        self.service_periods.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }
}

/// In-memory store, optionally persisted to a JSON snapshot after each write.
pub struct MemoryStore {
    data: RwLock<Dataset>,
    file: Option<SnapshotFile>,
}

impl MemoryStore {
    pub fn new(data: Dataset) -> Self {
        Self {
            data: RwLock::new(data),
            file: None,
        }
    }

    /// Open a snapshot file, starting empty when it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let file = SnapshotFile::new(path);
        let data = match file.load::<Dataset>()? {
            Some(snapshot) => {
                info!(
                    path = %file.path().display(),
                    members = snapshot.data.members.len(),
                    sheets = snapshot.data.sheets.len(),
                    age = %snapshot.age_display(),
                    "Loaded dataset"
                );
                snapshot.data
            }
            None => {
                info!(path = %file.path().display(), "No dataset yet, starting empty");
                Dataset::default()
            }
        };
        Ok(Self {
            data: RwLock::new(data),
            file: Some(file),
        })
    }

    /// Copy of the current dataset
    pub async fn dataset(&self) -> Dataset {
        self.data.read().await.clone()
    }

    fn persist(&self, data: &Dataset) -> Result<(), StoreError> {
        match &self.file {
            Some(file) => file.save(data),
            None => Ok(()),
        }
    }

    /// Apply a change to the service periods and persist it.
    /// On a persistence failure the in-memory periods are restored.
    async fn write_periods<T>(
        &self,
        change: impl FnOnce(&mut Dataset) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().await;
        let backup = data.service_periods.clone();
        let result = change(&mut *data)?;
        if let Err(e) = self.persist(&data) {
            data.service_periods = backup;
            return Err(e);
        }
        Ok(result)
    }
}

impl RosterStore for MemoryStore {
    async fn sub_entity_roster(
        &self,
        kind: SubEntityKind,
        id: i64,
    ) -> Result<Option<SubEntityRoster>, StoreError> {
        let data = self.data.read().await;
        let Some(entity) = data.sub_entities.iter().find(|e| e.kind == kind && e.id == id) else {
            return Ok(None);
        };
        let member_ids = data
            .members
            .iter()
            .filter(|m| m.assignment.is_assigned_to(kind, id))
            .map(|m| m.id)
            .collect();
        Ok(Some(SubEntityRoster {
            entity: entity.clone(),
            member_ids,
        }))
    }

    async fn find_members(&self, query: &MemberQuery) -> Result<Vec<Member>, StoreError> {
        let data = self.data.read().await;
        let mut members: Vec<&Member> = data.members.iter().filter(|m| query.matches(m)).collect();
        members.sort_by(|a, b| query.compare(a, b));
        Ok(members.into_iter().take(query.limit).cloned().collect())
    }

    async fn count_members(&self, query: &MemberQuery) -> Result<usize, StoreError> {
        let data = self.data.read().await;
        Ok(data.members.iter().filter(|m| query.matches(m)).count())
    }
}

impl AttendanceStore for MemoryStore {
    async fn attendance_entries(
        &self,
        member_ids: &[i64],
        window: DateWindow,
    ) -> Result<Vec<AttendanceEntry>, StoreError> {
        let data = self.data.read().await;
        let mut entries = Vec::new();
        for sheet in &data.sheets {
            if sheet.kind == SheetKind::CrossEntity && !window.encloses(&sheet.span) {
                debug!(sheet_id = sheet.id, span = %sheet.span, "Cross-entity sheet not inside window");
                continue;
            }
            entries.extend(
                sheet
                    .rows
                    .iter()
                    .filter(|row| window.contains(row.date) && member_ids.contains(&row.member_id))
                    .map(|row| row.to_entry(sheet.id)),
            );
        }
        Ok(entries)
    }
}

impl ServicePeriodStore for MemoryStore {
    async fn window_exists(
        &self,
        owner: PeriodOwner,
        window: DateWindow,
        excluding: Option<i64>,
    ) -> Result<bool, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .service_periods
            .iter()
            .any(|p| p.owner == owner && p.window == window && Some(p.id) != excluding))
    }

    async fn get_period(&self, id: i64) -> Result<Option<ServicePeriod>, StoreError> {
        let data = self.data.read().await;
        Ok(data.service_periods.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_period(&self, input: ServicePeriodInput) -> Result<ServicePeriod, StoreError> {
        self.write_periods(|data| {
            let period = ServicePeriod {
                id: data.next_period_id(),
                owner: input.owner,
                window: input.window,
            };
            data.service_periods.push(period.clone());
            Ok(period)
        })
        .await
    }

    async fn update_period(
        &self,
        id: i64,
        input: ServicePeriodInput,
    ) -> Result<ServicePeriod, StoreError> {
        self.write_periods(|data| {
            let period = data
                .service_periods
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("service period {}", id)))?;
            period.owner = input.owner;
            period.window = input.window;
            Ok(period.clone())
        })
        .await
    }

    async fn delete_period(&self, id: i64) -> Result<ServicePeriod, StoreError> {
        self.write_periods(|data| {
            let index = data
                .service_periods
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("service period {}", id)))?;
            Ok(data.service_periods.remove(index))
        })
        .await
    }

    async fn list_periods(&self, owner: PeriodOwner) -> Result<Vec<ServicePeriod>, StoreError> {
        let data = self.data.read().await;
        let mut periods: Vec<ServicePeriod> = data
            .service_periods
            .iter()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        periods.sort_by_key(|p| (p.window.from, p.window.to, p.id));
        Ok(periods)
    }
}
