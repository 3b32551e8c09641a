//! Service-period scheduling.
//!
//! A tribe or department may not hold two service periods with the exact
//! same `(from, to)` window. Partial overlaps are allowed. The duplicate
//! check and the write for one owner run under that owner's lock, so two
//! concurrent creates for the same owner cannot both pass the check.
//!
//! After every successful write the owner's manager is notified. A failed
//! notification is logged and never undoes the write.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::{DateWindow, PeriodAction, PeriodOwner, ServicePeriod, ServicePeriodInput};
use crate::notify::{Notifier, PeriodNotice};
use crate::scope::Role;
use crate::store::{RosterStore, ServicePeriodStore, StoreError};

/// The input field a validation failure is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodField {
    From,
    To,
}

impl std::fmt::Display for PeriodField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodField::From => write!(f, "from"),
            PeriodField::To => write!(f, "to"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid {field}: {message}")]
    Validation { field: PeriodField, message: String },

    #[error("Service period not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScheduleError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ScheduleError::Validation { .. })
    }
}

pub struct Scheduler<S, N> {
    store: Arc<S>,
    notifier: N,
    locks: Mutex<HashMap<PeriodOwner, Arc<Mutex<()>>>>,
}

impl<S, N> Scheduler<S, N>
where
    S: RosterStore + ServicePeriodStore,
    N: Notifier,
{
    pub fn new(store: Arc<S>, notifier: N) -> Self {
        Self {
            store,
            notifier,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, input: ServicePeriodInput) -> Result<ServicePeriod, ScheduleError> {
        let period = {
            let lock = self.owner_lock(input.owner).await;
            let _guard = lock.lock().await;

            self.validate(input, None).await?;
            self.store.insert_period(input).await?
        };
        info!(id = period.id, owner = %period.owner, window = %period.window, "Service period created");

        self.notify(period.owner, period.window, PeriodAction::Create).await;
        Ok(period)
    }

    pub async fn update(&self, id: i64, input: ServicePeriodInput) -> Result<ServicePeriod, ScheduleError> {
        let (previous, period) = {
            let lock = self.owner_lock(input.owner).await;
            let _guard = lock.lock().await;

            let previous = self
                .store
                .get_period(id)
                .await?
                .ok_or(ScheduleError::NotFound(id))?;
            self.validate(input, Some(id)).await?;
            (previous, self.store.update_period(id, input).await?)
        };
        info!(id, owner = %period.owner, window = %period.window, "Service period updated");

        // Moving to another owner removes the period from the old one
        if previous.owner != period.owner {
            self.notify(previous.owner, previous.window, PeriodAction::Delete).await;
        }
        self.notify(period.owner, period.window, PeriodAction::Update).await;
        Ok(period)
    }

    pub async fn delete(&self, id: i64) -> Result<ServicePeriod, ScheduleError> {
        let existing = self
            .store
            .get_period(id)
            .await?
            .ok_or(ScheduleError::NotFound(id))?;
        let period = {
            let lock = self.owner_lock(existing.owner).await;
            let _guard = lock.lock().await;

            match self.store.delete_period(id).await {
                Ok(period) => period,
                Err(StoreError::NotFound(_)) => return Err(ScheduleError::NotFound(id)),
                Err(e) => return Err(e.into()),
            }
        };
        info!(id, owner = %period.owner, window = %period.window, "Service period deleted");

        self.notify(period.owner, period.window, PeriodAction::Delete).await;
        Ok(period)
    }

    /// Periods of one owner, earliest first
    pub async fn list(&self, owner: PeriodOwner) -> Result<Vec<ServicePeriod>, ScheduleError> {
        Ok(self.store.list_periods(owner).await?)
    }

    /// One lock per owner, kept for the scheduler's lifetime. The map holds
    /// at most one entry per tribe or department ever written.
    async fn owner_lock(&self, owner: PeriodOwner) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(owner).or_default().clone()
    }

    async fn validate(&self, input: ServicePeriodInput, excluding: Option<i64>) -> Result<(), ScheduleError> {
        if !input.window.is_ordered() {
            return Err(ScheduleError::Validation {
                field: PeriodField::To,
                message: format!("end date {} is before start date {}", input.window.to, input.window.from),
            });
        }
        if self.store.window_exists(input.owner, input.window, excluding).await? {
            warn!(owner = %input.owner, window = %input.window, "Duplicate service period window rejected");
            return Err(ScheduleError::Validation {
                field: PeriodField::From,
                message: format!("{} already has a service period for {}", input.owner, input.window),
            });
        }
        Ok(())
    }

    async fn notify(&self, owner: PeriodOwner, window: DateWindow, action: PeriodAction) {
        let roster = match self.store.sub_entity_roster(owner.kind(), owner.id()).await {
            Ok(Some(roster)) => roster,
            Ok(None) => {
                warn!(%owner, %action, "No sub-entity to notify for service period");
                return;
            }
            Err(e) => {
                warn!(%owner, %action, error = %e, "Failed to resolve manager for service period notice");
                return;
            }
        };

        let notice = PeriodNotice {
            owner,
            manager_id: roster.entity.manager_id,
            manager_role: Role::manager_of(owner.kind()),
            window,
            action,
        };
        if let Err(e) = self.notifier.notify_manager(&notice).await {
            warn!(
                %owner,
                %action,
                manager_id = notice.manager_id,
                transient = e.is_transient(),
                error = %e,
                "Service period notice not delivered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubEntity, SubEntityKind};
    use crate::notify::NotifyError;
    use crate::store::{Dataset, MemoryStore};
    use chrono::NaiveDate;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: StdMutex<Vec<PeriodNotice>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify_manager(&self, notice: &PeriodNotice) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        async fn notify_manager(&self, _notice: &PeriodNotice) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected {
                status: 503,
                body: "down".to_string(),
            })
        }
    }

    /// Completes only once `parties` notices are being delivered at once.
    struct RendezvousNotifier {
        barrier: tokio::sync::Barrier,
    }

    impl Notifier for RendezvousNotifier {
        async fn notify_manager(&self, _notice: &PeriodNotice) -> Result<(), NotifyError> {
            self.barrier.wait().await;
            Ok(())
        }
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn july() -> DateWindow {
        DateWindow::new(d(7, 1), d(7, 31))
    }

    fn store() -> Arc<MemoryStore> {
        let tribe = |id: i64, manager_id: i64| SubEntity {
            id,
            kind: SubEntityKind::Tribe,
            name: format!("Tribe {}", id),
            manager_id,
            assistant_manager_ids: vec![],
        };
        Arc::new(MemoryStore::new(Dataset {
            sub_entities: vec![tribe(1, 11), tribe(2, 22)],
            ..Dataset::default()
        }))
    }

    fn input(owner: PeriodOwner, window: DateWindow) -> ServicePeriodInput {
        ServicePeriodInput { owner, window }
    }

    #[tokio::test]
    async fn test_duplicate_window_rejected_on_from() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();

        let err = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap_err();
        match err {
            ScheduleError::Validation { field, .. } => assert_eq!(field, PeriodField::From),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_window_other_owner_succeeds() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        assert!(scheduler.create(input(PeriodOwner::Tribe(2), july())).await.is_ok());
        assert!(scheduler.create(input(PeriodOwner::Department(1), july())).await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_overlap_allowed() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        let overlap = DateWindow::new(d(7, 15), d(8, 15));
        assert!(scheduler.create(input(PeriodOwner::Tribe(1), overlap)).await.is_ok());
    }

    #[tokio::test]
    async fn test_inverted_window_rejected_on_to() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        let err = scheduler
            .create(input(PeriodOwner::Tribe(1), DateWindow::new(d(7, 31), d(7, 1))))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: PeriodField::To, .. }));
    }

    #[tokio::test]
    async fn test_update_may_keep_its_own_window() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        let period = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        assert!(scheduler.update(period.id, input(PeriodOwner::Tribe(1), july())).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_into_existing_window_rejected() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        let august = DateWindow::new(d(8, 1), d(8, 31));
        let second = scheduler.create(input(PeriodOwner::Tribe(1), august)).await.unwrap();

        let err = scheduler.update(second.id, input(PeriodOwner::Tribe(1), july())).await.unwrap_err();
        assert!(err.is_validation());
        let periods = scheduler.list(PeriodOwner::Tribe(1)).await.unwrap();
        assert_eq!(periods[1].window, august);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        assert!(matches!(scheduler.delete(99).await, Err(ScheduleError::NotFound(99))));
        assert!(matches!(
            scheduler.update(99, input(PeriodOwner::Tribe(1), july())).await,
            Err(ScheduleError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_every_action_notifies_manager() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        let period = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        let august = DateWindow::new(d(8, 1), d(8, 31));
        scheduler.update(period.id, input(PeriodOwner::Tribe(1), august)).await.unwrap();
        scheduler.delete(period.id).await.unwrap();

        let sent = scheduler.notifier.sent.lock().unwrap();
        let actions: Vec<PeriodAction> = sent.iter().map(|n| n.action).collect();
        assert_eq!(actions, vec![PeriodAction::Create, PeriodAction::Update, PeriodAction::Delete]);
        assert!(sent.iter().all(|n| n.manager_id == 11 && n.manager_role == Role::TribeManager));
        assert_eq!(sent[1].window, august);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_write() {
        let scheduler = Scheduler::new(store(), FailingNotifier);
        let period = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        assert_eq!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap(), vec![period]);
    }

    #[tokio::test]
    async fn test_missing_sub_entity_still_schedules() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        assert!(scheduler.create(input(PeriodOwner::Department(7), july())).await.is_ok());
        assert!(scheduler.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_creates_commit_once() {
        let scheduler = Arc::new(Scheduler::new(store(), RecordingNotifier::default()));
        let attempts = (0..8).map(|_| {
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.create(input(PeriodOwner::Tribe(1), july())).await }
        });
        let results = futures::future::join_all(attempts).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(results.iter().filter(|r| matches!(r, Err(e) if e.is_validation())).count(), 7);
        assert_eq!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_notification_does_not_block_next_write() {
        let notifier = RendezvousNotifier {
            barrier: tokio::sync::Barrier::new(2),
        };
        let scheduler = Scheduler::new(store(), notifier);
        let august = DateWindow::new(d(8, 1), d(8, 31));

        let both = async {
            tokio::join!(
                scheduler.create(input(PeriodOwner::Tribe(1), july())),
                scheduler.create(input(PeriodOwner::Tribe(1), august)),
            )
        };
        let (first, second) = tokio::time::timeout(std::time::Duration::from_secs(5), both)
            .await
            .expect("writes for one owner waited on each other's notification");

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_moving_owner_notifies_both_managers() {
        let scheduler = Scheduler::new(store(), RecordingNotifier::default());
        let period = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        scheduler.update(period.id, input(PeriodOwner::Tribe(2), july())).await.unwrap();

        let sent = scheduler.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].owner, PeriodOwner::Tribe(1));
        assert_eq!(sent[1].action, PeriodAction::Delete);
        assert_eq!(sent[1].manager_id, 11);
        assert_eq!(sent[2].owner, PeriodOwner::Tribe(2));
        assert_eq!(sent[2].action, PeriodAction::Update);
        assert_eq!(sent[2].manager_id, 22);
        drop(sent);

        assert!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_persistence_leaves_no_period_behind() {
        let root = std::env::temp_dir().join(format!("congregate-scheduler-{}-persist", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        // A regular file where the snapshot's directory should be
        let blocker = root.join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = Arc::new(MemoryStore::open(blocker.join("data.json")).unwrap());
        let scheduler = Scheduler::new(Arc::clone(&store), RecordingNotifier::default());

        let err = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Store(_)));
        assert!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap().is_empty());
        assert!(!store.window_exists(PeriodOwner::Tribe(1), july(), None).await.unwrap());
        assert!(scheduler.notifier.sent.lock().unwrap().is_empty());

        std::fs::remove_file(&blocker).unwrap();
        let period = scheduler.create(input(PeriodOwner::Tribe(1), july())).await.unwrap();
        assert_eq!(scheduler.list(PeriodOwner::Tribe(1)).await.unwrap(), vec![period]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
