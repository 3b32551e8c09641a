//! Messaging collaborator for service-period changes.
//!
//! The scheduler tells a sub-entity's manager whenever one of its service
//! periods is created, updated or deleted. Delivery is best-effort: the
//! scheduler logs a failed delivery and carries on.
//!
//! - `LogNotifier`: records notices through `tracing` only
//! - `WebhookNotifier`: POSTs each notice as JSON to a configured URL

pub mod error;
pub mod webhook;

use serde::Serialize;
use tracing::info;

use crate::models::{DateWindow, PeriodAction, PeriodOwner};
use crate::scope::Role;

pub use error::NotifyError;
pub use webhook::WebhookNotifier;

/// What a manager is told about a service-period change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodNotice {
    pub owner: PeriodOwner,
    #[serde(rename = "managerId")]
    pub manager_id: i64,
    #[serde(rename = "managerRole")]
    pub manager_role: Role,
    pub window: DateWindow,
    pub action: PeriodAction,
}

impl PeriodNotice {
    pub fn summary(&self) -> String {
        format!(
            "Service period {} for {}: {}",
            self.action, self.owner, self.window
        )
    }
}

#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify_manager(&self, notice: &PeriodNotice) -> Result<(), NotifyError>;
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify_manager(&self, notice: &PeriodNotice) -> Result<(), NotifyError> {
        info!(
            manager_id = notice.manager_id,
            role = %notice.manager_role,
            action = %notice.action,
            window = %notice.window,
            "{}",
            notice.summary()
        );
        Ok(())
    }
}

/// Either configured notifier, chosen at startup.
pub enum AnyNotifier {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl Notifier for AnyNotifier {
    async fn notify_manager(&self, notice: &PeriodNotice) -> Result<(), NotifyError> {
        match self {
            AnyNotifier::Log(n) => n.notify_manager(notice).await,
            AnyNotifier::Webhook(n) => n.notify_manager(notice).await,
        }
    }
}
