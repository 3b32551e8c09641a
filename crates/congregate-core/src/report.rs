//! The attendance report: scoped members with monthly resumes and
//! regularity for the current and previous month.

use std::sync::Arc;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::attendance::{compute_resume, occurrence_presence, AttendanceIndex, RegularityThresholds};
use crate::calendar::{is_supported, occurrences_in_month, DEFAULT_OCCURRENCE_WEEKDAY};
use crate::models::{DateWindow, MemberAttendanceView, RegularityStatus};
use crate::scope::{Caller, MemberSortColumn, ReportSession, ScopeResolver, StatusFilter};
use crate::store::{AttendanceStore, RosterStore, StoreError};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report window ends before it starts: {0}")]
    InvalidWindow(DateWindow),

    #[error("Report window outside the supported calendar range: {0}")]
    OutOfRange(DateWindow),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parameters of one report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub caller: Caller,
    pub window: DateWindow,
    pub status: StatusFilter,
    pub query: String,
    /// Cumulative row limit, see `ReportSession`
    pub take: usize,
    pub sort_column: MemberSortColumn,
    pub ascending: bool,
}

/// Number of returned members per current-month regularity status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularityBreakdown {
    #[serde(rename = "veryRegular")]
    pub very_regular: usize,
    pub regular: usize,
    #[serde(rename = "mediumRegular")]
    pub medium_regular: usize,
    #[serde(rename = "littleRegular")]
    pub little_regular: usize,
    pub absent: usize,
    /// Members with no recorded occurrence this month
    #[serde(rename = "noData")]
    pub no_data: usize,
}

impl RegularityBreakdown {
    fn record(&mut self, status: Option<RegularityStatus>) {
        match status {
            Some(RegularityStatus::VeryRegular) => self.very_regular += 1,
            Some(RegularityStatus::Regular) => self.regular += 1,
            Some(RegularityStatus::MediumRegular) => self.medium_regular += 1,
            Some(RegularityStatus::LittleRegular) => self.little_regular += 1,
            Some(RegularityStatus::Absent) => self.absent += 1,
            None => self.no_data += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceReport {
    #[serde(rename = "totalMatchingMemberCount")]
    pub total_matching_member_count: usize,
    #[serde(rename = "memberAttendanceViews")]
    pub views: Vec<MemberAttendanceView>,
    #[serde(rename = "regularityBreakdown")]
    pub regularity_breakdown: RegularityBreakdown,
}

/// Calendar and classification policy used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub weekday: Weekday,
    pub thresholds: RegularityThresholds,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            weekday: DEFAULT_OCCURRENCE_WEEKDAY,
            thresholds: RegularityThresholds::default(),
        }
    }
}

pub struct ReportService<S> {
    store: Arc<S>,
    settings: ReportSettings,
}

impl<S> ReportService<S>
where
    S: RosterStore + AttendanceStore,
{
    pub fn new(store: Arc<S>, settings: ReportSettings) -> Self {
        Self { store, settings }
    }

    /// Build the attendance report for one request.
    ///
    /// A caller with no visible scope gets an empty report rather than an
    /// error. `session` carries the cumulative limit across repeated
    /// requests for the same view.
    pub async fn attendance_report(
        &self,
        request: &ReportRequest,
        session: &mut ReportSession,
    ) -> Result<AttendanceReport, ReportError> {
        if !request.window.is_ordered() {
            return Err(ReportError::InvalidWindow(request.window));
        }
        if !(is_supported(request.window.from) && is_supported(request.window.to)) {
            return Err(ReportError::OutOfRange(request.window));
        }

        let resolver = ScopeResolver::new(self.store.as_ref());
        let Some(resolved) = resolver.resolve(request, session).await? else {
            info!(role = %request.caller.role, member_id = request.caller.member_id, "No visible members for report");
            return Ok(AttendanceReport::default());
        };

        let (members, total) = futures::try_join!(
            self.store.find_members(&resolved.members),
            self.store.count_members(&resolved.members),
        )?;

        let member_ids: Vec<i64> = members.iter().map(|m| m.id).collect();
        let entries = self
            .store
            .attendance_entries(&member_ids, resolved.fetch_window)
            .await?;
        let index = AttendanceIndex::build(&member_ids, resolved.fetch_window, entries);

        let current = occurrences_in_month(resolved.current_month, self.settings.weekday);
        let previous = occurrences_in_month(resolved.previous_month, self.settings.weekday);
        debug!(
            members = members.len(),
            total,
            conflicts = index.conflict_count(),
            fetch_window = %resolved.fetch_window,
            "Building attendance views"
        );

        let mut breakdown = RegularityBreakdown::default();
        let views: Vec<MemberAttendanceView> = members
            .into_iter()
            .map(|member| {
                let dates = index.member(member.id);
                let previous_resume = compute_resume(dates, &previous);
                let current_resume = compute_resume(dates, &current);
                let current_regularity = self.settings.thresholds.classify(current_resume.as_ref());
                breakdown.record(current_regularity);

                MemberAttendanceView {
                    previous_regularity: self.settings.thresholds.classify(previous_resume.as_ref()),
                    current_regularity,
                    previous_resume,
                    current_resume,
                    occurrences: occurrence_presence(dates, &current),
                    member,
                }
            })
            .collect();

        info!(returned = views.len(), total, "Attendance report built");
        Ok(AttendanceReport {
            total_matching_member_count: total,
            views,
            regularity_breakdown: breakdown,
        })
    }
}
