//! Role scoping and member filtering for attendance reports.
//!
//! This is the only place that maps a caller's role to the members they may
//! see. It also turns the new/existing status filter and the requested
//! window into a creation-date predicate, and keeps cumulative pagination
//! state per report view.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::{end_of_day, month_bounds, previous_month, start_of_day};
use crate::models::{DateWindow, Member, OrgAssignment, SubEntityKind};
use crate::report::ReportRequest;
use crate::store::{RosterStore, StoreError};
use crate::utils::cmp_ignore_case;

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Administrator,
    TribeManager,
    DepartmentManager,
    HonorFamilyManager,
    /// Any role without a reporting scope.
    Member,
}

impl Role {
    /// Parse a role tag. Unknown tags map to `Role::Member`, which sees nothing.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "ADMIN" | "ADMINISTRATOR" => Role::Administrator,
            "TRIBE_MANAGER" => Role::TribeManager,
            "DEPARTMENT_MANAGER" => Role::DepartmentManager,
            "HONOR_FAMILY_MANAGER" => Role::HonorFamilyManager,
            _ => Role::Member,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Role::Administrator => "ADMINISTRATOR",
            Role::TribeManager => "TRIBE_MANAGER",
            Role::DepartmentManager => "DEPARTMENT_MANAGER",
            Role::HonorFamilyManager => "HONOR_FAMILY_MANAGER",
            Role::Member => "MEMBER",
        }
    }

    /// The sub-entity kind a manager role is scoped to
    pub fn managed_kind(&self) -> Option<SubEntityKind> {
        match self {
            Role::TribeManager => Some(SubEntityKind::Tribe),
            Role::DepartmentManager => Some(SubEntityKind::Department),
            Role::HonorFamilyManager => Some(SubEntityKind::HonorFamily),
            Role::Administrator | Role::Member => None,
        }
    }

    pub fn manager_of(kind: SubEntityKind) -> Self {
        match kind {
            SubEntityKind::Tribe => Role::TribeManager,
            SubEntityKind::Department => Role::DepartmentManager,
            SubEntityKind::HonorFamily => Role::HonorFamilyManager,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Who is asking for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub member_id: i64,
    pub role: Role,
    pub assignment: OrgAssignment,
}

/// Members visible to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberScope {
    /// Every member of the church
    Church,
    /// Members of one sub-entity
    Roster(HashSet<i64>),
    Nothing,
}

impl MemberScope {
    pub fn includes(&self, member_id: i64) -> bool {
        match self {
            MemberScope::Church => true,
            MemberScope::Roster(ids) => ids.contains(&member_id),
            MemberScope::Nothing => false,
        }
    }
}

// ============================================================================
// Status filter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFilter {
    /// Anyone who existed by the end of the window
    #[default]
    All,
    /// Members created inside the window
    New,
    /// Members who existed before the window began
    Old,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(StatusFilter::All),
            "NEW" => Ok(StatusFilter::New),
            "OLD" => Ok(StatusFilter::Old),
            other => Err(format!("unknown status filter: {}", other)),
        }
    }
}

/// Inclusive bounds on a member's creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedRange {
    pub from: Option<DateTime<Utc>>,
    pub to: DateTime<Utc>,
}

impl CreatedRange {
    pub fn contains(&self, created_at: DateTime<Utc>) -> bool {
        self.from.map(|from| created_at >= from).unwrap_or(true) && created_at <= self.to
    }
}

impl StatusFilter {
    /// Resolve against a window at day granularity
    pub fn created_range(&self, window: DateWindow) -> CreatedRange {
        match self {
            StatusFilter::All => CreatedRange {
                from: None,
                to: end_of_day(window.to),
            },
            StatusFilter::New => CreatedRange {
                from: Some(start_of_day(window.from)),
                to: end_of_day(window.to),
            },
            StatusFilter::Old => CreatedRange {
                from: None,
                to: start_of_day(window.from),
            },
        }
    }
}

// ============================================================================
// Member query
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemberSortColumn {
    #[default]
    Name,
    Created,
}

/// Everything the store needs to select and order members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberQuery {
    pub scope: MemberScope,
    pub created: CreatedRange,
    /// Trimmed free-text query; empty matches everyone
    pub query: String,
    pub sort_column: MemberSortColumn,
    pub ascending: bool,
    pub limit: usize,
}

impl MemberQuery {
    /// Predicate applied to each member, ignoring the limit
    pub fn matches(&self, member: &Member) -> bool {
        self.scope.includes(member.id)
            && self.created.contains(member.created_at)
            && member.matches_query(&self.query)
    }

    pub fn compare(&self, a: &Member, b: &Member) -> std::cmp::Ordering {
        let cmp = match self.sort_column {
            MemberSortColumn::Name => cmp_ignore_case(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)),
            MemberSortColumn::Created => a
                .created_at
                .cmp(&b.created_at)
                .then_with(|| cmp_ignore_case(&a.name, &b.name)),
        };
        if self.ascending {
            cmp
        } else {
            cmp.reverse()
        }
    }
}

// ============================================================================
// Cumulative pagination
// ============================================================================

/// Identity of a report view: every request field except `take`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    caller: Caller,
    window: DateWindow,
    status: StatusFilter,
    query: String,
    sort_column: MemberSortColumn,
    ascending: bool,
}

impl ViewKey {
    fn of(request: &ReportRequest) -> Self {
        Self {
            caller: request.caller,
            window: request.window,
            status: request.status,
            query: request.query.trim().to_string(),
            sort_column: request.sort_column,
            ascending: request.ascending,
        }
    }
}

/// Pagination state for repeated requests of the same view.
///
/// Within one view the limit only grows; asking again with a smaller `take`
/// keeps the larger limit. Changing any other request field starts a new view.
#[derive(Debug, Default)]
pub struct ReportSession {
    view: Option<ViewKey>,
    take: usize,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit_for(&mut self, request: &ReportRequest) -> usize {
        let key = ViewKey::of(request);
        if self.view.as_ref() == Some(&key) {
            self.take = self.take.max(request.take);
        } else {
            debug!(take = request.take, "Starting new report view");
            self.view = Some(key);
            self.take = request.take;
        }
        self.take
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Concrete query contract for one report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReport {
    pub members: MemberQuery,
    /// A date inside the current month
    pub current_month: NaiveDate,
    /// A date inside the previous month
    pub previous_month: NaiveDate,
    /// Range attendance rows are fetched for
    pub fetch_window: DateWindow,
}

pub struct ScopeResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: RosterStore> ScopeResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Members the caller may see. Fails closed: unknown roles, missing
    /// assignments and callers who do not run the sub-entity see nothing.
    pub async fn visible_scope(&self, caller: &Caller) -> Result<MemberScope, StoreError> {
        if caller.role == Role::Administrator {
            return Ok(MemberScope::Church);
        }

        let Some(kind) = caller.role.managed_kind() else {
            debug!(role = %caller.role, "Role has no reporting scope");
            return Ok(MemberScope::Nothing);
        };

        let Some(entity_id) = caller.assignment.id_for(kind) else {
            warn!(member_id = caller.member_id, role = %caller.role, "Manager has no {} assignment", kind);
            return Ok(MemberScope::Nothing);
        };

        let Some(roster) = self.store.sub_entity_roster(kind, entity_id).await? else {
            warn!(entity_id, %kind, "Assigned sub-entity not found");
            return Ok(MemberScope::Nothing);
        };

        if !roster.entity.is_managed_by(caller.member_id) {
            warn!(
                member_id = caller.member_id,
                entity_id,
                %kind,
                "Caller does not manage their assigned sub-entity"
            );
            return Ok(MemberScope::Nothing);
        }

        Ok(MemberScope::Roster(roster.member_ids.into_iter().collect()))
    }

    /// Resolve a request. Returns None when the caller can see nobody.
    pub async fn resolve(
        &self,
        request: &ReportRequest,
        session: &mut ReportSession,
    ) -> Result<Option<ResolvedReport>, StoreError> {
        let scope = self.visible_scope(&request.caller).await?;
        if scope == MemberScope::Nothing {
            return Ok(None);
        }

        let limit = session.limit_for(request);
        let members = MemberQuery {
            scope,
            created: request.status.created_range(request.window),
            query: request.query.trim().to_string(),
            sort_column: request.sort_column,
            ascending: request.ascending,
            limit,
        };

        let current_month = request.window.to;
        let previous = previous_month(current_month);
        let current_bounds = month_bounds(current_month);
        let fetch_window = DateWindow::new(
            request.window.from.min(previous),
            request.window.to.max(current_bounds.to),
        );

        Ok(Some(ResolvedReport {
            members,
            current_month,
            previous_month: previous,
            fetch_window,
        }))
    }
}
