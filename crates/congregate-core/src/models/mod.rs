//! Data models for the attendance engine.
//!
//! This module contains the data structures shared by the calendar,
//! aggregation, scoping and scheduling code:
//!
//! - `Member`, `OrgAssignment`: People and their sub-entity assignments
//! - `SubEntity`, `SubEntityKind`, `SubEntityRoster`: Tribes, departments, honor families
//! - `AttendanceSheet`, `AttendanceEntry`, `MonthlyResume`: Raw and derived attendance
//! - `ServicePeriod`, `PeriodOwner`, `DateWindow`: Scheduled service windows

pub mod attendance;
pub mod member;
pub mod organization;
pub mod period;

pub use attendance::{
    AttendanceEntry, AttendanceSheet, MemberAttendanceView, MonthlyResume, OccurrencePresence,
    RegularityStatus, SheetKind, SheetRow,
};
pub use member::{Member, OrgAssignment};
pub use organization::{SubEntity, SubEntityKind, SubEntityRoster};
pub use period::{DateWindow, PeriodAction, PeriodOwner, ServicePeriod, ServicePeriodInput};
