//! Congregate core library.
//!
//! Attendance and service-period engine for a church organized into tribes,
//! departments and honor families:
//!
//! - `calendar`: weekly occurrence dates inside a month
//! - `attendance`: conflict-aware indexing, monthly resumes, regularity
//! - `scope`: role-based visibility, new/old member filters, pagination
//! - `report`: the attendance report built from the pieces above
//! - `scheduler`: service periods with duplicate-window validation
//! - `store` and `notify`: persistence and messaging collaborators

pub mod attendance;
pub mod calendar;
pub mod config;
pub mod models;
pub mod notify;
pub mod report;
pub mod scheduler;
pub mod scope;
pub mod store;
pub mod utils;

pub use config::Config;
pub use report::{AttendanceReport, ReportRequest, ReportService, ReportSettings};
pub use scheduler::{PeriodField, ScheduleError, Scheduler};
pub use scope::{Caller, ReportSession, Role, StatusFilter};
