//! Attendance aggregation pipeline.
//!
//! Raw rows from one or more attendance sheets go through three steps:
//!
//! - `AttendanceIndex`: per-member, per-date lookup with conflict merging
//! - `compute_resume`: monthly present/total counts over an occurrence set
//! - `RegularityThresholds::classify`: resume ratio to regularity status

pub mod index;
pub mod regularity;
pub mod resume;

pub use index::AttendanceIndex;
pub use regularity::RegularityThresholds;
pub use resume::{compute_resume, occurrence_presence};
