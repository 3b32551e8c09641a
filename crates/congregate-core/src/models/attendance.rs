use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DateWindow, Member};

/// Which kind of source report an attendance sheet is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetKind {
    /// A sub-entity's own main-gathering report.
    Gathering,
    /// Attendance recorded for members of other sub-entities.
    /// Only read when its whole span falls inside the requested window.
    CrossEntity,
}

/// One raw row inside an attendance sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    #[serde(rename = "memberId")]
    pub member_id: i64,
    pub date: NaiveDate,
    pub present: bool,
    #[serde(rename = "servicePresent", default)]
    pub service_present: Option<bool>,
    #[serde(rename = "meetingPresent", default)]
    pub meeting_present: Option<bool>,
}

impl SheetRow {
    /// Convert to an AttendanceEntry tagged with its source sheet
    pub fn to_entry(&self, sheet_id: i64) -> AttendanceEntry {
        AttendanceEntry {
            member_id: self.member_id,
            date: self.date,
            present: self.present,
            service_present: self.service_present,
            meeting_present: self.meeting_present,
            has_conflict: false,
            sheet_ids: vec![sheet_id],
        }
    }
}

/// One source report of attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSheet {
    pub id: i64,
    pub kind: SheetKind,
    pub span: DateWindow,
    #[serde(default)]
    pub rows: Vec<SheetRow>,
}

/// A presence observation for one member on one date.
///
/// Rows coming from the store carry a single sheet id. Entries produced by
/// the indexer may merge several rows, in which case `sheet_ids` lists every
/// contributing sheet and `has_conflict` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(rename = "memberId")]
    pub member_id: i64,
    pub date: NaiveDate,
    pub present: bool,
    #[serde(rename = "servicePresent")]
    pub service_present: Option<bool>,
    #[serde(rename = "meetingPresent")]
    pub meeting_present: Option<bool>,
    #[serde(rename = "hasConflict", default)]
    pub has_conflict: bool,
    #[serde(rename = "sheetIds", default)]
    pub sheet_ids: Vec<i64>,
}

/// Present/total counts for one member over one month.
///
/// `occurrence_count` counts only occurrences with a recorded entry, and is
/// never zero: a month without data has no resume at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyResume {
    #[serde(rename = "attendanceCount")]
    pub attendance_count: u32,
    #[serde(rename = "serviceAttendanceCount")]
    pub service_attendance_count: u32,
    #[serde(rename = "occurrenceCount")]
    pub occurrence_count: u32,
}

impl MonthlyResume {
    /// Returns None when no occurrence was recorded.
    pub fn new(attendance_count: u32, service_attendance_count: u32, occurrence_count: u32) -> Option<Self> {
        if occurrence_count == 0 {
            return None;
        }
        Some(Self {
            attendance_count,
            service_attendance_count,
            occurrence_count,
        })
    }

    pub fn display(&self) -> String {
        format!("{}/{}", self.attendance_count, self.occurrence_count)
    }
}

/// Regularity classification, ordered from lowest to highest rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegularityStatus {
    Absent = 0,
    LittleRegular = 1,
    MediumRegular = 2,
    Regular = 3,
    VeryRegular = 4,
}

impl RegularityStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            RegularityStatus::Absent => "Absent",
            RegularityStatus::LittleRegular => "Little regular",
            RegularityStatus::MediumRegular => "Medium regular",
            RegularityStatus::Regular => "Regular",
            RegularityStatus::VeryRegular => "Very regular",
        }
    }
}

/// Presence for one occurrence date of the current month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrencePresence {
    pub date: NaiveDate,
    /// None when nothing was recorded for this date yet.
    pub present: Option<bool>,
    #[serde(rename = "servicePresent")]
    pub service_present: Option<bool>,
    #[serde(rename = "hasConflict")]
    pub has_conflict: bool,
}

/// The report's output unit for one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAttendanceView {
    pub member: Member,
    #[serde(rename = "previousResume")]
    pub previous_resume: Option<MonthlyResume>,
    #[serde(rename = "currentResume")]
    pub current_resume: Option<MonthlyResume>,
    #[serde(rename = "previousRegularity")]
    pub previous_regularity: Option<RegularityStatus>,
    #[serde(rename = "currentRegularity")]
    pub current_regularity: Option<RegularityStatus>,
    pub occurrences: Vec<OccurrencePresence>,
}
