use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{AttendanceEntry, MonthlyResume, OccurrencePresence};

/// Compute a member's resume over one set of occurrence dates.
///
/// Occurrences without an entry have not been recorded yet and are left out
/// of the denominator. Returns None when no occurrence has an entry, which is
/// distinct from a resume with zero attendance.
pub fn compute_resume(
    entries: Option<&BTreeMap<NaiveDate, AttendanceEntry>>,
    occurrences: &[NaiveDate],
) -> Option<MonthlyResume> {
    let entries = entries?;

    let mut attendance = 0u32;
    let mut service = 0u32;
    let mut recorded = 0u32;

    for entry in occurrences.iter().filter_map(|date| entries.get(date)) {
        recorded += 1;
        if entry.present {
            attendance += 1;
        }
        if entry.service_present == Some(true) {
            service += 1;
        }
    }

    MonthlyResume::new(attendance, service, recorded)
}

/// Per-occurrence presence values in occurrence order
pub fn occurrence_presence(
    entries: Option<&BTreeMap<NaiveDate, AttendanceEntry>>,
    occurrences: &[NaiveDate],
) -> Vec<OccurrencePresence> {
    occurrences
        .iter()
        .map(|&date| match entries.and_then(|e| e.get(&date)) {
            Some(entry) => OccurrencePresence {
                date,
                present: Some(entry.present),
                service_present: entry.service_present,
                has_conflict: entry.has_conflict,
            },
            None => OccurrencePresence {
                date,
                present: None,
                service_present: None,
                has_conflict: false,
            },
        })
        .collect()
}
