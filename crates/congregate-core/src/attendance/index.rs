use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{AttendanceEntry, DateWindow};

/// Per-member, per-date lookup over raw attendance rows.
///
/// When several rows exist for the same member and date (for example once
/// through a tribe sheet and once through a cross-entity sheet), they are
/// merged into one entry with `has_conflict` set. Each presence flag resolves
/// as "true wins over false, false wins over unrecorded", so any source
/// reporting presence makes the merged entry present. The merged entry keeps
/// the ids of every contributing sheet.
#[derive(Debug, Default)]
pub struct AttendanceIndex {
    by_member: HashMap<i64, BTreeMap<NaiveDate, AttendanceEntry>>,
}

impl AttendanceIndex {
    /// Index the rows for `member_ids` dated inside `window`. Other rows are skipped.
    pub fn build<I>(member_ids: &[i64], window: DateWindow, entries: I) -> Self
    where
        I: IntoIterator<Item = AttendanceEntry>,
    {
        let wanted: HashSet<i64> = member_ids.iter().copied().collect();
        let mut by_member: HashMap<i64, BTreeMap<NaiveDate, AttendanceEntry>> = HashMap::new();
        let mut skipped = 0usize;

        for entry in entries {
            if !wanted.contains(&entry.member_id) || !window.contains(entry.date) {
                skipped += 1;
                continue;
            }
            let dates = by_member.entry(entry.member_id).or_default();
            match dates.get_mut(&entry.date) {
                Some(existing) => merge_into(existing, entry),
                None => {
                    dates.insert(entry.date, entry);
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped attendance rows outside member set or window");
        }

        Self { by_member }
    }

    /// All indexed dates for one member
    pub fn member(&self, member_id: i64) -> Option<&BTreeMap<NaiveDate, AttendanceEntry>> {
        self.by_member.get(&member_id)
    }

    pub fn entry(&self, member_id: i64, date: NaiveDate) -> Option<&AttendanceEntry> {
        self.by_member.get(&member_id).and_then(|dates| dates.get(&date))
    }

    /// Number of indexed (member, date) pairs flagged as conflicting
    pub fn conflict_count(&self) -> usize {
        self.by_member
            .values()
            .flat_map(|dates| dates.values())
            .filter(|e| e.has_conflict)
            .count()
    }

    pub fn member_count(&self) -> usize {
        self.by_member.len()
    }
}

fn merge_into(existing: &mut AttendanceEntry, incoming: AttendanceEntry) {
    debug!(
        member_id = existing.member_id,
        date = %existing.date,
        sheets = ?existing.sheet_ids,
        incoming = ?incoming.sheet_ids,
        "Attendance recorded by more than one sheet"
    );
    existing.present = existing.present || incoming.present;
    existing.service_present = merge_flag(existing.service_present, incoming.service_present);
    existing.meeting_present = merge_flag(existing.meeting_present, incoming.meeting_present);
    existing.has_conflict = true;
    for id in incoming.sheet_ids {
        if !existing.sheet_ids.contains(&id) {
            existing.sheet_ids.push(id);
        }
    }
}

fn merge_flag(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), _) | (_, Some(false)) => Some(false),
        (None, None) => None,
    }
}
