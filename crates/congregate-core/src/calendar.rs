//! Calendar arithmetic for weekly occurrences.
//!
//! Weeks start on Monday and the weekly gathering is the seventh day of the
//! week (Sunday) unless the configuration says otherwise. Every function
//! takes its reference date explicitly; nothing here reads the clock.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::models::DateWindow;

/// Default weekly occurrence: the 7th day of a Monday-start week.
pub const DEFAULT_OCCURRENCE_WEEKDAY: Weekday = Weekday::Sun;

/// First day of the anchor's month
pub fn first_of_month(anchor: NaiveDate) -> NaiveDate {
    anchor - Days::new(anchor.day0() as u64)
}

/// The anchor's month as an inclusive window
pub fn month_bounds(anchor: NaiveDate) -> DateWindow {
    let first = first_of_month(anchor);
    let last = first + Months::new(1) - Days::new(1);
    DateWindow::new(first, last)
}

/// First day of the month before the anchor's month
pub fn previous_month(anchor: NaiveDate) -> NaiveDate {
    first_of_month(anchor) - Months::new(1)
}

/// Ordered dates inside the anchor's month falling on `weekday`.
/// Always 4 or 5 dates.
pub fn occurrences_in_month(anchor: NaiveDate, weekday: Weekday) -> Vec<NaiveDate> {
    let bounds = month_bounds(anchor);
    let offset = (7 + weekday.num_days_from_monday() - bounds.from.weekday().num_days_from_monday()) % 7;

    let mut dates = Vec::with_capacity(5);
    let mut date = bounds.from + Days::new(offset as u64);
    while date <= bounds.to {
        dates.push(date);
        date = date + Days::new(7);
    }
    dates
}

/// Whether month and day arithmetic around `date` stays inside chrono's
/// date range. The other functions here assume it does.
pub fn is_supported(date: NaiveDate) -> bool {
    let first = first_of_month(date);
    first.checked_sub_months(Months::new(1)).is_some()
        && first.checked_add_months(Months::new(1)).is_some()
        && start_of_day(date).checked_add_signed(Duration::days(1)).is_some()
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Last representable instant of the day
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::nanoseconds(1)
}
