//! Fixed-offset recurrence expansion for events.
//!
//! An event carries a [`RecurrenceRule`] and three timestamps (start, end,
//! and a nullable next-occurrence anchor). Advancing an occurrence applies
//! the rule's calendar offset uniformly to all three, so their relative
//! ordering is preserved. Expansion over a query window walks the series
//! lazily and is bounded by a hard candidate cap.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use mingle_db::db::enums::RecurrenceRule;
use mingle_db::model::event::Event;

/// Hard ceiling on generated candidates per window expansion.
const MAX_OCCURRENCES: usize = 10_000;

/// One concrete time-boxed instance of an event, possibly one of a
/// recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub next_occurrence: Option<DateTime<Utc>>,
}

impl From<&Event> for Occurrence {
    fn from(event: &Event) -> Self {
        Self {
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            next_occurrence: event.next_occurrence,
        }
    }
}

/// ## Summary
/// Computes the next instance of an occurrence under the given rule.
///
/// Returns `None` when the rule is `none`: a non-recurring event has no
/// further occurrences. Otherwise every timestamp of the occurrence is
/// shifted by the same offset, so `starts_at <= ends_at` carries over.
#[must_use]
pub fn next_occurrence(rule: RecurrenceRule, occurrence: &Occurrence) -> Option<Occurrence> {
    match rule {
        RecurrenceRule::None => None,
        RecurrenceRule::Daily
        | RecurrenceRule::Weekly
        | RecurrenceRule::Monthly
        | RecurrenceRule::Yearly => Some(Occurrence {
            starts_at: shift_date(rule, occurrence.starts_at),
            ends_at: shift_date(rule, occurrence.ends_at),
            next_occurrence: occurrence.next_occurrence.map(|dt| shift_date(rule, dt)),
        }),
    }
}

/// ## Summary
/// Lazily enumerates the instances of a series that overlap the closed
/// window `[range_start, range_end]`.
///
/// Candidates are produced in non-decreasing start order, starting from the
/// event's own occurrence, while their start is within the window's end; a
/// candidate is yielded when its end reaches back into the window. The
/// series is cut off after a fixed candidate budget so a pathological window
/// can never loop the expansion unboundedly.
#[must_use]
pub fn occurrences_in_range(
    rule: RecurrenceRule,
    base: Occurrence,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> impl Iterator<Item = Occurrence> {
    std::iter::successors(Some(base), move |current| next_occurrence(rule, current))
        .take(MAX_OCCURRENCES)
        .take_while(move |occurrence| occurrence.starts_at <= range_end)
        .filter(move |occurrence| occurrence.ends_at >= range_start)
}

/// ## Summary
/// Finds the first instance of a series starting strictly after `after`.
///
/// Returns `None` for exhausted series: a non-recurring event that already
/// started, or a series whose candidate budget runs out first.
#[must_use]
pub fn first_after(
    rule: RecurrenceRule,
    base: Occurrence,
    after: DateTime<Utc>,
) -> Option<Occurrence> {
    std::iter::successors(Some(base), move |current| next_occurrence(rule, current))
        .take(MAX_OCCURRENCES)
        .find(|occurrence| occurrence.starts_at > after)
}

fn shift_date(rule: RecurrenceRule, dt: DateTime<Utc>) -> DateTime<Utc> {
    match rule {
        RecurrenceRule::None => dt,
        RecurrenceRule::Daily => dt.checked_add_signed(Duration::days(1)).unwrap_or(dt),
        RecurrenceRule::Weekly => dt.checked_add_signed(Duration::days(7)).unwrap_or(dt),
        RecurrenceRule::Monthly => add_months(dt, 1),
        RecurrenceRule::Yearly => add_months(dt, 12),
    }
}

/// Advances a timestamp by whole months, clamping the day-of-month against
/// the target month's length (Jan 31 + 1 month = Feb 28/29). Runs through
/// December into the next year.
fn add_months(dt: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total_months = dt.month0() + months;
    let year_delta = i32::try_from(total_months / 12).unwrap_or(0);
    let new_year = dt.year() + year_delta;
    let new_month = (total_months % 12) + 1;

    let max_day = days_in_month(new_year, new_month);
    let new_day = dt.day().min(max_day);

    NaiveDate::from_ymd_opt(new_year, new_month, new_day)
        .and_then(|date| {
            date.and_hms_nano_opt(dt.hour(), dt.minute(), dt.second(), dt.nanosecond())
        })
        .map_or(dt, |naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month + 1, 1)
        .or_else(|| NaiveDate::from_ymd_opt(year + 1, 1, 1))
        .map_or(31, |d| d.pred_opt().map_or(31, |p| p.day()))
}
