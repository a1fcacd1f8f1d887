//! Period state resolution
//!
//! The state of a (member, window) pair is never stored. It is recomputed
//! from the window's date range, the presence of a submission record, and
//! the current date, so the member view and the admin view agree whenever
//! they read the same window and record.

use chrono::NaiveDate;

use crate::models::{PeriodState, SubmissionRecord, SubmissionWindow};

/// Resolve the lifecycle state of one (member, window) pair
///
/// Both bounds are inclusive calendar dates: a window ending on the 28th
/// still accepts writes for the whole of the 28th.
pub fn resolve(
    window: &SubmissionWindow,
    record: Option<&SubmissionRecord>,
    today: NaiveDate,
) -> PeriodState {
    resolve_presence(window, record.is_some(), today)
}

/// Same as [`resolve`] when only the presence of a record is known
pub fn resolve_presence(window: &SubmissionWindow, submitted: bool, today: NaiveDate) -> PeriodState {
    if today < window.start_date {
        PeriodState::NotYetOpen
    } else if today > window.end_date {
        if submitted {
            PeriodState::SubmittedLocked
        } else {
            PeriodState::ClosedNeverSubmitted
        }
    } else if submitted {
        PeriodState::SubmittedEditable
    } else {
        PeriodState::SubmittableOpen
    }
}

/// Number of records counted as submitted for a window at `today`
pub fn submitted_count<'a, I>(window: &SubmissionWindow, records: I, today: NaiveDate) -> usize
where
    I: IntoIterator<Item = &'a SubmissionRecord>,
{
    records
        .into_iter()
        .filter(|record| record.key() == window.key())
        .filter(|record| resolve(window, Some(record), today).is_submitted())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliverableType, Semester};
    use chrono::{Duration, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn march_window() -> SubmissionWindow {
        SubmissionWindow {
            year: 2026,
            semester: Semester::First,
            month: 3,
            deliverable_type: DeliverableType::Plan,
            start_date: date(2026, 3, 1),
            end_date: date(2026, 3, 28),
        }
    }

    fn record(member: &str) -> SubmissionRecord {
        SubmissionRecord {
            member_id: member.to_string(),
            year: 2026,
            semester: Semester::First,
            month: 3,
            memo: String::new(),
            primary_artifact_path: Some("p".to_string()),
            document_artifact_path: Some("d".to_string()),
            other_artifact_path: None,
            submitted_at: Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_before_start_is_not_yet_open() {
        let window = march_window();
        let rec = record("a");
        for offset in 1..40 {
            let today = window.start_date - Duration::days(offset);
            assert_eq!(resolve(&window, None, today), PeriodState::NotYetOpen);
            assert_eq!(resolve(&window, Some(&rec), today), PeriodState::NotYetOpen);
        }
    }

    #[test]
    fn test_after_end_is_closed_or_locked() {
        let window = march_window();
        let rec = record("a");
        for offset in 1..40 {
            let today = window.end_date + Duration::days(offset);
            assert_eq!(
                resolve(&window, None, today),
                PeriodState::ClosedNeverSubmitted
            );
            assert_eq!(
                resolve(&window, Some(&rec), today),
                PeriodState::SubmittedLocked
            );
        }
    }

    #[test]
    fn test_inside_window_bounds_inclusive() {
        let window = march_window();
        let rec = record("a");
        for today in [date(2026, 3, 1), date(2026, 3, 15), date(2026, 3, 28)] {
            assert_eq!(resolve(&window, None, today), PeriodState::SubmittableOpen);
            assert_eq!(
                resolve(&window, Some(&rec), today),
                PeriodState::SubmittedEditable
            );
        }
    }

    #[test]
    fn test_march_scenario() {
        let window = march_window();
        let rec = record("a");
        assert_eq!(
            resolve(&window, None, date(2026, 3, 15)),
            PeriodState::SubmittableOpen
        );
        assert_eq!(
            resolve(&window, Some(&rec), date(2026, 3, 15)),
            PeriodState::SubmittedEditable
        );
        assert_eq!(
            resolve(&window, Some(&rec), date(2026, 4, 1)),
            PeriodState::SubmittedLocked
        );
    }

    #[test]
    fn test_submitted_count_ignores_other_windows() {
        let window = march_window();
        let mut april = record("c");
        april.month = 4;
        let records = vec![record("a"), record("b"), april];

        assert_eq!(submitted_count(&window, &records, date(2026, 3, 15)), 2);
        assert_eq!(submitted_count(&window, &records, date(2026, 5, 1)), 2);
        assert_eq!(submitted_count(&window, &records, date(2026, 2, 1)), 0);
    }
}
