//! Submission window registry
//!
//! Windows are replaced a year at a time. A year that was never saved reads
//! back as the default schedule, indistinguishable from one saved with the
//! same values; nothing is persisted until an explicit save.

use chrono::NaiveDate;
use devsign_common::models::CANONICAL_MONTHS;
use devsign_common::{DeliverableType, Error, Result, Semester, SubmissionWindow, WindowKey};
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Number of windows in a complete year
pub const WINDOWS_PER_YEAR: usize = CANONICAL_MONTHS.len();

/// Windows for a year in calendar order, defaults filling unsaved months
pub async fn get_windows(pool: &SqlitePool, year: i32) -> Result<Vec<SubmissionWindow>> {
    let rows = sqlx::query(
        r#"
        SELECT year, semester, month, deliverable_type, start_date, end_date
        FROM submission_windows
        WHERE year = ?
        ORDER BY month ASC
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    let mut saved: HashMap<u32, SubmissionWindow> = HashMap::with_capacity(rows.len());
    for row in rows {
        let window = window_from_row(&row)?;
        saved.insert(window.month, window);
    }

    SubmissionWindow::default_schedule(year)?
        .into_iter()
        .map(|default| Ok(saved.remove(&default.month).unwrap_or(default)))
        .collect()
}

/// Single window by identity, default when unsaved
pub async fn get_window(pool: &SqlitePool, key: WindowKey) -> Result<SubmissionWindow> {
    let row = sqlx::query(
        r#"
        SELECT year, semester, month, deliverable_type, start_date, end_date
        FROM submission_windows
        WHERE year = ? AND semester = ? AND month = ?
        "#,
    )
    .bind(key.year)
    .bind(key.semester.number() as i64)
    .bind(key.month as i64)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => window_from_row(&row),
        None => SubmissionWindow::default_for(key),
    }
}

/// Replace every window of `year` in one transaction
///
/// Validation runs before anything is written, so a rejected set leaves the
/// previously saved windows untouched.
pub async fn save_windows(
    pool: &SqlitePool,
    year: i32,
    windows: &[SubmissionWindow],
) -> Result<()> {
    validate_window_set(year, windows)?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM submission_windows WHERE year = ?")
        .bind(year)
        .execute(&mut *tx)
        .await?;

    for window in windows {
        sqlx::query(
            r#"
            INSERT INTO submission_windows (
                year, semester, month, deliverable_type, start_date, end_date, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(window.year)
        .bind(window.semester.number() as i64)
        .bind(window.month as i64)
        .bind(window.deliverable_type.as_str())
        .bind(window.start_date.to_string())
        .bind(window.end_date.to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!("Saved {} submission windows for {}", windows.len(), year);
    Ok(())
}

/// Check that `windows` is a complete, consistent schedule for `year`
pub fn validate_window_set(year: i32, windows: &[SubmissionWindow]) -> Result<()> {
    if windows.len() != WINDOWS_PER_YEAR {
        return Err(Error::Validation(format!(
            "expected {} windows for {}, got {}",
            WINDOWS_PER_YEAR,
            year,
            windows.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for window in windows {
        if window.year != year {
            return Err(Error::Validation(format!(
                "window for {} month {} submitted under year {}",
                window.year, window.month, year
            )));
        }

        if Semester::of_month(window.month) != Some(window.semester) {
            return Err(Error::Validation(format!(
                "month {} is not a canonical month of semester {}",
                window.month, window.semester
            )));
        }

        if window.start_date > window.end_date {
            return Err(Error::Validation(format!(
                "window {} starts {} after it ends {}",
                window.key(),
                window.start_date,
                window.end_date
            )));
        }

        if !seen.insert((window.semester, window.month)) {
            return Err(Error::Validation(format!(
                "duplicate window for semester {} month {}",
                window.semester, window.month
            )));
        }
    }

    let months: BTreeSet<u32> = seen.iter().map(|(_, month)| *month).collect();
    let canonical: BTreeSet<u32> = CANONICAL_MONTHS.into_iter().collect();
    if months != canonical {
        return Err(Error::Validation(format!(
            "windows must cover months {:?}",
            CANONICAL_MONTHS
        )));
    }

    Ok(())
}

fn window_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SubmissionWindow> {
    let semester: i64 = row.get("semester");
    let month: i64 = row.get("month");
    let deliverable_type: String = row.get("deliverable_type");
    let start_date: String = row.get("start_date");
    let end_date: String = row.get("end_date");

    Ok(SubmissionWindow {
        year: row.get("year"),
        semester: semester_from_db(semester)?,
        month: month as u32,
        deliverable_type: DeliverableType::parse(&deliverable_type)?,
        start_date: parse_date(&start_date)?,
        end_date: parse_date(&end_date)?,
    })
}

pub(crate) fn semester_from_db(value: i64) -> Result<Semester> {
    u8::try_from(value)
        .map_err(|_| Error::Internal(format!("stored semester out of range: {}", value)))
        .and_then(Semester::try_from)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| Error::Internal(format!("stored date '{}' unreadable: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsign_common::db::init::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn custom_schedule() -> Vec<SubmissionWindow> {
        SubmissionWindow::default_schedule(2026)
            .unwrap()
            .into_iter()
            .map(|mut w| {
                w.start_date = date(w.month, 5);
                w.end_date = date(w.month, 20);
                w
            })
            .collect()
    }

    #[tokio::test]
    async fn test_unconfigured_year_reads_default_schedule() {
        let pool = setup_pool().await;

        let windows = get_windows(&pool, 2026).await.unwrap();
        assert_eq!(windows, SubmissionWindow::default_schedule(2026).unwrap());

        // Reading defaults never persists them
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submission_windows")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn test_save_then_read_back() {
        let pool = setup_pool().await;
        let schedule = custom_schedule();

        save_windows(&pool, 2026, &schedule).await.unwrap();

        assert_eq!(get_windows(&pool, 2026).await.unwrap(), schedule);
        let april = get_window(&pool, WindowKey::parse(2026, 1, 4).unwrap())
            .await
            .unwrap();
        assert_eq!(april.start_date, date(4, 5));
        assert_eq!(april.end_date, date(4, 20));
    }

    #[tokio::test]
    async fn test_save_replaces_whole_year() {
        let pool = setup_pool().await;
        save_windows(&pool, 2026, &custom_schedule()).await.unwrap();

        let defaults = SubmissionWindow::default_schedule(2026).unwrap();
        save_windows(&pool, 2026, &defaults).await.unwrap();

        assert_eq!(get_windows(&pool, 2026).await.unwrap(), defaults);
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submission_windows")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 8);
    }

    #[tokio::test]
    async fn test_duplicate_entry_rejected_and_prior_year_kept() {
        let pool = setup_pool().await;
        let saved = custom_schedule();
        save_windows(&pool, 2026, &saved).await.unwrap();

        let mut bad = SubmissionWindow::default_schedule(2026).unwrap();
        bad[1] = bad[0].clone(); // March twice, April missing

        let err = save_windows(&pool, 2026, &bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("duplicate")));
        assert_eq!(get_windows(&pool, 2026).await.unwrap(), saved);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut windows = SubmissionWindow::default_schedule(2026).unwrap();
        windows[2].start_date = date(5, 28);
        windows[2].end_date = date(5, 1);
        assert!(matches!(
            validate_window_set(2026, &windows),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_wrong_count_rejected() {
        let mut windows = SubmissionWindow::default_schedule(2026).unwrap();
        windows.pop();
        assert!(matches!(
            validate_window_set(2026, &windows),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_non_canonical_month_rejected() {
        let mut windows = SubmissionWindow::default_schedule(2026).unwrap();
        windows[3].month = 7;
        assert!(matches!(
            validate_window_set(2026, &windows),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_semester_mismatch_rejected() {
        let mut windows = SubmissionWindow::default_schedule(2026).unwrap();
        windows[0].semester = Semester::Second;
        assert!(matches!(
            validate_window_set(2026, &windows),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_year_mismatch_rejected() {
        let windows = SubmissionWindow::default_schedule(2025).unwrap();
        assert!(matches!(
            validate_window_set(2026, &windows),
            Err(Error::Validation(_))
        ));
    }
}
