//! Submission record store
//!
//! One record per (member, year, semester, month). Writes merge into the
//! stored record: the memo is replaced, slots are replaced only when the
//! patch supplies them. The merge happens inside a single conditional
//! UPSERT so concurrent writers never blank out a slot another writer set.

use chrono::{DateTime, NaiveDate, Utc};
use devsign_common::period;
use devsign_common::{
    ArtifactSlot, Clock, Error, PeriodState, Result, Semester, SubmissionPatch, SubmissionRecord,
    SubmissionWindow, WindowKey,
};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

use super::windows::{self, semester_from_db};

const SELECT_COLUMNS: &str = r#"
    SELECT member_id, year, semester, month, memo,
           primary_path, document_path, other_path, submitted_at
    FROM submissions
"#;

/// Records of one member for one semester, ordered by month
///
/// Months without a record are simply absent.
pub async fn list_for_member(
    pool: &SqlitePool,
    member_id: &str,
    year: i32,
    semester: Semester,
) -> Result<Vec<SubmissionRecord>> {
    let sql = format!(
        "{} WHERE member_id = ? AND year = ? AND semester = ? ORDER BY month ASC",
        SELECT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(member_id)
        .bind(year)
        .bind(semester.number() as i64)
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// Records of every member for one window, most recent first
pub async fn list_for_window(pool: &SqlitePool, key: WindowKey) -> Result<Vec<SubmissionRecord>> {
    let sql = format!(
        "{} WHERE year = ? AND semester = ? AND month = ? ORDER BY submitted_at DESC, member_id ASC",
        SELECT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(key.year)
        .bind(key.semester.number() as i64)
        .bind(key.month as i64)
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// Record for one identity
pub async fn find(
    pool: &SqlitePool,
    member_id: &str,
    key: WindowKey,
) -> Result<Option<SubmissionRecord>> {
    let sql = format!(
        "{} WHERE member_id = ? AND year = ? AND semester = ? AND month = ?",
        SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(member_id)
        .bind(key.year)
        .bind(key.semester.number() as i64)
        .bind(key.month as i64)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Gate a write against the window state and the first-submit slot rule
///
/// Returns the state the write was admitted in.
pub fn admit(
    window: &SubmissionWindow,
    existing: Option<&SubmissionRecord>,
    supplied: &[ArtifactSlot],
    today: NaiveDate,
) -> Result<PeriodState> {
    let state = period::resolve(window, existing, today);
    if !state.is_writable() {
        return Err(Error::NotSubmittable {
            window: window.key().to_string(),
            state,
        });
    }

    if existing.is_none() {
        let missing: Vec<ArtifactSlot> = ArtifactSlot::MANDATORY_ON_FIRST_SUBMIT
            .into_iter()
            .filter(|slot| !supplied.contains(slot))
            .collect();
        if !missing.is_empty() {
            return Err(Error::IncompleteSubmission { missing });
        }
    }

    Ok(state)
}

/// Merge `patch` into the record for (member, window)
///
/// Fails with `NotSubmittable` outside the window and with
/// `IncompleteSubmission` when a first submission lacks a mandatory slot.
pub async fn upsert(
    pool: &SqlitePool,
    member_id: &str,
    key: WindowKey,
    patch: &SubmissionPatch,
    clock: &dyn Clock,
) -> Result<SubmissionRecord> {
    let window = windows::get_window(pool, key).await?;
    let existing = find(pool, member_id, key).await?;
    let supplied = patch.supplied_slots();

    let state = match admit(&window, existing.as_ref(), &supplied, clock.today()) {
        Ok(state) => state,
        Err(e) => {
            warn!("Rejected submission from {} for {}: {}", member_id, key, e);
            return Err(e);
        }
    };

    // Records are never deleted, so an identity seen above stays present and
    // the slot rule checked against it still holds when the UPSERT runs.
    sqlx::query(
        r#"
        INSERT INTO submissions (
            member_id, year, semester, month, memo,
            primary_path, document_path, other_path, submitted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(member_id, year, semester, month) DO UPDATE SET
            memo = excluded.memo,
            primary_path = COALESCE(excluded.primary_path, submissions.primary_path),
            document_path = COALESCE(excluded.document_path, submissions.document_path),
            other_path = COALESCE(excluded.other_path, submissions.other_path),
            submitted_at = excluded.submitted_at
        "#,
    )
    .bind(member_id)
    .bind(key.year)
    .bind(key.semester.number() as i64)
    .bind(key.month as i64)
    .bind(&patch.memo)
    .bind(patch.primary.as_deref())
    .bind(patch.document.as_deref())
    .bind(patch.other.as_deref())
    .bind(clock.now().to_rfc3339())
    .execute(pool)
    .await?;

    info!(
        "Accepted submission from {} for {} ({}; slots: {:?})",
        member_id, key, state, supplied
    );

    find(pool, member_id, key)
        .await?
        .ok_or_else(|| Error::Internal(format!("submission {} for {} vanished", member_id, key)))
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SubmissionRecord> {
    let semester: i64 = row.get("semester");
    let month: i64 = row.get("month");
    let submitted_at: String = row.get("submitted_at");
    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at)
        .map_err(|e| Error::Internal(format!("stored timestamp unreadable: {}", e)))?
        .with_timezone(&Utc);

    Ok(SubmissionRecord {
        member_id: row.get("member_id"),
        year: row.get("year"),
        semester: semester_from_db(semester)?,
        month: month as u32,
        memo: row.get("memo"),
        primary_artifact_path: row.get("primary_path"),
        document_artifact_path: row.get("document_path"),
        other_artifact_path: row.get("other_path"),
        submitted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsign_common::db::init::create_schema;
    use devsign_common::FixedClock;
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

    fn march() -> WindowKey {
        WindowKey::parse(2026, 1, 3).unwrap()
    }

    fn on(month: u32, day: u32) -> FixedClock {
        FixedClock::new(NaiveDate::from_ymd_opt(2026, month, day).unwrap())
    }

    fn complete(memo: &str) -> SubmissionPatch {
        SubmissionPatch::new(memo)
            .with_slot(ArtifactSlot::Primary, "alice/2026-03/primary_1_deck.pptx")
            .with_slot(ArtifactSlot::Document, "alice/2026-03/document_1_report.pdf")
    }

    #[tokio::test]
    async fn test_first_submit_creates_record() {
        let pool = setup_pool().await;
        let record = upsert(&pool, "alice", march(), &complete("hello"), &on(3, 15))
            .await
            .unwrap();

        assert_eq!(record.member_id, "alice");
        assert_eq!(record.memo, "hello");
        assert_eq!(
            record.primary_artifact_path.as_deref(),
            Some("alice/2026-03/primary_1_deck.pptx")
        );
        assert!(record.other_artifact_path.is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let pool = setup_pool().await;
        let clock = on(3, 15);
        let first = upsert(&pool, "alice", march(), &complete("same"), &clock).await.unwrap();
        let second = upsert(&pool, "alice", march(), &complete("same"), &clock).await.unwrap();

        assert_eq!(first, second);
        let records = list_for_window(&pool, march()).await.unwrap();
        assert_eq!(records, vec![second]);
    }

    #[tokio::test]
    async fn test_partial_merge_keeps_unsupplied_slots() {
        let pool = setup_pool().await;
        let clock = on(3, 15);
        upsert(&pool, "alice", march(), &complete("m1"), &clock).await.unwrap();

        let memo_only = SubmissionPatch::new("m2");
        let record = upsert(&pool, "alice", march(), &memo_only, &clock).await.unwrap();

        assert_eq!(record.memo, "m2");
        assert_eq!(
            record.primary_artifact_path.as_deref(),
            Some("alice/2026-03/primary_1_deck.pptx")
        );
        assert_eq!(
            record.document_artifact_path.as_deref(),
            Some("alice/2026-03/document_1_report.pdf")
        );
    }

    #[tokio::test]
    async fn test_resupplied_slot_replaced() {
        let pool = setup_pool().await;
        let clock = on(3, 15);
        upsert(&pool, "alice", march(), &complete("m1"), &clock).await.unwrap();

        let patch = SubmissionPatch::new("m1")
            .with_slot(ArtifactSlot::Primary, "alice/2026-03/primary_2_deck.pptx")
            .with_slot(ArtifactSlot::Other, "alice/2026-03/other_2_notes.zip");
        let record = upsert(&pool, "alice", march(), &patch, &clock).await.unwrap();

        assert_eq!(
            record.primary_artifact_path.as_deref(),
            Some("alice/2026-03/primary_2_deck.pptx")
        );
        assert_eq!(
            record.document_artifact_path.as_deref(),
            Some("alice/2026-03/document_1_report.pdf")
        );
        assert_eq!(
            record.other_artifact_path.as_deref(),
            Some("alice/2026-03/other_2_notes.zip")
        );
    }

    #[tokio::test]
    async fn test_first_submit_requires_document() {
        let pool = setup_pool().await;
        let clock = on(3, 15);
        let patch = SubmissionPatch::new("m")
            .with_slot(ArtifactSlot::Primary, "alice/2026-03/primary_1_deck.pptx");

        let err = upsert(&pool, "alice", march(), &patch, &clock).await.unwrap_err();
        match err {
            Error::IncompleteSubmission { missing } => {
                assert_eq!(missing, vec![ArtifactSlot::Document]);
            }
            other => panic!("expected IncompleteSubmission, got {:?}", other),
        }
        assert!(find(&pool, "alice", march()).await.unwrap().is_none());

        // Same call succeeds once a record exists
        upsert(&pool, "alice", march(), &complete("m"), &clock).await.unwrap();
        upsert(&pool, "alice", march(), &patch, &clock).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_outside_window_rejected() {
        let pool = setup_pool().await;
        upsert(&pool, "alice", march(), &complete("m"), &on(3, 15)).await.unwrap();

        let err = upsert(&pool, "alice", march(), &SubmissionPatch::new("late"), &on(4, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotSubmittable { state: PeriodState::SubmittedLocked, .. }
        ));

        let err = upsert(&pool, "bob", march(), &complete("early"), &on(2, 27))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotSubmittable { state: PeriodState::NotYetOpen, .. }
        ));

        let stored = find(&pool, "alice", march()).await.unwrap().unwrap();
        assert_eq!(stored.memo, "m");
    }

    #[tokio::test]
    async fn test_list_for_member_orders_by_month() {
        let pool = setup_pool().await;
        let may = WindowKey::parse(2026, 1, 5).unwrap();
        upsert(&pool, "alice", may, &complete("may"), &on(5, 3)).await.unwrap();
        upsert(&pool, "alice", march(), &complete("march"), &on(3, 3)).await.unwrap();
        upsert(&pool, "bob", march(), &complete("bob"), &on(3, 3)).await.unwrap();

        let records = list_for_member(&pool, "alice", 2026, Semester::First).await.unwrap();
        let months: Vec<u32> = records.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![3, 5]);

        assert!(list_for_member(&pool, "alice", 2026, Semester::Second)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_admit_reports_all_missing_slots() {
        let window = SubmissionWindow::default_for(march()).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let err = admit(&window, None, &[ArtifactSlot::Other], today).unwrap_err();
        match err {
            Error::IncompleteSubmission { missing } => {
                assert_eq!(missing, vec![ArtifactSlot::Primary, ArtifactSlot::Document]);
            }
            other => panic!("expected IncompleteSubmission, got {:?}", other),
        }
    }
}
