//! Project title registry
//!
//! Side table keyed by (member, year, semester). Independent of window
//! gating: a title can be set at any time.

use devsign_common::{Error, ProjectTitle, Result, Semester};
use sqlx::SqlitePool;

/// Title for a member's semester, `None` when never set
pub async fn get(
    pool: &SqlitePool,
    member_id: &str,
    year: i32,
    semester: Semester,
) -> Result<Option<String>> {
    let title: Option<String> = sqlx::query_scalar(
        "SELECT title FROM project_titles WHERE member_id = ? AND year = ? AND semester = ?",
    )
    .bind(member_id)
    .bind(year)
    .bind(semester.number() as i64)
    .fetch_optional(pool)
    .await?;

    Ok(title)
}

/// Insert or replace the title; an empty (or whitespace-only) title is rejected
pub async fn set(
    pool: &SqlitePool,
    member_id: &str,
    year: i32,
    semester: Semester,
    title: &str,
) -> Result<ProjectTitle> {
    if title.trim().is_empty() {
        return Err(Error::Validation("project title cannot be empty".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO project_titles (member_id, year, semester, title, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(member_id, year, semester) DO UPDATE SET
            title = excluded.title,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(member_id)
    .bind(year)
    .bind(semester.number() as i64)
    .bind(title)
    .execute(pool)
    .await?;

    Ok(ProjectTitle {
        member_id: member_id.to_string(),
        year,
        semester,
        title: title.to_string(),
    })
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

    #[tokio::test]
    async fn test_get_missing_title() {
        let pool = setup_pool().await;
        assert_eq!(get(&pool, "alice", 2026, Semester::First).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites_per_semester() {
        let pool = setup_pool().await;
        set(&pool, "alice", 2026, Semester::First, "Compiler").await.unwrap();
        set(&pool, "alice", 2026, Semester::First, "Better compiler").await.unwrap();
        set(&pool, "alice", 2026, Semester::Second, "Linker").await.unwrap();

        assert_eq!(
            get(&pool, "alice", 2026, Semester::First).await.unwrap().as_deref(),
            Some("Better compiler")
        );
        assert_eq!(
            get(&pool, "alice", 2026, Semester::Second).await.unwrap().as_deref(),
            Some("Linker")
        );
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let pool = setup_pool().await;
        set(&pool, "alice", 2026, Semester::First, "Compiler").await.unwrap();

        for empty in ["", "   "] {
            let err = set(&pool, "alice", 2026, Semester::First, empty).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(
            get(&pool, "alice", 2026, Semester::First).await.unwrap().as_deref(),
            Some("Compiler")
        );
    }
}
