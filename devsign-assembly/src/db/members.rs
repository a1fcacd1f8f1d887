//! Member roster access
//!
//! The roster belongs to member management. The submission engine only
//! reads it: totals for progress ratios, display names for drill-down, and
//! existence checks before accepting a submission.

use devsign_common::{Member, Result};
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};

/// Ids of everyone on the roster
///
/// Its size is the denominator of every progress ratio; records from ids
/// outside it are left out of the numerator.
pub async fn roster_ids(pool: &SqlitePool) -> Result<HashSet<String>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT member_id FROM members")
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

pub async fn find(pool: &SqlitePool, member_id: &str) -> Result<Option<Member>> {
    let row = sqlx::query("SELECT member_id, name, student_id FROM members WHERE member_id = ?")
        .bind(member_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Member {
        member_id: row.get("member_id"),
        name: row.get("name"),
        student_id: row.get("student_id"),
    }))
}

/// Every member keyed by id
pub async fn list_by_id(pool: &SqlitePool) -> Result<HashMap<String, Member>> {
    let rows = sqlx::query("SELECT member_id, name, student_id FROM members")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let member = Member {
                member_id: row.get("member_id"),
                name: row.get("name"),
                student_id: row.get("student_id"),
            };
            (member.member_id.clone(), member)
        })
        .collect())
}

/// Insert or update a roster entry (member management side)
pub async fn upsert_member(pool: &SqlitePool, member: &Member) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO members (member_id, name, student_id)
        VALUES (?, ?, ?)
        ON CONFLICT(member_id) DO UPDATE SET
            name = excluded.name,
            student_id = excluded.student_id
        "#,
    )
    .bind(&member.member_id)
    .bind(&member.name)
    .bind(&member.student_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsign_common::db::init::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_roster_roundtrip() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();

        assert!(roster_ids(&pool).await.unwrap().is_empty());

        let alice = Member {
            member_id: "alice".to_string(),
            name: "Alice".to_string(),
            student_id: Some("20260001".to_string()),
        };
        upsert_member(&pool, &alice).await.unwrap();
        upsert_member(&pool, &alice).await.unwrap();

        assert_eq!(
            roster_ids(&pool).await.unwrap(),
            HashSet::from(["alice".to_string()])
        );
        assert_eq!(find(&pool, "alice").await.unwrap(), Some(alice.clone()));
        assert_eq!(find(&pool, "bob").await.unwrap(), None);
        assert_eq!(list_by_id(&pool).await.unwrap().get("alice"), Some(&alice));
    }
}
