//! Filesystem-backed artifact store
//!
//! Blobs are written once under the upload directory and never overwritten:
//! every upload gets a fresh `<member>/<year>-<month>/<slot>_<uuid>_<name>`
//! path. Re-submitting a slot leaves the previous blob in place; records
//! only hold references. A metadata row per blob keeps the original filename
//! and a SHA-256 of the content.

use chrono::{DateTime, Utc};
use devsign_common::{ArtifactSlot, Clock, Error, Result, WindowKey};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Metadata of one stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Relative path under the upload directory, `/`-separated
    pub path: String,
    pub original_filename: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub stored_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
    db: SqlitePool,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>, db: SqlitePool) -> Self {
        Self {
            base_dir: base_dir.into(),
            db,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write a new blob for one slot of a member's submission
    pub async fn put(
        &self,
        member_id: &str,
        key: WindowKey,
        slot: ArtifactSlot,
        original_filename: &str,
        bytes: &[u8],
        clock: &dyn Clock,
    ) -> Result<StoredArtifact> {
        let original = base_filename(original_filename);
        let path = format!(
            "{}/{}-{:02}/{}_{}_{}",
            sanitize_component(member_id),
            key.year,
            key.month,
            slot,
            Uuid::new_v4().simple(),
            sanitize_component(&original)
        );

        let target = self.base_dir.join(&path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        let artifact = StoredArtifact {
            path,
            original_filename: original,
            size_bytes: bytes.len() as i64,
            sha256: format!("{:x}", Sha256::digest(bytes)),
            stored_at: clock.now(),
        };

        sqlx::query(
            r#"
            INSERT INTO artifacts (path, original_filename, size_bytes, sha256, stored_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artifact.path)
        .bind(&artifact.original_filename)
        .bind(artifact.size_bytes)
        .bind(&artifact.sha256)
        .bind(artifact.stored_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        debug!(
            "Stored {} artifact {} ({} bytes)",
            slot, artifact.path, artifact.size_bytes
        );
        Ok(artifact)
    }

    /// Metadata for a stored path, `None` when the path was never stored
    pub async fn metadata(&self, path: &str) -> Result<Option<StoredArtifact>> {
        let Some(path) = normalize_stored_path(path) else {
            return Ok(None);
        };

        let row = sqlx::query(
            "SELECT path, original_filename, size_bytes, sha256, stored_at FROM artifacts WHERE path = ?",
        )
        .bind(&path)
        .fetch_optional(&self.db)
        .await?;

        row.map(|row| -> Result<StoredArtifact> {
            let stored_at: String = row.get("stored_at");
            let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                .map_err(|e| Error::Internal(format!("stored timestamp unreadable: {}", e)))?
                .with_timezone(&Utc);
            Ok(StoredArtifact {
                path: row.get("path"),
                original_filename: row.get("original_filename"),
                size_bytes: row.get("size_bytes"),
                sha256: row.get("sha256"),
                stored_at,
            })
        })
        .transpose()
    }

    /// Open a stored blob for streaming
    ///
    /// Unknown paths and blobs missing from disk are both `NotFound`.
    pub async fn open(&self, path: &str) -> Result<(StoredArtifact, tokio::fs::File)> {
        let artifact = self
            .metadata(path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("artifact {}", path)))?;

        let file = tokio::fs::File::open(self.base_dir.join(&artifact.path))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::NotFound(format!("artifact {}", artifact.path)),
                _ => Error::Io(e),
            })?;

        Ok((artifact, file))
    }

    /// Location on disk of a stored blob, `None` when unknown or missing
    pub async fn locate(&self, path: &str) -> Result<Option<(StoredArtifact, PathBuf)>> {
        let Some(artifact) = self.metadata(path).await? else {
            return Ok(None);
        };

        let location = self.base_dir.join(&artifact.path);
        if tokio::fs::try_exists(&location).await? {
            Ok(Some((artifact, location)))
        } else {
            warn!("Artifact {} registered but missing on disk", artifact.path);
            Ok(None)
        }
    }
}

/// Canonical relative form of a stored path
///
/// Accepts `\` separators and a leading `uploads/` prefix. Rejects absolute
/// paths and anything that would step outside the upload directory.
pub fn normalize_stored_path(raw: &str) -> Option<String> {
    let unified = raw.trim().replace('\\', "/");
    let trimmed = unified
        .strip_prefix("/uploads/")
        .or_else(|| unified.strip_prefix("uploads/"))
        .unwrap_or(&unified);

    if trimmed.is_empty() || trimmed.starts_with('/') {
        return None;
    }

    let path = Path::new(trimmed);
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            _ => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Final path segment of a client-supplied filename
pub fn base_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "file".to_string()
    } else {
        name.to_string()
    }
}

/// Make a string safe as a single path segment
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
