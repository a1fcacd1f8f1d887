//! Member submission workflow
//!
//! Validates the uploads, checks the window gate before any blob is written,
//! stores the blobs, then merges the references into the record. The store's
//! own gate runs again inside the upsert, so a window that closes between
//! the two checks still rejects the write (leaving orphaned blobs behind,
//! which the artifact store tolerates).

use axum::body::Bytes;
use devsign_common::config::UploadPolicy;
use devsign_common::{ArtifactSlot, Clock, Error, Result, SubmissionPatch, SubmissionRecord, WindowKey};
use sqlx::SqlitePool;
use std::collections::BTreeSet;

use crate::db::{members, submissions, windows};
use crate::services::artifact_store::ArtifactStore;

/// One uploaded file bound for a slot
#[derive(Debug, Clone)]
pub struct SlotUpload {
    pub slot: ArtifactSlot,
    pub filename: String,
    pub bytes: Bytes,
}

/// Everything a member sends with one submit
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub member_id: String,
    pub key: WindowKey,
    pub memo: String,
    pub uploads: Vec<SlotUpload>,
}

/// Dependencies of the submission workflow
pub struct SubmissionService<'a> {
    pub db: &'a SqlitePool,
    pub artifacts: &'a ArtifactStore,
    pub policy: &'a UploadPolicy,
    pub clock: &'a dyn Clock,
}

impl SubmissionService<'_> {
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmissionRecord> {
        if members::find(self.db, &request.member_id).await?.is_none() {
            return Err(Error::NotFound(format!("member {}", request.member_id)));
        }

        let mut supplied = BTreeSet::new();
        for upload in &request.uploads {
            if !supplied.insert(upload.slot) {
                return Err(Error::Validation(format!(
                    "{} slot supplied more than once",
                    upload.slot
                )));
            }
            self.policy.check(upload.slot, &upload.filename)?;
        }
        let supplied: Vec<ArtifactSlot> = supplied.into_iter().collect();

        // Gate before writing blobs so rejected submits leave nothing behind
        let window = windows::get_window(self.db, request.key).await?;
        let existing = submissions::find(self.db, &request.member_id, request.key).await?;
        submissions::admit(&window, existing.as_ref(), &supplied, self.clock.today())?;

        let mut patch = SubmissionPatch::new(request.memo);
        for upload in &request.uploads {
            let stored = self
                .artifacts
                .put(
                    &request.member_id,
                    request.key,
                    upload.slot,
                    &upload.filename,
                    &upload.bytes,
                    self.clock,
                )
                .await?;
            patch.set_slot(upload.slot, stored.path);
        }

        submissions::upsert(self.db, &request.member_id, request.key, &patch, self.clock).await
    }
}
