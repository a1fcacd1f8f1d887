//! Business logic layered over the stores

pub mod artifact_store;
pub mod export;
pub mod submission;

pub use artifact_store::{ArtifactStore, StoredArtifact};
pub use export::{export, ExportArchive, ExportRequest};
pub use submission::{SlotUpload, SubmissionService, SubmitRequest};
