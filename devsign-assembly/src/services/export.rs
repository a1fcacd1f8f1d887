//! Batch export of submitted artifacts as a single zip archive
//!
//! Entries are named `<member>/<slot>_<original filename>` so two members
//! uploading files with the same name never collide. Slot paths that no
//! longer resolve to a stored blob are skipped.
//!
//! The archive is written to an anonymous temp file, copying each blob from
//! disk, so neither the blobs nor the finished archive are held in memory.

use devsign_common::{ArtifactFilter, Error, Result, WindowKey};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{ErrorKind, Seek};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::db::submissions;
use crate::services::artifact_store::{sanitize_component, ArtifactStore};

/// Which artifacts to collect
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub key: WindowKey,
    pub member_ids: Vec<String>,
    pub filter: ArtifactFilter,
}

/// Finished archive ready to send, rewound to the start
#[derive(Debug)]
pub struct ExportArchive {
    pub file_name: String,
    pub file: File,
    pub size_bytes: u64,
    pub entries: Vec<String>,
}

/// Download name: `assembly_<year>_<MM>_<filter>.zip`
pub fn archive_file_name(key: WindowKey, filter: ArtifactFilter) -> String {
    format!("assembly_{}_{:02}_{}.zip", key.year, key.month, filter.token())
}

/// Per-member directory names inside the archive
///
/// Sanitizing is lossy (`"kim lee"` and `"kim_lee"` both clean to
/// `kim_lee`), so a prefix already taken by another member gets a `-2`,
/// `-3`, ... suffix.
#[derive(Debug, Default)]
struct EntryPrefixes {
    by_member: HashMap<String, String>,
    taken: HashSet<String>,
}

impl EntryPrefixes {
    fn for_member(&mut self, member_id: &str) -> String {
        if let Some(prefix) = self.by_member.get(member_id) {
            return prefix.clone();
        }

        let base = sanitize_component(member_id);
        let mut prefix = base.clone();
        let mut n = 2;
        while !self.taken.insert(prefix.clone()) {
            prefix = format!("{}-{}", base, n);
            n += 1;
        }

        self.by_member.insert(member_id.to_string(), prefix.clone());
        prefix
    }
}

/// Collect the requested artifacts into a zip archive
pub async fn export(
    pool: &SqlitePool,
    artifacts: &ArtifactStore,
    request: &ExportRequest,
) -> Result<ExportArchive> {
    if request.member_ids.is_empty() {
        return Err(Error::Validation("export needs at least one member".to_string()));
    }

    let mut seen = HashSet::new();
    let mut prefixes = EntryPrefixes::default();
    let mut sources: Vec<(String, PathBuf)> = Vec::new();

    for member_id in &request.member_ids {
        if !seen.insert(member_id.as_str()) {
            continue;
        }

        let Some(record) = submissions::find(pool, member_id, request.key).await? else {
            debug!("No submission from {} for {}", member_id, request.key);
            continue;
        };

        for &slot in request.filter.slots() {
            let Some(path) = record.slot_path(slot) else {
                continue;
            };
            let Some((meta, location)) = artifacts.locate(path).await? else {
                continue;
            };
            let entry = format!(
                "{}/{}_{}",
                prefixes.for_member(member_id),
                slot,
                sanitize_component(&meta.original_filename)
            );
            sources.push((entry, location));
        }
    }

    let empty = || Error::EmptyExport {
        window: request.key.to_string(),
    };
    if sources.is_empty() {
        return Err(empty());
    }

    let (file, size_bytes, entries) = tokio::task::spawn_blocking(move || write_archive(sources))
        .await
        .map_err(|e| Error::Internal(format!("archive task failed: {}", e)))??;
    if entries.is_empty() {
        return Err(empty());
    }

    let file_name = archive_file_name(request.key, request.filter);
    info!(
        "Exported {} artifacts for {} as {} ({} bytes)",
        entries.len(),
        request.key,
        file_name,
        size_bytes
    );

    Ok(ExportArchive {
        file_name,
        file,
        size_bytes,
        entries,
    })
}

fn write_archive(sources: Vec<(String, PathBuf)>) -> Result<(File, u64, Vec<String>)> {
    let mut zip = ZipWriter::new(tempfile::tempfile()?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::with_capacity(sources.len());

    for (name, location) in sources {
        // Blob removed after it was located
        let mut blob = match File::open(&location) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Artifact {} vanished during export", location.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        zip.start_file(name.clone(), options)
            .map_err(|e| Error::Archive(e.to_string()))?;
        std::io::copy(&mut blob, &mut zip)?;
        entries.push(name);
    }

    let mut file = zip.finish().map_err(|e| Error::Archive(e.to_string()))?;
    let size_bytes = file.stream_position()?;
    file.rewind()?;
    Ok((file, size_bytes, entries))
}
