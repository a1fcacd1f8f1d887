//! Admin progress and export endpoints

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use devsign_common::{period, ArtifactFilter, DeliverableType, PeriodState, SubmissionRecord, WindowKey};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::api::artifacts::content_disposition;
use crate::db::{members, submissions, windows};
use crate::services::{self, ExportRequest};
use crate::{ApiResult, AppState};

/// Progress of one window across the roster
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub year: i32,
    pub semester: u8,
    pub month: u32,
    #[serde(rename = "type")]
    pub deliverable_type: DeliverableType,
    pub submitted_count: usize,
    pub total_count: usize,
}

/// One submitter in the drill-down list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMember {
    pub member_id: String,
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub state: PeriodState,
    pub record: SubmissionRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBody {
    pub year: i32,
    pub semester: u8,
    pub month: u32,
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub filter: ArtifactFilter,
}

/// GET /api/admin/periods/:year/:semester/:month/summary
pub async fn window_summary(
    State(state): State<AppState>,
    Path((year, semester, month)): Path<(i32, u8, u32)>,
) -> ApiResult<Json<WindowSummary>> {
    let key = WindowKey::parse(year, semester, month)?;
    let window = windows::get_window(&state.db, key).await?;
    let records = submissions::list_for_window(&state.db, key).await?;
    let roster = members::roster_ids(&state.db).await?;
    let rostered = records.iter().filter(|r| roster.contains(&r.member_id));

    Ok(Json(WindowSummary {
        year,
        semester,
        month,
        deliverable_type: window.deliverable_type,
        submitted_count: period::submitted_count(&window, rostered, state.clock.today()),
        total_count: roster.len(),
    }))
}

/// GET /api/admin/periods/:year/:semester/:month/submissions
pub async fn window_members(
    State(state): State<AppState>,
    Path((year, semester, month)): Path<(i32, u8, u32)>,
) -> ApiResult<Json<Vec<WindowMember>>> {
    let key = WindowKey::parse(year, semester, month)?;
    let window = windows::get_window(&state.db, key).await?;
    let records = submissions::list_for_window(&state.db, key).await?;
    let roster = members::list_by_id(&state.db).await?;
    let today = state.clock.today();

    let rows = records
        .into_iter()
        .map(|record| {
            let member = roster.get(&record.member_id);
            WindowMember {
                member_id: record.member_id.clone(),
                name: member.map(|m| m.name.clone()),
                student_id: member.and_then(|m| m.student_id.clone()),
                state: period::resolve(&window, Some(&record), today),
                record,
            }
        })
        .collect();

    Ok(Json(rows))
}

/// POST /api/admin/periods/export
pub async fn export_window(
    State(state): State<AppState>,
    Json(body): Json<ExportBody>,
) -> ApiResult<Response> {
    let request = ExportRequest {
        key: WindowKey::parse(body.year, body.semester, body.month)?,
        member_ids: body.member_ids,
        filter: body.filter,
    };
    let archive = services::export(&state.db, &state.artifacts, &request).await?;

    let file = tokio::fs::File::from_std(archive.file);
    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
        (header::CONTENT_LENGTH, HeaderValue::from(archive.size_bytes)),
        (header::CONTENT_DISPOSITION, content_disposition(&archive.file_name)),
    ];
    Ok((headers, body).into_response())
}

/// Build admin progress and export routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/periods/:year/:semester/:month/summary",
            get(window_summary),
        )
        .route(
            "/api/admin/periods/:year/:semester/:month/submissions",
            get(window_members),
        )
        .route("/api/admin/periods/export", post(export_window))
}
