//! Member-facing submission endpoints
//!
//! The semester view pairs each canonical month's window with the member's
//! record (if any) and the resolved period state. Submitting goes through
//! the multipart form the member screen posts.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use devsign_common::{
    period, ArtifactSlot, PeriodState, ProjectTitle, Semester, SubmissionRecord,
    SubmissionWindow, WindowKey,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{members, submissions, titles, windows};
use crate::services::{SlotUpload, SubmissionService, SubmitRequest};
use crate::{ApiError, ApiResult, AppState};

/// Query identifying one member's semester
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTermQuery {
    pub member_id: String,
    pub year: i32,
    pub semester: u8,
}

/// One canonical month of the member's semester
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub window: SubmissionWindow,
    pub state: PeriodState,
    pub record: Option<SubmissionRecord>,
}

/// Member's semester at a glance
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSubmissionsResponse {
    pub member_id: String,
    pub year: i32,
    pub semester: Semester,
    pub project_title: Option<String>,
    /// Existing records only, ordered by month
    pub records: Vec<SubmissionRecord>,
    /// Every canonical month of the semester with its resolved state
    pub months: Vec<MonthView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTitleRequest {
    pub member_id: String,
    pub year: i32,
    pub semester: u8,
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTitleResponse {
    pub member_id: String,
    pub year: i32,
    pub semester: Semester,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub record: SubmissionRecord,
    pub state: PeriodState,
}

/// GET /api/assembly/submissions
pub async fn get_member_submissions(
    State(state): State<AppState>,
    Query(query): Query<MemberTermQuery>,
) -> ApiResult<Json<MemberSubmissionsResponse>> {
    let semester = Semester::try_from(query.semester)?;
    if members::find(&state.db, &query.member_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("member {}", query.member_id)));
    }

    let project_title = titles::get(&state.db, &query.member_id, query.year, semester).await?;
    let records =
        submissions::list_for_member(&state.db, &query.member_id, query.year, semester).await?;

    let today = state.clock.today();
    let mut months = Vec::with_capacity(semester.months().len());
    for month in semester.months() {
        let window = windows::get_window(&state.db, WindowKey::new(query.year, semester, month)?)
            .await?;
        let record = records.iter().find(|r| r.month == month).cloned();
        months.push(MonthView {
            state: period::resolve(&window, record.as_ref(), today),
            window,
            record,
        });
    }

    Ok(Json(MemberSubmissionsResponse {
        member_id: query.member_id,
        year: query.year,
        semester,
        project_title,
        records,
        months,
    }))
}

/// GET /api/assembly/project-title
pub async fn get_project_title(
    State(state): State<AppState>,
    Query(query): Query<MemberTermQuery>,
) -> ApiResult<Json<ProjectTitleResponse>> {
    let semester = Semester::try_from(query.semester)?;
    let title = titles::get(&state.db, &query.member_id, query.year, semester).await?;

    Ok(Json(ProjectTitleResponse {
        member_id: query.member_id,
        year: query.year,
        semester,
        title,
    }))
}

/// POST /api/assembly/project-title
pub async fn set_project_title(
    State(state): State<AppState>,
    Json(request): Json<ProjectTitleRequest>,
) -> ApiResult<Json<ProjectTitle>> {
    let semester = Semester::try_from(request.semester)?;
    let saved = titles::set(
        &state.db,
        &request.member_id,
        request.year,
        semester,
        &request.title,
    )
    .await?;
    Ok(Json(saved))
}

/// POST /api/assembly/submit
///
/// Text fields: `memberId`, `year`, `semester`, `month`, `memo`. File parts:
/// `primary`, `document`, `other`. A file part with an empty body counts as
/// not supplied.
pub async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let mut member_id = None;
    let mut year = None;
    let mut semester = None;
    let mut month = None;
    let mut memo = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(slot) = ArtifactSlot::from_field(&name) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes: Bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }
            if bytes.len() > state.max_upload_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "{} file exceeds {} bytes",
                    slot, state.max_upload_bytes
                )));
            }
            uploads.push(SlotUpload {
                slot,
                filename,
                bytes,
            });
            continue;
        }

        match name.as_str() {
            "memberId" => member_id = Some(field.text().await?),
            "year" => year = Some(parse_number::<i32>(&name, &field.text().await?)?),
            "semester" => semester = Some(parse_number::<u8>(&name, &field.text().await?)?),
            "month" => month = Some(parse_number::<u32>(&name, &field.text().await?)?),
            "memo" => memo = field.text().await?,
            other => debug!("Ignoring unknown submit field '{}'", other),
        }
    }

    let member_id = required(member_id, "memberId")?;
    let key = WindowKey::parse(
        required(year, "year")?,
        required(semester, "semester")?,
        required(month, "month")?,
    )?;

    let service = SubmissionService {
        db: &state.db,
        artifacts: &state.artifacts,
        policy: state.uploads.as_ref(),
        clock: state.clock.as_ref(),
    };
    let record = service
        .submit(SubmitRequest {
            member_id,
            key,
            memo,
            uploads,
        })
        .await?;

    let window = windows::get_window(&state.db, key).await?;
    let period_state = period::resolve(&window, Some(&record), state.clock.today());

    Ok(Json(SubmitResponse {
        record,
        state: period_state,
    }))
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> ApiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("field '{}' is not a number: {}", field, value)))
}

fn required<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::BadRequest(format!("missing field '{}'", field)))
}

/// Build member submission routes
///
/// The submit route accepts one full-size file per slot.
pub fn submission_routes(max_upload_bytes: usize) -> Router<AppState> {
    let body_limit = max_upload_bytes.saturating_mul(ArtifactSlot::ALL.len());

    Router::new()
        .route("/api/assembly/submissions", get(get_member_submissions))
        .route(
            "/api/assembly/project-title",
            get(get_project_title).post(set_project_title),
        )
        .route(
            "/api/assembly/submit",
            post(submit).layer(DefaultBodyLimit::max(body_limit)),
        )
}
