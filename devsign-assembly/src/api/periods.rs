//! Submission window endpoints
//!
//! Members read the schedule for a year; admins read it with progress
//! counts and replace it wholesale.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use devsign_common::{period, DeliverableType, Semester, SubmissionWindow};
use serde::{Deserialize, Serialize};

use crate::db::{members, submissions, windows};
use crate::{ApiResult, AppState};

/// One window as sent by the admin configuration screen
///
/// `year` defaults to the path year and `type` to the month's position.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInput {
    #[serde(default)]
    pub year: Option<i32>,
    pub semester: u8,
    pub month: u32,
    #[serde(default, rename = "type")]
    pub deliverable_type: Option<DeliverableType>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl WindowInput {
    fn into_window(self, year: i32) -> ApiResult<SubmissionWindow> {
        Ok(SubmissionWindow {
            year: self.year.unwrap_or(year),
            semester: Semester::try_from(self.semester)?,
            month: self.month,
            deliverable_type: self
                .deliverable_type
                .unwrap_or_else(|| DeliverableType::for_month(self.month)),
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Window annotated with admin progress counts
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOverview {
    #[serde(flatten)]
    pub window: SubmissionWindow,
    pub submitted_count: usize,
    pub total_count: usize,
}

/// GET /api/assembly/periods/:year
pub async fn get_periods(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Json<Vec<SubmissionWindow>>> {
    Ok(Json(windows::get_windows(&state.db, year).await?))
}

/// GET /api/admin/periods/:year
pub async fn get_admin_periods(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Json<Vec<WindowOverview>>> {
    let today = state.clock.today();
    let roster = members::roster_ids(&state.db).await?;

    let mut overview = Vec::new();
    for window in windows::get_windows(&state.db, year).await? {
        let records = submissions::list_for_window(&state.db, window.key()).await?;
        let rostered = records.iter().filter(|r| roster.contains(&r.member_id));
        overview.push(WindowOverview {
            submitted_count: period::submitted_count(&window, rostered, today),
            total_count: roster.len(),
            window,
        });
    }

    Ok(Json(overview))
}

/// PUT /api/admin/periods/:year
pub async fn save_periods(
    State(state): State<AppState>,
    Path(year): Path<i32>,
    Json(inputs): Json<Vec<WindowInput>>,
) -> ApiResult<Json<Vec<SubmissionWindow>>> {
    let schedule = inputs
        .into_iter()
        .map(|input| input.into_window(year))
        .collect::<ApiResult<Vec<_>>>()?;

    windows::save_windows(&state.db, year, &schedule).await?;

    Ok(Json(windows::get_windows(&state.db, year).await?))
}

/// Build window routes
pub fn period_routes() -> Router<AppState> {
    Router::new()
        .route("/api/assembly/periods/:year", get(get_periods))
        .route(
            "/api/admin/periods/:year",
            get(get_admin_periods).put(save_periods),
        )
}
