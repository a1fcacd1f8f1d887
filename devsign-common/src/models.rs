//! Domain model for periodic submissions
//!
//! A year has two semesters, each owning four canonical months. Every
//! canonical month has exactly one [`SubmissionWindow`], and every member has
//! at most one [`SubmissionRecord`] per window.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Canonical months of the first semester
pub const FIRST_SEMESTER_MONTHS: [u32; 4] = [3, 4, 5, 6];

/// Canonical months of the second semester
pub const SECOND_SEMESTER_MONTHS: [u32; 4] = [9, 10, 11, 12];

/// All canonical months of a year, in calendar order
pub const CANONICAL_MONTHS: [u32; 8] = [3, 4, 5, 6, 9, 10, 11, 12];

/// Default window bounds used when a year was never configured
pub const DEFAULT_START_DAY: u32 = 1;
pub const DEFAULT_END_DAY: u32 = 28;

/// Academic term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    /// Semester that owns a canonical month, `None` for any other month
    pub fn of_month(month: u32) -> Option<Self> {
        if FIRST_SEMESTER_MONTHS.contains(&month) {
            Some(Semester::First)
        } else if SECOND_SEMESTER_MONTHS.contains(&month) {
            Some(Semester::Second)
        } else {
            None
        }
    }

    pub fn months(&self) -> [u32; 4] {
        match self {
            Semester::First => FIRST_SEMESTER_MONTHS,
            Semester::Second => SECOND_SEMESTER_MONTHS,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Semester::First => 1,
            Semester::Second => 2,
        }
    }
}

impl TryFrom<u8> for Semester {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Semester::First),
            2 => Ok(Semester::Second),
            other => Err(Error::Validation(format!(
                "semester must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl From<Semester> for u8 {
    fn from(semester: Semester) -> Self {
        semester.number()
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Identity of one submission window: (year, semester, canonical month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    pub year: i32,
    pub semester: Semester,
    pub month: u32,
}

impl WindowKey {
    /// Build a key, rejecting months that are not canonical for the semester
    pub fn new(year: i32, semester: Semester, month: u32) -> Result<Self> {
        if !semester.months().contains(&month) {
            return Err(Error::NotFound(format!(
                "no submission window for {} semester {} month {}",
                year, semester, month
            )));
        }
        Ok(Self { year, semester, month })
    }

    /// Build a key from raw wire values
    pub fn parse(year: i32, semester: u8, month: u32) -> Result<Self> {
        Self::new(year, Semester::try_from(semester)?, month)
    }

    /// Deliverable type implied by the month's position in its semester
    pub fn inferred_type(&self) -> DeliverableType {
        DeliverableType::for_month(self.month)
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-S{}-{:02}", self.year, self.semester, self.month)
    }
}

/// Kind of deliverable due in a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliverableType {
    Plan,
    Progress,
    #[serde(alias = "RESULT")]
    Final,
}

impl DeliverableType {
    /// First month of a semester is the plan, last is the final, the rest are progress
    pub fn for_month(month: u32) -> Self {
        match Semester::of_month(month) {
            Some(semester) => {
                let months = semester.months();
                if month == months[0] {
                    DeliverableType::Plan
                } else if month == months[3] {
                    DeliverableType::Final
                } else {
                    DeliverableType::Progress
                }
            }
            None => DeliverableType::Progress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverableType::Plan => "PLAN",
            DeliverableType::Progress => "PROGRESS",
            DeliverableType::Final => "FINAL",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PLAN" => Ok(DeliverableType::Plan),
            "PROGRESS" => Ok(DeliverableType::Progress),
            "FINAL" | "RESULT" => Ok(DeliverableType::Final),
            other => Err(Error::Validation(format!(
                "unknown deliverable type: {}",
                other
            ))),
        }
    }
}

/// Configured time range for one (year, semester, month) deliverable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionWindow {
    pub year: i32,
    pub semester: Semester,
    pub month: u32,
    #[serde(rename = "type")]
    pub deliverable_type: DeliverableType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SubmissionWindow {
    pub fn key(&self) -> WindowKey {
        WindowKey {
            year: self.year,
            semester: self.semester,
            month: self.month,
        }
    }

    /// Default window for a key: day 1 through day 28 of the month
    pub fn default_for(key: WindowKey) -> Result<Self> {
        let date = |day: u32| {
            NaiveDate::from_ymd_opt(key.year, key.month, day).ok_or_else(|| {
                Error::Validation(format!("year {} out of range", key.year))
            })
        };
        Ok(Self {
            year: key.year,
            semester: key.semester,
            month: key.month,
            deliverable_type: key.inferred_type(),
            start_date: date(DEFAULT_START_DAY)?,
            end_date: date(DEFAULT_END_DAY)?,
        })
    }

    /// Full default schedule for a year, in calendar order
    pub fn default_schedule(year: i32) -> Result<Vec<Self>> {
        CANONICAL_MONTHS
            .iter()
            .map(|&month| {
                let semester = Semester::of_month(month)
                    .ok_or_else(|| Error::Internal(format!("month {} not canonical", month)))?;
                Self::default_for(WindowKey { year, semester, month })
            })
            .collect()
    }
}

/// One of the three named artifact attachment points on a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSlot {
    /// Primary deliverable (presentation)
    Primary,
    /// Formal document (PDF)
    Document,
    /// Supplementary material, always optional
    Other,
}

impl ArtifactSlot {
    pub const ALL: [ArtifactSlot; 3] = [
        ArtifactSlot::Primary,
        ArtifactSlot::Document,
        ArtifactSlot::Other,
    ];

    /// Slots that the first submission for an identity must supply
    pub const MANDATORY_ON_FIRST_SUBMIT: [ArtifactSlot; 2] =
        [ArtifactSlot::Primary, ArtifactSlot::Document];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactSlot::Primary => "primary",
            ArtifactSlot::Document => "document",
            ArtifactSlot::Other => "other",
        }
    }

    /// Map a form field name to a slot, accepting the older
    /// `presentation`/`pdf` field names
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "primary" | "presentation" => Some(ArtifactSlot::Primary),
            "document" | "pdf" => Some(ArtifactSlot::Document),
            "other" => Some(ArtifactSlot::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored submission of one member for one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub member_id: String,
    pub year: i32,
    pub semester: Semester,
    pub month: u32,
    pub memo: String,
    pub primary_artifact_path: Option<String>,
    pub document_artifact_path: Option<String>,
    pub other_artifact_path: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn key(&self) -> WindowKey {
        WindowKey {
            year: self.year,
            semester: self.semester,
            month: self.month,
        }
    }

    pub fn slot_path(&self, slot: ArtifactSlot) -> Option<&str> {
        match slot {
            ArtifactSlot::Primary => self.primary_artifact_path.as_deref(),
            ArtifactSlot::Document => self.document_artifact_path.as_deref(),
            ArtifactSlot::Other => self.other_artifact_path.as_deref(),
        }
    }
}

/// Update applied to a submission record
///
/// The memo is always replaced. A slot left as `None` keeps whatever the
/// stored record already references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPatch {
    pub memo: String,
    pub primary: Option<String>,
    pub document: Option<String>,
    pub other: Option<String>,
}

impl SubmissionPatch {
    pub fn new(memo: impl Into<String>) -> Self {
        Self {
            memo: memo.into(),
            ..Default::default()
        }
    }

    pub fn with_slot(mut self, slot: ArtifactSlot, path: impl Into<String>) -> Self {
        self.set_slot(slot, path.into());
        self
    }

    pub fn set_slot(&mut self, slot: ArtifactSlot, path: String) {
        match slot {
            ArtifactSlot::Primary => self.primary = Some(path),
            ArtifactSlot::Document => self.document = Some(path),
            ArtifactSlot::Other => self.other = Some(path),
        }
    }

    pub fn slot(&self, slot: ArtifactSlot) -> Option<&str> {
        match slot {
            ArtifactSlot::Primary => self.primary.as_deref(),
            ArtifactSlot::Document => self.document.as_deref(),
            ArtifactSlot::Other => self.other.as_deref(),
        }
    }

    /// Slots this patch supplies a value for
    pub fn supplied_slots(&self) -> Vec<ArtifactSlot> {
        ArtifactSlot::ALL
            .into_iter()
            .filter(|slot| self.slot(*slot).is_some())
            .collect()
    }
}

/// Free-text project title for a member's semester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTitle {
    pub member_id: String,
    pub year: i32,
    pub semester: Semester,
    pub title: String,
}

/// Lifecycle state of a (member, window) pair, derived and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodState {
    /// Generic "nothing submitted" label; resolution always narrows it to
    /// one of the time-qualified states below
    NotSubmitted,
    SubmittableOpen,
    SubmittedEditable,
    SubmittedLocked,
    NotYetOpen,
    ClosedNeverSubmitted,
}

impl PeriodState {
    /// Whether a write is accepted in this state
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            PeriodState::SubmittableOpen | PeriodState::SubmittedEditable
        )
    }

    /// Whether a record exists and counts toward progress
    pub fn is_submitted(&self) -> bool {
        matches!(
            self,
            PeriodState::SubmittedEditable | PeriodState::SubmittedLocked
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodState::NotSubmitted => "NOT_SUBMITTED",
            PeriodState::SubmittableOpen => "SUBMITTABLE_OPEN",
            PeriodState::SubmittedEditable => "SUBMITTED_EDITABLE",
            PeriodState::SubmittedLocked => "SUBMITTED_LOCKED",
            PeriodState::NotYetOpen => "NOT_YET_OPEN",
            PeriodState::ClosedNeverSubmitted => "CLOSED_NEVER_SUBMITTED",
        }
    }
}

impl fmt::Display for PeriodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slots a batch export collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArtifactFilter {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "primary", alias = "ppt")]
    PrimaryOnly,
    #[serde(rename = "document", alias = "pdf")]
    DocumentOnly,
}

impl ArtifactFilter {
    pub fn slots(&self) -> &'static [ArtifactSlot] {
        match self {
            ArtifactFilter::All => &ArtifactSlot::ALL,
            ArtifactFilter::PrimaryOnly => &[ArtifactSlot::Primary],
            ArtifactFilter::DocumentOnly => &[ArtifactSlot::Document],
        }
    }

    /// Token used in generated archive names
    pub fn token(&self) -> &'static str {
        match self {
            ArtifactFilter::All => "all",
            ArtifactFilter::PrimaryOnly => "primary",
            ArtifactFilter::DocumentOnly => "document",
        }
    }
}

/// Roster entry owned by member management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub member_id: String,
    pub name: String,
    pub student_id: Option<String>,
}
