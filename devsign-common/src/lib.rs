//! # devsign Common Library
//!
//! Shared code for the devsign submission services:
//! - Domain model (windows, submission records, slots, period states)
//! - Period state resolution
//! - Database schema initialization
//! - Configuration loading
//! - Error taxonomy

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod period;
pub mod time;

pub use error::{Error, Result};
pub use models::{
    ArtifactFilter, ArtifactSlot, DeliverableType, Member, PeriodState, ProjectTitle, Semester,
    SubmissionPatch, SubmissionRecord, SubmissionWindow, WindowKey,
};
pub use time::{Clock, FixedClock, SystemClock};
