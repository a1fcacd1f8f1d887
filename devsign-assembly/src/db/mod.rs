//! Database access for the submission engine
//!
//! Each module owns one table; schema creation lives in devsign-common.

pub mod members;
pub mod submissions;
pub mod titles;
pub mod windows;
