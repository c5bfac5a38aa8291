//! Application services.
//!
//! [`course_sync`] drives the per-course pipeline over a portal and the
//! local filesystem.

pub mod course_sync;

pub use course_sync::{CourseOutcome, CourseReport, CourseSync, RunSummary};
