pub mod course;
pub mod item;

pub use course::{Category, CourseSpec};
pub use item::{ItemTitle, Locator, RemoteItem};
