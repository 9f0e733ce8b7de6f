pub mod job;

#[rustfmt::skip]
pub use self::job::{Job, JobResources, JobState};
