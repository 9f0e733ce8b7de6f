pub mod data_file;
pub mod job;
pub mod preflight;

pub mod prelude {
    #[rustfmt::skip]
    pub use super::{
        data_file::{DataFileError, Pattern, RemapReport},
        job::{JobServiceImpl, JobServiceState},
        preflight::Problem,
    };
}
