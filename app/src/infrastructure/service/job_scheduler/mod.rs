pub mod local;
pub mod script;
pub mod slurm;

#[rustfmt::skip]
pub use self::{
    local::{LocalClient, LocalClientState},
    slurm::{SlurmClient, SlurmClientState},
};
