pub mod descriptor;
pub mod error;
pub mod launch;
pub mod mail;
pub mod output;
pub mod resources;
pub mod wall_time;

#[rustfmt::skip]
pub use self::{
    descriptor::JobDescriptor,
    error::DescriptorError,
    launch::{LaunchCommand, Launcher},
    mail::{MailEvent, MailPolicy},
    output::OutputTemplate,
    resources::ResourceRequest,
    wall_time::WallTime,
};
