mod scp;
mod ssh_proxy;

pub use self::{
    scp::upload,
    ssh_proxy::{MaybeSsh, SshConfig},
};
