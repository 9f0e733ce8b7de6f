mod local_client;

pub use self::local_client::*;
