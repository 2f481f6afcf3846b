//! IPC module for daemon-host communication

mod protocol;
mod server;

pub use protocol::{DaemonStatus, Notification, Request, Response, MAX_MESSAGE_LEN};
pub use server::{Backend, Server};
