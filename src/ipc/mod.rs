//! IPC module for daemon-UI communication
//!
//! The menu bar app (or any local client) drives the daemon through this
//! socket: switching combinations, toggling shortcut groups and the master
//! switch.

mod protocol;
mod server;

pub use server::Server;
