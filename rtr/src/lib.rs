// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod log;
pub mod messages;
pub mod refresh;
pub mod session;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod proptest;


#[cfg(test)]
pub mod connection_channel;

pub const RTR_PORT: u16 = 8282;
pub const COMPONENT_RTR: &str = "rtr";
pub const MOD_HANDLER: &str = "handler";
pub const MOD_CONNECTION: &str = "connection";
pub const MOD_DISPATCHER: &str = "dispatcher";
pub const MOD_STORE: &str = "store";
pub const MOD_SESSION: &str = "session";
pub const MOD_REFRESH: &str = "refresh";

/// How long blocking reads, channel waits and accept polls last before
/// checking for shutdown.
pub const IO_TIMEOUT: std::time::Duration =
    std::time::Duration::from_millis(100);

/// A router that stops reading for this long is dropped.
pub const WRITE_TIMEOUT: std::time::Duration =
    std::time::Duration::from_secs(30);
