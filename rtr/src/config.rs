// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::messages::Timers;
use crate::refresh::DEFAULT_REFRESH_INTERVAL;
use crate::store::{DEFAULT_HISTORY_DEPTH, DEFAULT_INITIAL_SERIAL};
use crate::RTR_PORT;
use serde::{Deserialize, Deserializer};
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cache server configuration, read from a JSON file.
///
/// ```json
/// {
///     "listen": "[::]:8282",
///     "roa_file": "/var/lib/rpki/roas.json",
///     "refresh_interval": "4m",
///     "timers": {"refresh": 900, "retry": 30, "expire": 171999}
/// }
/// ```
///
/// Only `roa_file` is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    pub roa_file: PathBuf,

    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub refresh_interval: Duration,

    #[serde(default)]
    pub timers: Timers,

    /// Number of past generations a router may be behind and still be
    /// brought up to date incrementally.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    #[serde(default = "default_initial_serial")]
    pub initial_serial: u32,

    /// Where the previous session id is kept, so that a restart picks a
    /// different one.
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// Close connections that have sent nothing for this long.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub idle_timeout: Option<Duration>,

    /// Log to this file instead of stdout.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), RTR_PORT)
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

fn default_initial_serial() -> u32 {
    DEFAULT_INITIAL_SERIAL
}

fn deserialize_duration<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

fn deserialize_opt_duration<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(d)? {
        Some(s) => humantime::parse_duration(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.timers.validate()?;
        if self.history_depth == 0 {
            return Err(Error::Config(
                "history_depth must be at least 1".into(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(Error::Config(
                "refresh_interval must be nonzero".into(),
            ));
        }
        if self.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config("idle_timeout must be nonzero".into()));
        }
        Ok(())
    }
}
