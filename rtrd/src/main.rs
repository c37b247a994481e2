// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use clap::Parser;
use rtr::config::Config;
use rtr::dispatcher::Dispatcher;
use rtr::refresh::Refresher;
use rtr::session::{load_session_id, SessionManager};
use rtr::source::JsonFileSource;
use rtr::store::SnapshotStore;
use rtr_common::log::{init_file_logger, init_logger, init_term_logger};
use slog::{info, Logger};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// RPKI to router cache server.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file.
    config: PathBuf,

    /// Human readable logs on the terminal instead of bunyan json.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;

    let log = match (&config.log_file, cli.pretty) {
        (Some(path), _) => init_file_logger(path)?,
        (None, true) => init_term_logger(),
        (None, false) => init_logger(),
    };

    run(config, log)
}

fn run(config: Config, log: Logger) -> Result<()> {
    info!(log, "starting rtr cache server";
        "listen" => config.listen,
        "roa_file" => config.roa_file.display().to_string(),
        "refresh_interval" =>
            humantime::format_duration(config.refresh_interval).to_string()
    );

    let session_id = load_session_id(config.session_file.as_deref(), &log)
        .context("choose session id")?;

    let store = Arc::new(SnapshotStore::new(
        config.history_depth,
        config.initial_serial,
        log.clone(),
    ));
    let session = Arc::new(SessionManager::new(
        session_id,
        config.timers,
        store,
        log.clone(),
    ));

    let dispatcher = Dispatcher::bind(
        config.listen,
        session.clone(),
        config.idle_timeout,
        log.clone(),
    )
    .with_context(|| format!("bind {}", config.listen))?;

    let _refresher = Refresher::start(
        JsonFileSource::new(&config.roa_file, log.clone()),
        session,
        config.refresh_interval,
        log.clone(),
    )
    .context("start refresher")?;

    termination_handler(&dispatcher, log.clone())?;

    dispatcher.run();

    info!(log, "rtr cache server stopped");
    Ok(())
}

/// SIGINT and SIGTERM stop the accept loop and every connection handler.
fn termination_handler(dispatcher: &Dispatcher, log: Logger) -> Result<()> {
    let shutdown = dispatcher.shutdown_flag();
    ctrlc::set_handler(move || {
        info!(log, "termination requested");
        shutdown.store(true, Ordering::Release);
    })
    .context("set termination handler")
}
