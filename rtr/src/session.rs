// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::handler::HandlerEvent;
use crate::log::cache_log;
use crate::messages::Timers;
use crate::store::{Delta, Snapshot, SnapshotStore};
use crate::types::Roa;
use crate::MOD_SESSION;
use rtr_common::{lock, read_lock, write_lock};
use slog::Logger;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, RwLock};

/// The cache instance every connection is served from: one session id for
/// the lifetime of the process, the serial of the latest snapshot, and the
/// set of connection handlers to tell when that serial moves.
pub struct SessionManager {
    session_id: u16,
    timers: Timers,
    store: Arc<SnapshotStore>,
    current_serial: Mutex<Option<u32>>,
    watchers: RwLock<Vec<Watcher>>,
    log: Logger,
}

struct Watcher {
    tag: String,
    sender: Sender<HandlerEvent>,
}

impl SessionManager {
    pub fn new(
        session_id: u16,
        timers: Timers,
        store: Arc<SnapshotStore>,
        log: Logger,
    ) -> Self {
        cache_log!(log, MOD_SESSION, info,
            "session {session_id} created";
            "session_id" => session_id
        );
        Self {
            session_id,
            timers,
            current_serial: Mutex::new(store.current().map(|s| s.generation())),
            store,
            watchers: RwLock::new(Vec::new()),
            log,
        }
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    pub fn timers(&self) -> Timers {
        self.timers
    }

    pub fn current_serial(&self) -> Option<u32> {
        *lock!(self.current_serial)
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.store.current()
    }

    pub fn delta_since(&self, serial: u32) -> Option<Delta> {
        self.store.delta_since(serial)
    }

    /// Install `roas` as the new current snapshot and let every watching
    /// handler know the serial moved.
    pub fn ingest(&self, roas: Vec<Roa>) -> Arc<Snapshot> {
        // The serial lock is held across the replace and the notification so
        // that watchers see serials in publication order.
        let mut serial = lock!(self.current_serial);
        let snapshot = self.store.replace(roas);
        *serial = Some(snapshot.generation());
        self.notify_all(snapshot.generation());
        snapshot
    }

    /// Register a handler to receive `HandlerEvent::Notify`.
    pub fn watch(&self, tag: String, sender: Sender<HandlerEvent>) {
        write_lock!(self.watchers).push(Watcher { tag, sender });
    }

    pub fn watcher_count(&self) -> usize {
        read_lock!(self.watchers).len()
    }

    /// Tell every registered handler that `serial` is now current. Handlers
    /// that have gone away are dropped from the watch list.
    pub fn notify_all(&self, serial: u32) {
        let mut watchers = write_lock!(self.watchers);
        watchers.retain(|Watcher { tag, sender }| {
            match sender.send(HandlerEvent::Notify(serial)) {
                Ok(()) => true,
                Err(_) => {
                    cache_log!(self.log, MOD_SESSION, debug,
                        "dropping watcher '{tag}'";
                        "serial" => serial
                    );
                    false
                }
            }
        });
        cache_log!(self.log, MOD_SESSION, debug,
            "notified {} watchers of serial {serial}", watchers.len();
            "serial" => serial
        );
    }
}

/// Pick a session id for this process. When a state file is given the
/// previous id is read from it, a different one is chosen, and the new one is
/// written back so that the next start differs again.
pub fn load_session_id(
    state_file: Option<&Path>,
    log: &Logger,
) -> Result<u16, Error> {
    let Some(path) = state_file else {
        return Ok(rand::random());
    };

    let previous = match std::fs::read_to_string(path) {
        Ok(s) => match s.trim().parse::<u16>() {
            Ok(id) => Some(id),
            Err(e) => {
                cache_log!(log, MOD_SESSION, warn,
                    "ignoring unparseable session file {}: {e}",
                    path.display()
                );
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let id = next_session_id(previous);
    std::fs::write(path, format!("{id}\n"))?;
    cache_log!(log, MOD_SESSION, info,
        "session id {id} recorded in {}", path.display();
        "previous" => previous.map(|p| p.to_string()).unwrap_or_default()
    );
    Ok(id)
}

/// A random session id that differs from `previous`.
pub fn next_session_id(previous: Option<u16>) -> u16 {
    loop {
        let id: u16 = rand::random();
        if Some(id) != previous {
            return id;
        }
    }
}
