// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::log::cache_log;
use crate::session::SessionManager;
use crate::source::RoaSource;
use crate::store::Snapshot;
use crate::{IO_TIMEOUT, MOD_REFRESH};
use rtr_common::thread::ManagedThread;
use slog::Logger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time between reloads of the ROA source.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60);

/// Periodically reloads a ROA source into the session. The background thread
/// stops when the `Refresher` is dropped.
pub struct Refresher {
    _thread: ManagedThread,
}

impl Refresher {
    /// Start refreshing. The first load happens immediately.
    pub fn start<S: RoaSource>(
        source: S,
        session: Arc<SessionManager>,
        interval: Duration,
        log: Logger,
    ) -> Result<Self, Error> {
        cache_log!(log, MOD_REFRESH, info,
            "refreshing from {} every {}",
            source.name(),
            humantime::format_duration(interval)
        );
        let thread = ManagedThread::spawn("rtr-refresh", move |stop| {
            refresh_loop(&source, &session, interval, &stop, &log)
        })?;
        Ok(Self { _thread: thread })
    }
}

fn refresh_loop<S: RoaSource>(
    source: &S,
    session: &SessionManager,
    interval: Duration,
    stop: &AtomicBool,
    log: &Logger,
) {
    while !stop.load(Ordering::Relaxed) {
        refresh_once(source, session, log);

        let deadline = Instant::now() + interval;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(IO_TIMEOUT.min(deadline - now));
        }
    }
    cache_log!(log, MOD_REFRESH, info, "refresher stopped");
}

/// Load the source once and ingest the result. On failure the current
/// snapshot stays in place.
pub fn refresh_once<S: RoaSource>(
    source: &S,
    session: &SessionManager,
    log: &Logger,
) -> Option<Arc<Snapshot>> {
    let started = Instant::now();
    match source.load() {
        Ok(roas) => {
            let snapshot = session.ingest(roas);
            cache_log!(log, MOD_REFRESH, info,
                "loaded {} roas from {}", snapshot.len(), source.name();
                "serial" => snapshot.generation(),
                "elapsed_ms" => started.elapsed().as_millis() as u64
            );
            Some(snapshot)
        }
        Err(e) => {
            cache_log!(log, MOD_REFRESH, warn,
                "failed to load roas from {}: {e}", source.name();
                "serial" => session.current_serial().map(|s| s.to_string())
                    .unwrap_or_else(|| "none".into())
            );
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::Timers;
    use crate::store::SnapshotStore;
    use crate::types::Roa;
    use rtr_common::log::discard_logger;
    use std::sync::Mutex;

    /// Hands out scripted results in order, repeating the last one.
    struct Scripted {
        results: Mutex<Vec<Result<Vec<Roa>, Error>>>,
    }

    impl RoaSource for Scripted {
        fn name(&self) -> String {
            "scripted".into()
        }

        fn load(&self) -> Result<Vec<Roa>, Error> {
            let mut results = self.results.lock().expect("lock");
            if results.len() > 1 {
                results.remove(0)
            } else {
                match results.first() {
                    Some(Ok(v)) => Ok(v.clone()),
                    _ => Err(Error::Config("exhausted".into())),
                }
            }
        }
    }

    fn session() -> Arc<SessionManager> {
        let store = Arc::new(SnapshotStore::new(4, 1, discard_logger()));
        Arc::new(SessionManager::new(
            1,
            Timers::default(),
            store,
            discard_logger(),
        ))
    }

    fn roa(asn: u32) -> Roa {
        Roa::new("10.0.0.0/8".parse().expect("prefix"), 8, asn).expect("roa")
    }

    #[test]
    fn failed_load_keeps_snapshot() {
        let session = session();
        let source = Scripted {
            results: Mutex::new(vec![
                Ok(vec![roa(1)]),
                Err(Error::Config("unreachable".into())),
                Ok(vec![roa(2)]),
            ]),
        };
        let log = discard_logger();

        let s = refresh_once(&source, &session, &log).expect("first");
        assert_eq!(s.generation(), 1);

        assert!(refresh_once(&source, &session, &log).is_none());
        assert_eq!(session.current_serial(), Some(1));
        assert_eq!(
            session.current().expect("current").roas().iter().next(),
            Some(&roa(1))
        );

        let s = refresh_once(&source, &session, &log).expect("third");
        assert_eq!(s.generation(), 2);
    }

    #[test]
    fn refresher_loads_until_dropped() {
        let session = session();
        let source = Scripted {
            results: Mutex::new(vec![Ok(vec![roa(1)])]),
        };
        let r = Refresher::start(
            source,
            session.clone(),
            Duration::from_millis(20),
            discard_logger(),
        )
        .expect("start");

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.current_serial().unwrap_or(0) < 3 {
            assert!(Instant::now() < deadline, "refresher did not run");
            std::thread::sleep(Duration::from_millis(10));
        }
        drop(r);
        let serial = session.current_serial();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(session.current_serial(), serial);
    }
}
