// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::connection::RtrConnectionTcp;
use crate::error::Error;
use crate::handler::Handler;
use crate::log::dispatcher_log;
use crate::session::SessionManager;
use crate::IO_TIMEOUT;
use slog::Logger;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread::Builder;
use std::time::Duration;

/// Accepts router connections and runs a handler thread for each.
pub struct Dispatcher {
    listener: TcpListener,
    listen: SocketAddr,
    session: Arc<SessionManager>,
    idle_timeout: Option<Duration>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    log: Logger,
}

impl Dispatcher {
    /// Bind the listening socket. Failure here is fatal for the daemon.
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        session: Arc<SessionManager>,
        idle_timeout: Option<Duration>,
        log: Logger,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)?;
        Self::new(listener, session, idle_timeout, log)
    }

    pub fn new(
        listener: TcpListener,
        session: Arc<SessionManager>,
        idle_timeout: Option<Duration>,
        log: Logger,
    ) -> Result<Self, Error> {
        listener.set_nonblocking(true)?;
        let listen = listener.local_addr()?;
        Ok(Self {
            listener,
            listen,
            session,
            idle_timeout,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            log,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listen
    }

    /// Number of connections with a running handler.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// The flag `run` and every handler poll. Raising it stops them all.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Accept connections until shut down.
    pub fn run(&self) {
        dispatcher_log!(self, info, "accepting router connections");
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.spawn_handler(stream, peer) {
                        dispatcher_log!(self, error,
                            "failed to start handler for {peer}: {e}"
                        );
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(IO_TIMEOUT);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    dispatcher_log!(self, error, "accept failed: {e}");
                    std::thread::sleep(IO_TIMEOUT);
                }
            }
        }
        dispatcher_log!(self, info, "dispatcher stopped";
            "active" => self.active_connections()
        );
    }

    fn spawn_handler(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), Error> {
        // accepted sockets may inherit the listener's nonblocking mode
        stream.set_nonblocking(false)?;

        let (event_tx, event_rx) = channel();
        let conn = RtrConnectionTcp::accepted(
            stream,
            peer,
            event_tx.clone(),
            self.log.clone(),
        )?;
        self.session.watch(peer.to_string(), event_tx);

        let handler = Handler::new(
            conn,
            self.session.clone(),
            event_rx,
            self.idle_timeout,
            self.shutdown.clone(),
            self.log.clone(),
        );

        let active = self.active.clone();
        active.fetch_add(1, Ordering::Relaxed);
        let spawned = Builder::new()
            .name(format!("rtr-handler-{peer}"))
            .spawn(move || {
                handler.run();
                active.fetch_sub(1, Ordering::Relaxed);
            });
        if let Err(e) = spawned {
            self.active.fetch_sub(1, Ordering::Relaxed);
            return Err(e.into());
        }

        dispatcher_log!(self, info, "accepted connection from {peer}";
            "peer" => peer,
            "active" => self.active_connections()
        );
        Ok(())
    }
}
