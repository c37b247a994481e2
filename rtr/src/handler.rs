// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-connection protocol state machine.
//!
//! A handler owns one router connection. It waits for the router's queries,
//! answers them from the session's current snapshot, and tells the router
//! about new serials once it has completed a sync. All of its input arrives
//! as `HandlerEvent`s on a single channel fed by the connection's receive
//! loop and the session manager.

use crate::connection::RtrConnection;
use crate::error::Error;
use crate::log::handler_log;
use crate::messages::{
    EndOfData, ErrorCode, ErrorReport, Message, Pdu, PduType, PrefixPdu,
    ProtocolVersion, SerialPdu,
};
use crate::session::SessionManager;
use crate::store::{Delta, Snapshot};
use crate::IO_TIMEOUT;
use slog::Logger;
use std::fmt::{self, Display, Formatter};
use std::iter::once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Most of an offending pdu that is echoed back in an Error Report.
pub const MAX_ENCAPSULATED_PDU: usize = 4096;

#[derive(Debug)]
pub enum HandlerEvent {
    /// A well formed pdu from the router.
    Message(Message),

    /// Bytes from the router that could not be decoded.
    Malformed { error: Error, raw: Vec<u8> },

    /// The session has published a snapshot with this serial.
    Notify(u32),

    /// The router closed the connection.
    Disconnected,

    ReadError(std::io::Error),
}

#[derive(Debug)]
pub enum SyncMode {
    /// Send every ROA of this snapshot.
    Full(Arc<Snapshot>),

    /// Send the withdrawals and announcements of this delta.
    Incremental(Delta),
}

#[derive(Debug)]
pub enum HandlerState {
    /// Connected, nothing sent yet. Waiting for a Reset Query or Serial
    /// Query.
    ///
    /// Basic Transitions:
    /// - Reset Query -> Synchronizing(Full)
    /// - Serial Query with a usable delta -> Synchronizing(Incremental)
    /// - protocol violation, disconnect -> Closed
    AwaitRequest,

    /// Streaming a response. Always followed by Idle unless a write fails.
    Synchronizing(SyncMode),

    /// The router has the data of some serial. New serials are announced
    /// with Serial Notify, and further queries are answered as in
    /// AwaitRequest.
    Idle,

    Closed,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HandlerStateKind {
    AwaitRequest,
    Synchronizing,
    Idle,
    Closed,
}

impl Display for HandlerStateKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            HandlerStateKind::AwaitRequest => write!(f, "await request"),
            HandlerStateKind::Synchronizing => write!(f, "synchronizing"),
            HandlerStateKind::Idle => write!(f, "idle"),
            HandlerStateKind::Closed => write!(f, "closed"),
        }
    }
}

impl From<&HandlerState> for HandlerStateKind {
    fn from(s: &HandlerState) -> HandlerStateKind {
        match s {
            HandlerState::AwaitRequest => HandlerStateKind::AwaitRequest,
            HandlerState::Synchronizing(_) => HandlerStateKind::Synchronizing,
            HandlerState::Idle => HandlerStateKind::Idle,
            HandlerState::Closed => HandlerStateKind::Closed,
        }
    }
}

impl Display for HandlerState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let kind: HandlerStateKind = self.into();
        write!(f, "{}", kind)
    }
}

pub struct Handler<Cnx: RtrConnection> {
    conn: Cnx,
    session: Arc<SessionManager>,
    event_rx: Receiver<HandlerEvent>,

    /// Fixed by the first pdu the router sends.
    version: Option<ProtocolVersion>,

    /// The last serial this router was told about, by End of Data or Serial
    /// Notify.
    last_serial: Option<u32>,

    idle_timeout: Option<Duration>,
    last_heard: Instant,
    shutdown: Arc<AtomicBool>,
    log: Logger,
}

impl<Cnx: RtrConnection> Handler<Cnx> {
    pub fn new(
        conn: Cnx,
        session: Arc<SessionManager>,
        event_rx: Receiver<HandlerEvent>,
        idle_timeout: Option<Duration>,
        shutdown: Arc<AtomicBool>,
        log: Logger,
    ) -> Self {
        Self {
            conn,
            session,
            event_rx,
            version: None,
            last_serial: None,
            idle_timeout,
            last_heard: Instant::now(),
            shutdown,
            log,
        }
    }

    /// Drive the connection until it closes.
    pub fn run(mut self) {
        handler_log!(self, info, "starting connection handler");
        let mut current = HandlerState::AwaitRequest;
        loop {
            let current_state: HandlerStateKind = (&current).into();
            current = match current {
                HandlerState::AwaitRequest => self.on_waiting(false),
                HandlerState::Synchronizing(mode) => {
                    self.on_synchronizing(mode)
                }
                HandlerState::Idle => self.on_waiting(true),
                HandlerState::Closed => break,
            };
            let next_state: HandlerStateKind = (&current).into();
            if current_state != next_state {
                handler_log!(self, info,
                    "{} -> {}", current_state, next_state;
                    "from" => current_state.to_string(),
                    "to" => next_state.to_string()
                );
            }
        }
        self.conn.close();
        handler_log!(self, info, "connection handler exited");
    }

    fn version_str(&self) -> &'static str {
        match self.version {
            Some(ProtocolVersion::V0) => "0",
            Some(ProtocolVersion::V1) => "1",
            None => "none",
        }
    }

    /// The version to answer in. Before the router has said anything this is
    /// the latest version we speak.
    fn reply_version(&self) -> ProtocolVersion {
        self.version.unwrap_or(ProtocolVersion::LATEST)
    }

    /// The state to return to after a request that leaves the router where it
    /// was.
    fn resting(synced: bool) -> HandlerState {
        if synced {
            HandlerState::Idle
        } else {
            HandlerState::AwaitRequest
        }
    }

    /// Wait for something to do in AwaitRequest (`synced == false`) or Idle.
    fn on_waiting(&mut self, synced: bool) -> HandlerState {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                handler_log!(self, info, "shutting down");
                return HandlerState::Closed;
            }

            let event = match self.event_rx.recv_timeout(IO_TIMEOUT) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    if self.idle_expired() {
                        return HandlerState::Closed;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    handler_log!(self, warn, "event channel closed");
                    return HandlerState::Closed;
                }
            };

            match event {
                HandlerEvent::Message(msg) => {
                    self.last_heard = Instant::now();
                    return self.on_request(msg, synced);
                }
                HandlerEvent::Malformed { error, raw } => {
                    self.last_heard = Instant::now();
                    return self.on_malformed(error, raw);
                }
                HandlerEvent::Notify(serial) => {
                    if !synced {
                        handler_log!(self, trace,
                            "ignoring notify of serial {serial} before sync"
                        );
                        continue;
                    }
                    if self.last_serial == Some(serial) {
                        continue;
                    }
                    if let Err(e) = self.send_notify(serial) {
                        handler_log!(self, warn,
                            "failed to send serial notify: {e}";
                            "serial" => serial
                        );
                        return HandlerState::Closed;
                    }
                }
                HandlerEvent::Disconnected => {
                    handler_log!(self, info, "router disconnected");
                    return HandlerState::Closed;
                }
                HandlerEvent::ReadError(e) => {
                    handler_log!(self, warn, "read error: {e}");
                    return HandlerState::Closed;
                }
            }
        }
    }

    fn idle_expired(&self) -> bool {
        match self.idle_timeout {
            Some(t) if self.last_heard.elapsed() > t => {
                handler_log!(self, info,
                    "nothing heard from router in {}",
                    humantime::format_duration(t)
                );
                true
            }
            _ => false,
        }
    }

    fn on_request(&mut self, msg: Message, synced: bool) -> HandlerState {
        handler_log!(self, debug, "received {}", msg.pdu.title());

        // An Error Report is never answered, whatever version it came in.
        if let Pdu::ErrorReport(report) = &msg.pdu {
            handler_log!(self, warn,
                "router sent error report: {}", report.code;
                "code" => u16::from(report.code),
                "text" => report.text.clone(),
                "received_version" => u8::from(msg.version)
            );
            return HandlerState::Closed;
        }

        match self.version {
            None => {
                self.version = Some(msg.version);
                handler_log!(self, info,
                    "using protocol version {}", msg.version
                );
            }
            Some(v) if v != msg.version => {
                let error = Error::UnexpectedVersion {
                    expected: v.into(),
                    got: msg.version.into(),
                };
                handler_log!(self, warn, "{error}");
                let raw = msg.to_wire().unwrap_or_default();
                self.send_error(
                    ErrorCode::UnexpectedProtocolVersion,
                    &raw,
                    error.to_string(),
                );
                return HandlerState::Closed;
            }
            Some(_) => {}
        }

        match &msg.pdu {
            Pdu::ResetQuery => match self.session.current() {
                Some(snapshot) => {
                    HandlerState::Synchronizing(SyncMode::Full(snapshot))
                }
                None => {
                    self.no_data(&msg);
                    Self::resting(synced)
                }
            },
            Pdu::SerialQuery(q) => self.on_serial_query(&msg, *q, synced),
            other => {
                let text = format!("{} is not a request", other.title());
                handler_log!(self, warn, "{text}");
                let raw = msg.to_wire().unwrap_or_default();
                self.send_error(ErrorCode::InvalidRequest, &raw, text);
                HandlerState::Closed
            }
        }
    }

    fn on_serial_query(
        &mut self,
        msg: &Message,
        q: SerialPdu,
        synced: bool,
    ) -> HandlerState {
        let session_id = self.session.session_id();
        if q.session_id != session_id {
            handler_log!(self, info,
                "serial query for session {}, ours is {session_id}: \
                 cache reset",
                q.session_id;
                "serial" => q.serial
            );
            return self.cache_reset(synced);
        }

        if self.session.current().is_none() {
            self.no_data(msg);
            return Self::resting(synced);
        }

        match self.session.delta_since(q.serial) {
            Some(delta) => {
                HandlerState::Synchronizing(SyncMode::Incremental(delta))
            }
            None => {
                handler_log!(self, info,
                    "serial {} not in history: cache reset", q.serial;
                    "serial" => q.serial
                );
                self.cache_reset(synced)
            }
        }
    }

    fn on_synchronizing(&mut self, mode: SyncMode) -> HandlerState {
        let result = match mode {
            SyncMode::Full(snapshot) => self.full_sync(&snapshot),
            SyncMode::Incremental(delta) => self.incremental_sync(&delta),
        };
        match result {
            Ok(serial) => {
                self.last_serial = Some(serial);
                HandlerState::Idle
            }
            Err(e) => {
                handler_log!(self, warn, "sync failed: {e}");
                HandlerState::Closed
            }
        }
    }

    fn full_sync(&self, snapshot: &Snapshot) -> Result<u32, Error> {
        let v = self.reply_version();
        let session_id = self.session.session_id();
        let serial = snapshot.generation();
        handler_log!(self, info,
            "full sync of {} roas at serial {serial}", snapshot.len();
            "serial" => serial,
            "roas" => snapshot.len()
        );
        let eod = EndOfData::new(v, session_id, serial, self.session.timers());
        let msgs = once(Message::new(v, Pdu::CacheResponse { session_id }))
            .chain(
                snapshot
                    .roas()
                    .iter()
                    .map(|roa| Message::new(v, PrefixPdu::announce(*roa))),
            )
            .chain(once(Message::new(v, eod)));
        self.conn.send_all(msgs)?;
        Ok(serial)
    }

    fn incremental_sync(&self, delta: &Delta) -> Result<u32, Error> {
        let v = self.reply_version();
        let session_id = self.session.session_id();
        let serial = delta.to_generation;
        handler_log!(self, info,
            "incremental sync from serial {} to {serial}",
            delta.from_generation;
            "serial" => serial,
            "announce" => delta.added.len(),
            "withdraw" => delta.removed.len()
        );
        let eod = EndOfData::new(v, session_id, serial, self.session.timers());
        let withdrawals = delta
            .removed
            .iter()
            .map(|roa| Message::new(v, PrefixPdu::withdraw(*roa)));
        let announcements = delta
            .added
            .iter()
            .map(|roa| Message::new(v, PrefixPdu::announce(*roa)));
        let msgs = once(Message::new(v, Pdu::CacheResponse { session_id }))
            .chain(withdrawals)
            .chain(announcements)
            .chain(once(Message::new(v, eod)));
        self.conn.send_all(msgs)?;
        Ok(serial)
    }

    fn cache_reset(&self, synced: bool) -> HandlerState {
        let msg = Message::new(self.reply_version(), Pdu::CacheReset);
        match self.conn.send(&msg) {
            Ok(()) => Self::resting(synced),
            Err(e) => {
                handler_log!(self, warn, "failed to send cache reset: {e}");
                HandlerState::Closed
            }
        }
    }

    fn send_notify(&mut self, serial: u32) -> Result<(), Error> {
        let session_id = self.session.session_id();
        let msg = Message::new(
            self.reply_version(),
            Pdu::SerialNotify(SerialPdu { session_id, serial }),
        );
        self.conn.send(&msg)?;
        handler_log!(self, debug, "notified router of serial {serial}";
            "serial" => serial
        );
        self.last_serial = Some(serial);
        Ok(())
    }

    fn no_data(&self, msg: &Message) {
        handler_log!(self, info,
            "no snapshot loaded, cannot answer {}", msg.pdu.title()
        );
        let raw = msg.to_wire().unwrap_or_default();
        self.send_error(
            ErrorCode::NoDataAvailable,
            &raw,
            Error::SnapshotUnavailable.to_string(),
        );
    }

    fn on_malformed(&mut self, error: Error, raw: Vec<u8>) -> HandlerState {
        handler_log!(self, warn, "bad pdu from router: {error}";
            "bytes" => raw.len()
        );
        // An Error Report is never answered with an Error Report.
        if raw.get(1) == Some(&(PduType::ErrorReport as u8)) {
            return HandlerState::Closed;
        }
        // A router that never got a pdu through is answered in the version
        // its header asked for, if we speak it.
        if self.version.is_none() {
            self.version = raw
                .first()
                .and_then(|v| ProtocolVersion::try_from(*v).ok());
        }
        let code = error.error_code().unwrap_or(ErrorCode::CorruptData);
        self.send_error(code, &raw, error.to_string());
        HandlerState::Closed
    }

    fn send_error(&self, code: ErrorCode, raw: &[u8], text: String) {
        let raw = &raw[..raw.len().min(MAX_ENCAPSULATED_PDU)];
        let msg = Message::new(
            self.reply_version(),
            ErrorReport::new(code, raw, text),
        );
        if let Err(e) = self.conn.send(&msg) {
            handler_log!(self, warn, "failed to send error report: {e}";
                "code" => u16::from(code)
            );
        }
    }
}
