// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::handler::HandlerEvent;
use crate::log::connection_log;
use crate::messages::{Header, Message};
use crate::{IO_TIMEOUT, WRITE_TIMEOUT};
use rtr_common::lock;
use slog::Logger;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::Builder;

/// The sending half of a router connection. Received pdus are delivered to
/// the owning handler as `HandlerEvent`s by the implementation.
pub trait RtrConnection: Send + 'static {
    fn send(&self, msg: &Message) -> Result<(), Error>;

    /// Send a sequence of messages, stopping at the first failure.
    fn send_all<I>(&self, msgs: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Message>,
        Self: Sized,
    {
        for msg in msgs {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn peer(&self) -> SocketAddr;

    /// Shut the transport down. Further sends fail.
    fn close(&self);
}

pub struct RtrConnectionTcp {
    peer: SocketAddr,
    conn: Mutex<TcpStream>,
    dropped: Arc<AtomicBool>,
    log: Logger,
}

/// One framed read from the socket.
enum Frame {
    Complete(Vec<u8>),
    /// The header could not be framed, or the stream ended inside a pdu.
    /// Carries what was read.
    Invalid(Error, Vec<u8>),
    Eof,
}

impl RtrConnectionTcp {
    /// Wrap an accepted stream and start its receive loop, which feeds
    /// `event_tx` until the peer goes away or the connection is dropped.
    pub fn accepted(
        stream: TcpStream,
        peer: SocketAddr,
        event_tx: Sender<HandlerEvent>,
        log: Logger,
    ) -> Result<Self, Error> {
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let dropped = Arc::new(AtomicBool::new(false));
        Self::recv(
            peer,
            event_tx,
            stream.try_clone()?,
            dropped.clone(),
            log.clone(),
        )?;
        Ok(Self {
            peer,
            conn: Mutex::new(stream),
            dropped,
            log,
        })
    }

    fn recv(
        peer: SocketAddr,
        event_tx: Sender<HandlerEvent>,
        mut conn: TcpStream,
        dropped: Arc<AtomicBool>,
        log: Logger,
    ) -> Result<(), Error> {
        conn.set_read_timeout(Some(IO_TIMEOUT))?;

        connection_log!(log, peer, debug, "spawning recv loop");

        Builder::new().name(format!("rtr-recv-{peer}")).spawn(move || {
            loop {
                if dropped.load(Ordering::Relaxed) {
                    break;
                }
                let event = match Self::recv_frame(&mut conn, &dropped) {
                    Ok(Frame::Complete(raw)) => {
                        match Message::from_wire(&raw) {
                            Ok(msg) => {
                                connection_log!(log, peer, trace,
                                    "recv: {msg:?}"
                                );
                                HandlerEvent::Message(msg)
                            }
                            Err(error) => {
                                HandlerEvent::Malformed { error, raw }
                            }
                        }
                    }
                    Ok(Frame::Invalid(error, raw)) => {
                        HandlerEvent::Malformed { error, raw }
                    }
                    Ok(Frame::Eof) => HandlerEvent::Disconnected,
                    Err(e) => {
                        if dropped.load(Ordering::Relaxed) {
                            break;
                        }
                        HandlerEvent::ReadError(e)
                    }
                };

                // Framing is lost after a bad pdu, so only a well formed
                // message keeps the loop going.
                let more = matches!(event, HandlerEvent::Message(_));
                if let Err(e) = event_tx.send(event) {
                    connection_log!(log, peer, debug,
                        "handler gone, stopping recv loop: {e}"
                    );
                    break;
                }
                if !more {
                    break;
                }
            }
            connection_log!(log, peer, debug, "recv loop exited");
        })?;

        Ok(())
    }

    fn recv_frame(
        stream: &mut TcpStream,
        dropped: &AtomicBool,
    ) -> std::io::Result<Frame> {
        let mut hbuf = [0u8; Header::WIRE_SIZE];
        let n = Self::read_full(stream, &mut hbuf, dropped)?;
        if n == 0 {
            return Ok(Frame::Eof);
        }
        if n < Header::WIRE_SIZE {
            return Ok(Frame::Invalid(
                Error::MalformedPdu(format!(
                    "stream ended after {n} header bytes"
                )),
                hbuf[..n].to_vec(),
            ));
        }

        let len = match Header::from_wire(&hbuf).and_then(|h| h.pdu_len()) {
            Ok(len) => len,
            Err(e) => return Ok(Frame::Invalid(e, hbuf.to_vec())),
        };

        let mut buf = vec![0u8; len];
        buf[..Header::WIRE_SIZE].copy_from_slice(&hbuf);
        let n =
            Self::read_full(stream, &mut buf[Header::WIRE_SIZE..], dropped)?;
        if n < len - Header::WIRE_SIZE {
            buf.truncate(Header::WIRE_SIZE + n);
            return Ok(Frame::Invalid(
                Error::MalformedPdu(format!(
                    "stream ended {n} bytes into the body of a {len} byte pdu"
                )),
                buf,
            ));
        }
        Ok(Frame::Complete(buf))
    }

    /// Fill `buf`, riding out read timeouts while the connection is alive.
    /// Returns fewer bytes than asked for only at end of stream.
    fn read_full(
        stream: &mut TcpStream,
        buf: &mut [u8],
        dropped: &AtomicBool,
    ) -> std::io::Result<usize> {
        let mut i = 0;
        while i < buf.len() {
            if dropped.load(Ordering::Relaxed) {
                return Err(std::io::Error::new(
                    ErrorKind::Other,
                    "shutting down",
                ));
            }
            match stream.read(&mut buf[i..]) {
                Ok(0) => break,
                Ok(n) => i += n,
                // The read timeout set on the stream is what lets us poll the
                // dropped flag, so these are expected.
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock
                            | ErrorKind::TimedOut
                            | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
        Ok(i)
    }
}

impl RtrConnection for RtrConnectionTcp {
    fn send(&self, msg: &Message) -> Result<(), Error> {
        let buf = msg.to_wire()?;
        connection_log!(self.log, self.peer, trace, "send: {msg:?}");
        let mut stream = lock!(self.conn);
        stream.write_all(&buf)?;
        Ok(())
    }

    fn send_all<I>(&self, msgs: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Message>,
    {
        let stream = lock!(self.conn);
        let mut w = BufWriter::new(&*stream);
        let mut count = 0usize;
        for msg in msgs {
            w.write_all(&msg.to_wire()?)?;
            count += 1;
        }
        w.flush()?;
        connection_log!(self.log, self.peer, trace, "sent {count} pdus");
        Ok(())
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn close(&self) {
        self.dropped.store(true, Ordering::Relaxed);
        if let Err(e) = lock!(self.conn).shutdown(Shutdown::Both) {
            if e.kind() != ErrorKind::NotConnected {
                connection_log!(self.log, self.peer, debug,
                    "shutdown: {e}"
                );
            }
        }
    }
}

impl Drop for RtrConnectionTcp {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::Relaxed);
    }
}
