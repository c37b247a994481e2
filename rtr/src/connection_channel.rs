// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// This file contains code for testing purposes only. Note that it's only
/// included in `lib.rs` with a `#[cfg(test)]` guard. It implements
/// RtrConnection over a channel so that the handler state machine can be
/// driven without sockets: tests push `HandlerEvent`s in and read the
/// messages the handler sent back out of a `ChannelRouter`.
use crate::{
    connection::RtrConnection,
    error::Error,
    messages::{Message, Pdu},
};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    time::Duration,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RtrConnectionChannel {
    peer: SocketAddr,
    tx: Sender<Message>,
    closed: Arc<AtomicBool>,
}

/// The router end of a channel connection.
pub struct ChannelRouter {
    rx: Receiver<Message>,
    closed: Arc<AtomicBool>,
}

impl RtrConnectionChannel {
    pub fn pair(peer: SocketAddr) -> (Self, ChannelRouter) {
        let (tx, rx) = channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                peer,
                tx,
                closed: closed.clone(),
            },
            ChannelRouter { rx, closed },
        )
    }
}

impl RtrConnection for RtrConnectionChannel {
    fn send(&self, msg: &Message) -> Result<(), Error> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::NotConnected);
        }
        self.tx.send(msg.clone()).map_err(|_| Error::Disconnected)
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

impl ChannelRouter {
    /// The next message the handler sent. Panics if none arrives in time.
    pub fn recv(&self) -> Message {
        match self.rx.recv_timeout(RECV_TIMEOUT) {
            Ok(m) => m,
            Err(e) => panic!("no message from handler: {e}"),
        }
    }

    /// Everything up to and including the next End of Data.
    pub fn recv_sync(&self) -> Vec<Message> {
        let mut out = Vec::new();
        loop {
            let m = self.recv();
            let done = matches!(m.pdu, Pdu::EndOfData(_));
            out.push(m);
            if done {
                return out;
            }
        }
    }

    /// Assert the handler sends nothing for `wait`.
    pub fn expect_silence(&self, wait: Duration) {
        match self.rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {}
            Ok(m) => panic!("unexpected message {m:?}"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Wait for the handler to close the connection.
    pub fn wait_closed(&self) {
        let deadline = std::time::Instant::now() + RECV_TIMEOUT;
        while !self.is_closed() {
            assert!(
                std::time::Instant::now() < deadline,
                "handler did not close the connection"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
