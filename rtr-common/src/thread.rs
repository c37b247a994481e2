// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle handling for long running background threads.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{Builder, JoinHandle},
};

/// A background thread paired with its shutdown flag.
///
/// The thread body receives the flag and is expected to poll it. Dropping the
/// `ManagedThread` raises the flag and joins the thread, so the owner should
/// hold it in exactly one place.
#[derive(Debug)]
pub struct ManagedThread {
    handle: Option<JoinHandle<()>>,
    dropped: Arc<AtomicBool>,
}

impl ManagedThread {
    /// Spawn a named thread running `f`. The closure gets the shutdown flag.
    pub fn spawn<F>(name: impl Into<String>, f: F) -> io::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = dropped.clone();
        let handle = Builder::new().name(name.into()).spawn(move || f(flag))?;
        Ok(Self {
            handle: Some(handle),
            dropped,
        })
    }

    /// Ask the thread to stop without waiting for it.
    pub fn stop(&self) {
        self.dropped.store(true, Ordering::Relaxed);
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
