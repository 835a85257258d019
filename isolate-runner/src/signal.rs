// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for the scheduler loop.
//!
//! The handler itself is async-signal-safe: it stores the received signal
//! number into a process-wide atomic and returns. The scheduler drains the
//! atomic once per tick from the main loop, so at most one signal is
//! observed per tick and nothing else is ever touched from handler context.

use std::{
    io,
    sync::atomic::{AtomicI32, Ordering},
};

static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn store_signal(signal: libc::c_int) {
    PENDING_SIGNAL.store(signal, Ordering::SeqCst);
}

/// A signal observed by the scheduler loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SignalEvent {
    /// SIGINT: terminate all children and exit.
    Interrupt,
    /// SIGQUIT: print the live test inventory and keep running.
    Quit,
}

/// Exchanges-and-clears the pending signal slot.
pub(crate) fn take_signal() -> Option<SignalEvent> {
    match PENDING_SIGNAL.swap(0, Ordering::SeqCst) {
        0 => None,
        libc::SIGINT => Some(SignalEvent::Interrupt),
        libc::SIGQUIT => Some(SignalEvent::Quit),
        _ => None,
    }
}

/// Installs the SIGINT/SIGQUIT handlers; restores the default dispositions
/// on drop.
#[derive(Debug)]
pub(crate) struct SignalHandlerGuard {
    _private: (),
}

impl SignalHandlerGuard {
    pub(crate) fn install() -> io::Result<Self> {
        let handler: extern "C" fn(libc::c_int) = store_signal;
        for signal in [libc::SIGINT, libc::SIGQUIT] {
            // SAFETY: store_signal only touches an atomic, which is
            // async-signal-safe.
            let previous = unsafe { libc::signal(signal, handler as libc::sighandler_t) };
            if previous == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(Self { _private: () })
    }
}

impl Drop for SignalHandlerGuard {
    fn drop(&mut self) {
        for signal in [libc::SIGINT, libc::SIGQUIT] {
            // SAFETY: resetting to the default disposition.
            unsafe { libc::signal(signal, libc::SIG_DFL) };
        }
    }
}
