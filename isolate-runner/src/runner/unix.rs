// Copyright (c) The gtest-isolate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw OS plumbing for the scheduler: non-blocking pipes, the slot-indexed
//! poll set, and child signal disposition.

use std::{io, os::fd::RawFd, os::unix::process::CommandExt, process::Command};

/// Marks the read end of a pipe non-blocking.
pub(super) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is an open descriptor owned by the caller.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Restores default SIGINT/SIGQUIT dispositions in the child, between fork
/// and exec.
pub(super) fn reset_child_signals(cmd: &mut Command) {
    // SAFETY: signal(2) is async-signal-safe, and the closure touches
    // nothing else.
    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            Ok(())
        });
    }
}

/// A fixed-width poll set with one entry per worker slot.
///
/// The slot index doubles as the poll-set index; empty slots hold fd -1,
/// which poll(2) ignores.
#[derive(Debug)]
pub(super) struct PollSet {
    entries: Vec<libc::pollfd>,
}

impl PollSet {
    pub(super) fn new(slots: usize) -> Self {
        Self {
            entries: vec![Self::empty_entry(); slots],
        }
    }

    fn empty_entry() -> libc::pollfd {
        libc::pollfd {
            fd: -1,
            events: 0,
            revents: 0,
        }
    }

    /// Registers a slot's pipe with readable interest.
    pub(super) fn register(&mut self, slot: usize, fd: RawFd) {
        self.entries[slot] = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
    }

    /// Clears a slot's entry.
    pub(super) fn clear(&mut self, slot: usize) {
        self.entries[slot] = Self::empty_entry();
    }

    /// Polls the set with zero timeout, returning how many entries are
    /// ready. Never blocks; interrupted polls are retried.
    pub(super) fn poll(&mut self) -> io::Result<usize> {
        loop {
            // SAFETY: entries points at a live pollfd array of the given
            // length.
            let ready = unsafe {
                libc::poll(
                    self.entries.as_mut_ptr(),
                    self.entries.len() as libc::nfds_t,
                    0,
                )
            };
            if ready >= 0 {
                return Ok(ready as usize);
            }
            let error = io::Error::last_os_error();
            if error.kind() != io::ErrorKind::Interrupted {
                return Err(error);
            }
        }
    }

    /// Whether the given slot's pipe has data to read.
    pub(super) fn is_readable(&self, slot: usize) -> bool {
        self.entries[slot].revents & libc::POLLIN != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Write, os::fd::AsRawFd};

    #[test]
    fn poll_set_tracks_readable_slots() {
        let (reader, mut writer) = io::pipe().expect("pipe should be created");
        set_nonblocking(reader.as_raw_fd()).expect("fcntl should succeed");

        let mut poll_set = PollSet::new(4);
        poll_set.register(2, reader.as_raw_fd());
        assert_eq!(poll_set.poll().expect("poll should succeed"), 0);

        writer.write_all(b"ping").expect("write should succeed");
        assert_eq!(poll_set.poll().expect("poll should succeed"), 1);
        assert!(poll_set.is_readable(2));
        assert!(!poll_set.is_readable(0));

        poll_set.clear(2);
        assert_eq!(poll_set.poll().expect("poll should succeed"), 0);
    }
}
