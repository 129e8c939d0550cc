// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Implementation of [`sync_types::SyncTypes`] for hosted environments.
//!
//! Locks are [`parking_lot::Mutex`]es, [`DelayedWork`](sync_types::DelayedWork)
//! is backed by a dedicated timer thread per instance.

use crate::sync_types::{self, DelayedWorkError, DelayedWorkFn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::{convert, marker, sync::Arc, thread, time};

/// [`Lock`](sync_types::SyncTypes::Lock) trait implementation built on
/// [`parking_lot::Mutex`].
pub struct StdLock<T: marker::Send> {
    mtx: Mutex<T>,
}

impl<T: marker::Send> sync_types::Lock<T> for StdLock<T> {
    type Guard<'a>
        = MutexGuard<'a, T>
    where
        T: 'a;

    fn lock(&self) -> Self::Guard<'_> {
        self.mtx.lock()
    }
}

impl<T: marker::Send> sync_types::ConstructibleLock<T> for StdLock<T> {
    fn get_mut(&mut self) -> &mut T {
        self.mtx.get_mut()
    }
}

impl<T: marker::Send> convert::From<T> for StdLock<T> {
    fn from(value: T) -> Self {
        Self { mtx: Mutex::new(value) }
    }
}

struct StdDelayedWorkState {
    /// Expiry deadline and token of the armed timer, if any.
    pending: Option<(time::Instant, u64)>,
    running: bool,
    shutdown: bool,
}

struct StdDelayedWorkShared {
    state: Mutex<StdDelayedWorkState>,
    cond: Condvar,
}

/// [`DelayedWork`](sync_types::SyncTypes::DelayedWork) implementation backed
/// by a timer thread.
///
/// The thread is spawned from [`new()`](sync_types::DelayedWork::new) and
/// sleeps until the next deadline. It gets terminated and joined when the
/// `StdDelayedWork` is dropped.
pub struct StdDelayedWork {
    shared: Arc<StdDelayedWorkShared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl StdDelayedWork {
    fn run_worker(shared: &StdDelayedWorkShared, work: DelayedWorkFn) {
        let mut state = shared.state.lock();
        loop {
            if state.shutdown {
                return;
            }

            match state.pending {
                None => {
                    shared.cond.wait(&mut state);
                }
                Some((deadline, token)) => {
                    if time::Instant::now() < deadline {
                        shared.cond.wait_until(&mut state, deadline);
                        continue;
                    }
                    state.pending = None;
                    state.running = true;
                    MutexGuard::unlocked(&mut state, || work(token));
                    state.running = false;
                    shared.cond.notify_all();
                }
            }
        }
    }

    fn is_worker_thread(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| worker.thread().id() == thread::current().id())
            .unwrap_or(false)
    }
}

impl sync_types::DelayedWork for StdDelayedWork {
    fn new(name: &str, work: DelayedWorkFn) -> Result<Self, DelayedWorkError> {
        let shared = Arc::new(StdDelayedWorkShared {
            state: Mutex::new(StdDelayedWorkState {
                pending: None,
                running: false,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || Self::run_worker(&worker_shared, work))
            .map_err(|_| DelayedWorkError::ResourceExhausted)?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    fn arm(&self, delay: time::Duration, token: u64) {
        let deadline = time::Instant::now()
            .checked_add(delay)
            .unwrap_or_else(|| time::Instant::now() + time::Duration::from_secs(u32::MAX as u64));
        let mut state = self.shared.state.lock();
        state.pending = Some((deadline, token));
        self.shared.cond.notify_all();
    }

    fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.pending = None;
        self.shared.cond.notify_all();
    }

    fn cancel_sync(&self) {
        let mut state = self.shared.state.lock();
        state.pending = None;
        self.shared.cond.notify_all();
        // Invoked from the work function itself, don't wait on ourselves.
        if self.is_worker_thread() {
            return;
        }
        while state.running {
            self.shared.cond.wait(&mut state);
        }
    }
}

impl Drop for StdDelayedWork {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.pending = None;
            self.shared.cond.notify_all();
        }

        if self.is_worker_thread() {
            return;
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// [`SyncTypes`](sync_types::SyncTypes) trait implementation for hosted
/// environments.
pub struct StdSyncTypes {}

impl sync_types::SyncTypes for StdSyncTypes {
    type Lock<T: marker::Send> = StdLock<T>;
    type DelayedWork = StdDelayedWork;
}
