// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Lock and deferred work abstraction traits.
//!
//! # Execution environment agnostic sync type abstractions
//!
//! The exact semantics of locks and timers depend on the execution
//! environment the ramdisk gets embedded into. It could be anything from a
//! spinlock plus a hardware timer callback up to a `std` mutex plus a timer
//! thread. The ramdisk code is generic over the abstraction traits defined
//! here, [`ConstructibleLock`] and [`DelayedWork`], which are grouped together
//! as associated types of the [`SyncTypes`] trait expected to get implemented
//! for a target execution environment.

use core::{convert, fmt, marker, ops, time};

/// Execution environment agnostic lock abstraction.
///
/// Users of the `Lock` must not acquire any other lock of the same
/// [`SyncTypes`] while holding it, except for the internal state of a
/// [`DelayedWork`] as accessed by [`DelayedWork::arm()`] and
/// [`DelayedWork::cancel()`].
pub trait Lock<T: ?Sized>: marker::Send + marker::Sync {
    /// Lock guard type returned by [`lock()`](Self::lock).
    type Guard<'a>: ops::Deref<Target = T> + ops::DerefMut
    where
        Self: 'a;

    /// Lock the lock.
    fn lock(&self) -> Self::Guard<'_>;
}

/// Constructible [`Lock`].
///
/// The [`ConstructibleLock`] trait is implemented by [`Lock`] types which are
/// constructible by wrapping a value.
pub trait ConstructibleLock<T>: Lock<T> + convert::From<T> {
    /// Access the wrapped value.
    ///
    /// Access the wrapped value through a mutable reference on `Self` without
    /// going through a locking operation. Note that the existence of the
    /// `mut` reference on `Self` implies that it cannot have been locked
    /// concurrently and that access is exclusive.
    fn get_mut(&mut self) -> &mut T;
}

/// Work function invoked by a [`DelayedWork`] upon expiry.
///
/// Receives the token passed to the [`arm()`](DelayedWork::arm) whose expiry
/// triggered the invocation.
pub type DelayedWorkFn = Box<dyn Fn(u64) + marker::Send + marker::Sync + 'static>;

/// Error returned by [`DelayedWork::new()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayedWorkError {
    /// The execution environment could not provide the timer resources.
    ResourceExhausted,
}

impl fmt::Display for DelayedWorkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceExhausted => f.write_str("delayed work resources exhausted"),
        }
    }
}

/// Re-armable one-shot timer running a fixed work function upon expiry.
///
/// At most one expiry is pending at any time: re-arming replaces any pending
/// expiry. The work function runs on an execution context independent of the
/// one arming the timer and must synchronize by itself with concurrent
/// [`arm()`](Self::arm) or [`cancel()`](Self::cancel) invocations, if needed.
/// An expiry racing with a `cancel()` may still invoke the work function, users
/// distinguish such stale expiries by the token.
pub trait DelayedWork: marker::Send + marker::Sync + Sized {
    /// Instantiate a new, disarmed `DelayedWork`.
    ///
    /// # Arguments:
    ///
    /// * `name` - Name for diagnostic purposes.
    /// * `work` - The work function to invoke upon expiry.
    ///
    /// # Errors:
    ///
    /// * [`DelayedWorkError::ResourceExhausted`] - The timer resources could
    ///   not be acquired.
    fn new(name: &str, work: DelayedWorkFn) -> Result<Self, DelayedWorkError>;

    /// (Re-)arm the timer.
    ///
    /// Must not block, may get invoked with a [`Lock`] held.
    ///
    /// # Arguments:
    ///
    /// * `delay` - Time from now until expiry.
    /// * `token` - Value to pass to the work function upon expiry.
    fn arm(&self, delay: time::Duration, token: u64);

    /// Disarm the timer.
    ///
    /// Must not block, may get invoked with a [`Lock`] held. A concurrently
    /// running work function invocation is not waited for.
    fn cancel(&self);

    /// Disarm the timer and wait for any running work function invocation to
    /// complete.
    ///
    /// Must not get invoked with any lock held that the work function might
    /// acquire.
    fn cancel_sync(&self);
}

/// Collection of execution environment specific sync types.
pub trait SyncTypes: marker::Send + marker::Sync + 'static {
    /// The [`ConstructibleLock`] type.
    type Lock<T: marker::Send>: ConstructibleLock<T>;
    /// The [`DelayedWork`] type.
    type DelayedWork: DelayedWork;
}
