// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Device open/close lifecycle and simulated media changes.
//!
//! A device is either closed, with no open references, or open. Upon the last
//! close, an idle timer gets armed. If it expires before the next open, the
//! media is considered changed and the next first open, or an explicit
//! revalidation, replaces it with a blank one by zeroing the store.
//!
//! Each arming of the idle timer is identified by a fresh token. Opening the
//! device cancels the timer and forgets the token, all under the device lock,
//! so that an expiry racing with the open gets recognized as stale by its token
//! and is ignored.

use crate::{error::RamdiskIoError, store::RamdiskStore, utils_sync::sync_types::DelayedWork};
use std::time;
use tracing::{debug, warn};

const GEOMETRY_HEADS: u8 = 4;
const GEOMETRY_SECTORS: u8 = 16;

/// Synthetic cylinders/heads/sectors disk geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HdGeometry {
    pub cylinders: u64,
    pub heads: u8,
    pub sectors: u8,
    /// Start sector, always zero.
    pub start: u64,
}

impl HdGeometry {
    /// Derive a geometry from the capacity.
    ///
    /// # Arguments:
    ///
    /// * `logical_sector_count` - Capacity in units of
    ///   [`KERNEL_SECTOR_SIZE`](crate::KERNEL_SECTOR_SIZE).
    pub fn from_capacity(logical_sector_count: u64) -> Self {
        Self {
            cylinders: (logical_sector_count & !0x3f) >> 6,
            heads: GEOMETRY_HEADS,
            sectors: GEOMETRY_SECTORS,
            start: 0,
        }
    }
}

/// Lifecycle state of a device, protected by the device lock.
#[derive(Debug, Default)]
pub(crate) struct DeviceLifecycle {
    open_count: u32,
    media_changed: bool,
    /// Token of the pending idle timer expiry, if armed.
    idle_timer_token: Option<u64>,
    next_idle_timer_token: u64,
    consistency_warnings: u64,
}

impl DeviceLifecycle {
    pub(crate) fn open_count(&self) -> u32 {
        self.open_count
    }

    pub(crate) fn media_changed(&self) -> bool {
        self.media_changed
    }

    pub(crate) fn consistency_warnings(&self) -> u64 {
        self.consistency_warnings
    }

    pub(crate) fn is_idle_timer_armed(&self) -> bool {
        self.idle_timer_token.is_some()
    }

    /// Take an open reference.
    ///
    /// Cancels a pending idle timer expiry. On the first open, a changed media
    /// gets [revalidated](Self::revalidate).
    pub(crate) fn open<DW: DelayedWork>(
        &mut self,
        store: Option<&mut RamdiskStore>,
        idle_timer: &DW,
        device_name: &str,
    ) {
        if self.idle_timer_token.take().is_some() {
            idle_timer.cancel();
            debug!(device = device_name, "idle timer cancelled");
        }
        if self.open_count == 0 {
            self.revalidate(store, device_name);
        }
        self.open_count += 1;
        debug!(device = device_name, open_count = self.open_count, "open");
    }

    /// Drop an open reference.
    ///
    /// Arms the idle timer when the last reference is gone.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskIoError::NotOpen`] - There is no open reference.
    pub(crate) fn close<DW: DelayedWork>(
        &mut self,
        idle_timer: &DW,
        idle_delay: time::Duration,
        device_name: &str,
    ) -> Result<(), RamdiskIoError> {
        if self.open_count == 0 {
            warn!(device = device_name, "close without matching open");
            return Err(RamdiskIoError::NotOpen);
        }
        self.open_count -= 1;
        debug!(device = device_name, open_count = self.open_count, "close");

        if self.open_count == 0 {
            let token = self.next_idle_timer_token;
            self.next_idle_timer_token = self.next_idle_timer_token.wrapping_add(1);
            self.idle_timer_token = Some(token);
            idle_timer.arm(idle_delay, token);
            debug!(device = device_name, token, delay = ?idle_delay, "idle timer armed");
        }
        Ok(())
    }

    /// Handle an idle timer expiry.
    ///
    /// Expiries whose `token` doesn't match the pending one are stale and get
    /// ignored.
    pub(crate) fn idle_timeout(&mut self, token: u64, store_present: bool, device_name: &str) {
        if self.idle_timer_token != Some(token) {
            debug!(device = device_name, token, "stale idle timer expiry ignored");
            return;
        }
        self.idle_timer_token = None;

        if self.open_count != 0 || !store_present {
            self.consistency_warnings += 1;
            warn!(
                device = device_name,
                open_count = self.open_count,
                store_present,
                "idle timer sanity check failed"
            );
            return;
        }
        self.media_changed = true;
        debug!(device = device_name, "media changed");
    }

    /// Replace a changed media with a blank one.
    ///
    /// Zeroes the whole store and clears the media changed state, if set.
    /// Otherwise this is a no-op.
    pub(crate) fn revalidate(&mut self, store: Option<&mut RamdiskStore>, device_name: &str) {
        if !self.media_changed {
            return;
        }
        self.media_changed = false;
        if let Some(store) = store {
            store.clear();
        }
        debug!(device = device_name, "media revalidated");
    }

    /// Cancel the idle timer at teardown.
    ///
    /// The pending token is retained, an expiry already in progress still
    /// matches it and finds the store gone.
    pub(crate) fn cancel_idle_timer<DW: DelayedWork>(&self, idle_timer: &DW) {
        idle_timer.cancel();
    }
}
