// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Implementation of [`RamdiskDevice`].

use crate::{
    config::{KERNEL_SECTOR_SIZE, RamdiskDeviceConfig},
    crypto::symcipher::SymBlockCipher,
    dispatch::{DispatchStrategy, RequestQueue},
    error::{RamdiskIoError, RamdiskSetupError},
    lifecycle::{DeviceLifecycle, HdGeometry},
    request::{IoCompletion, IoDirection, IoRequest},
    store::RamdiskStore,
    transfer::TransferEngine,
    utils_sync::sync_types::{DelayedWork, Lock as _, SyncTypes},
};
use std::sync::Arc;
use tracing::info;

/// Diagnostic name of the device at `index`.
pub fn device_name(index: usize) -> String {
    match u8::try_from(index) {
        Ok(index) if index < 26 => format!("cryptrd{}", (b'a' + index) as char),
        _ => format!("cryptrd{}", index),
    }
}

struct RamdiskDeviceState {
    lifecycle: DeviceLifecycle,
    /// `None` after teardown.
    store: Option<RamdiskStore>,
    queue: RequestQueue,
}

struct RamdiskDeviceCore<ST: SyncTypes> {
    name: String,
    index: usize,
    config: RamdiskDeviceConfig,
    capacity_bytes: u64,
    cipher: Option<Arc<SymBlockCipher>>,
    state: ST::Lock<RamdiskDeviceState>,
}

impl<ST: SyncTypes> RamdiskDeviceCore<ST> {
    fn handle_idle_timeout(&self, token: u64) {
        let mut state = self.state.lock();
        let store_present = state.store.is_some();
        state.lifecycle.idle_timeout(token, store_present, &self.name);
    }
}

/// Encrypted ramdisk device instance.
///
/// All operations take `&self` and may get invoked concurrently, they're
/// serialized on the device's lock. In particular, transfers on one device
/// never interleave.
pub struct RamdiskDevice<ST: SyncTypes> {
    core: Arc<RamdiskDeviceCore<ST>>,
    idle_timer: ST::DelayedWork,
}

impl<ST: SyncTypes> RamdiskDevice<ST> {
    /// Create a device.
    ///
    /// Allocates the device's zero-filled store and its idle timer. If either
    /// fails, everything acquired so far gets released again.
    ///
    /// # Arguments:
    ///
    /// * `index` - Index of the device in its registry.
    /// * `config` - The device configuration.
    /// * `cipher` - The block cipher shared among devices, `None` if
    ///   encryption is disabled.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskSetupError::InvalidConfig`] - The `config` is inconsistent.
    /// * [`RamdiskSetupError::AllocationFailure`] - The store or the idle timer
    ///   could not be allocated.
    pub fn new(
        index: usize,
        config: RamdiskDeviceConfig,
        cipher: Option<Arc<SymBlockCipher>>,
    ) -> Result<Self, RamdiskSetupError> {
        config.validate(cipher.as_ref().map(|cipher| cipher.block_size()))?;
        let name = device_name(index);
        let capacity_bytes = config
            .capacity_bytes()
            .ok_or(RamdiskSetupError::InvalidConfig("capacity overflows"))?;

        let store = match RamdiskStore::try_new(capacity_bytes) {
            Ok(store) => store,
            Err(e) => {
                info!(device = %name, capacity_bytes, "store allocation failure");
                return Err(e);
            }
        };

        let core = Arc::new(RamdiskDeviceCore::<ST> {
            name,
            index,
            config,
            capacity_bytes,
            cipher,
            state: RamdiskDeviceState {
                lifecycle: DeviceLifecycle::default(),
                store: Some(store),
                queue: RequestQueue::default(),
            }
            .into(),
        });

        let timer_core = Arc::downgrade(&core);
        let idle_timer = match ST::DelayedWork::new(
            &core.name,
            Box::new(move |token| {
                if let Some(core) = timer_core.upgrade() {
                    core.handle_idle_timeout(token);
                }
            }),
        ) {
            Ok(idle_timer) => idle_timer,
            Err(e) => {
                info!(device = %core.name, error = %e, "idle timer allocation failure");
                return Err(RamdiskSetupError::AllocationFailure);
            }
        };

        info!(
            device = %core.name,
            sector_size = config.sector_size,
            sectors = config.sectors,
            strategy = %config.strategy,
            encrypted = core.cipher.is_some(),
            "device created"
        );
        Ok(Self { core, idle_timer })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn index(&self) -> usize {
        self.core.index
    }

    pub fn config(&self) -> &RamdiskDeviceConfig {
        &self.core.config
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.core.config.strategy
    }

    /// The logical block size reported to the host.
    pub fn sector_size(&self) -> u32 {
        self.core.config.sector_size
    }

    /// Capacity in units of device sectors.
    pub fn capacity_sectors(&self) -> u64 {
        self.core.config.sectors
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.core.capacity_bytes
    }

    /// Capacity in units of [`KERNEL_SECTOR_SIZE`].
    pub fn capacity_kernel_sectors(&self) -> u64 {
        self.core.capacity_bytes / KERNEL_SECTOR_SIZE
    }

    pub fn geometry(&self) -> HdGeometry {
        HdGeometry::from_capacity(self.capacity_kernel_sectors())
    }

    /// Take an open reference.
    ///
    /// Cancels a pending idle timer and revalidates a changed media on first
    /// open.
    pub fn open(&self) {
        let mut state = self.core.state.lock();
        let state = &mut *state;
        state
            .lifecycle
            .open(state.store.as_mut(), &self.idle_timer, &self.core.name);
    }

    /// Drop an open reference.
    ///
    /// Arms the idle timer when the last reference is gone.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskIoError::NotOpen`] - The device is not open.
    pub fn close(&self) -> Result<(), RamdiskIoError> {
        let mut state = self.core.state.lock();
        state
            .lifecycle
            .close(&self.idle_timer, self.core.config.idle_delay, &self.core.name)
    }

    pub fn open_count(&self) -> u32 {
        self.core.state.lock().lifecycle.open_count()
    }

    /// Whether the idle timer has expired since the last close and the media
    /// is considered changed.
    pub fn media_changed(&self) -> bool {
        self.core.state.lock().lifecycle.media_changed()
    }

    /// Zero the store and clear the media changed state, if set.
    pub fn revalidate(&self) {
        let mut state = self.core.state.lock();
        let state = &mut *state;
        state.lifecycle.revalidate(state.store.as_mut(), &self.core.name);
    }

    /// Number of failed idle timer sanity checks.
    pub fn consistency_warnings(&self) -> u64 {
        self.core.state.lock().lifecycle.consistency_warnings()
    }

    pub fn is_idle_timer_armed(&self) -> bool {
        self.core.state.lock().lifecycle.is_idle_timer_armed()
    }

    pub fn idle_timer(&self) -> &ST::DelayedWork {
        &self.idle_timer
    }

    /// Submit a single segment request and wait for its completion.
    ///
    /// # Arguments:
    ///
    /// * `sector` - First device sector.
    /// * `sectors` - Number of sectors, must match the `buffer`'s length.
    /// * `buffer` - Source or destination buffer, returned with the completion.
    /// * `direction` - The transfer direction.
    pub fn submit(&self, sector: u64, sectors: u64, buffer: Vec<u8>, direction: IoDirection) -> IoCompletion {
        let buffer_len = buffer.len() as u64;
        let request = IoRequest::new(0, direction, sector, buffer);
        if sectors.checked_mul(self.sector_size() as u64) != Some(buffer_len) {
            return request.complete(Err(RamdiskIoError::MalformedRequest));
        }

        match self.submit_requests([request]).pop() {
            Some(completion) => completion,
            None => IoCompletion {
                tag: 0,
                segment: None,
                sectors_transferred: 0,
                status: Err(RamdiskIoError::MalformedRequest),
                buffers: Vec::new(),
            },
        }
    }

    /// Submit a batch of requests.
    ///
    /// The requests get dispatched according to the device's
    /// [`DispatchStrategy`]. Returns the completions in the order they've been
    /// signaled.
    pub fn submit_requests<I: IntoIterator<Item = IoRequest>>(&self, requests: I) -> Vec<IoCompletion> {
        let mut completions = Vec::new();
        let mut state = self.core.state.lock();
        let state = &mut *state;
        let mut engine = TransferEngine::new(
            state.store.as_mut(),
            self.core.cipher.as_deref(),
            self.core.config.sector_size,
            &self.core.name,
        );
        self.core
            .config
            .strategy
            .dispatch(&mut state.queue, requests, &mut engine, &mut completions);
        completions
    }

    /// Copy raw bytes from the store, without any decryption.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskIoError::OutOfBounds`] - The range exceeds the store.
    /// * [`RamdiskIoError::NoMedium`] - The store has been released.
    pub fn read_raw(&self, byte_offset: u64, byte_length: u64) -> Result<Vec<u8>, RamdiskIoError> {
        let state = self.core.state.lock();
        let store = state.store.as_ref().ok_or(RamdiskIoError::NoMedium)?;
        let out_of_bounds = RamdiskIoError::OutOfBounds {
            byte_offset,
            byte_length,
            capacity: self.core.capacity_bytes,
        };
        let byte_end = byte_offset.checked_add(byte_length).ok_or(out_of_bounds)?;
        if byte_end > store.len() as u64 {
            return Err(out_of_bounds);
        }
        Ok(store.as_slice()[byte_offset as usize..byte_end as usize].to_vec())
    }

    /// Tear the device down.
    ///
    /// Cancels the idle timer, fails requests still queued with
    /// [`RamdiskIoError::NoMedium`] and releases the store. Requests submitted
    /// afterwards fail with [`RamdiskIoError::NoMedium`] as well.
    pub fn shutdown(&self) -> Vec<IoCompletion> {
        let mut completions = Vec::new();
        let store = {
            let mut state = self.core.state.lock();
            let state = &mut *state;
            state.lifecycle.cancel_idle_timer(&self.idle_timer);
            state.queue.fail_all(RamdiskIoError::NoMedium, &mut completions);
            state.store.take()
        };
        self.idle_timer.cancel_sync();
        if store.is_some() {
            info!(device = %self.core.name, "device torn down");
        }
        drop(store);
        completions
    }

    #[cfg(test)]
    pub(crate) fn release_store(&self) {
        self.core.state.lock().store = None;
    }
}
