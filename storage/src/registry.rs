// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Implementation of [`RamdiskRegistry`].

use crate::{
    config::{RamdiskConfig, RamdiskDeviceConfig},
    crypto::symcipher::SymBlockCipher,
    device::RamdiskDevice,
    error::{RamdiskIoError, RamdiskSetupError},
    lifecycle::HdGeometry,
    request::{IoCompletion, IoDirection, IoRequest},
    utils_sync::sync_types::SyncTypes,
};
use std::{fmt, sync::Arc};
use tracing::info;

/// Index of a device in a [`RamdiskRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed set of [`RamdiskDevice`]s.
///
/// Devices are created all at once and torn down all at once, at
/// [`shutdown()`](Self::shutdown) or when the registry gets dropped. A device
/// which failed to get set up leaves its slot unpublished, without affecting
/// the others.
pub struct RamdiskRegistry<ST: SyncTypes> {
    devices: Vec<Option<RamdiskDevice<ST>>>,
    setup_failures: Vec<(DeviceId, RamdiskSetupError)>,
}

impl<ST: SyncTypes> RamdiskRegistry<ST> {
    /// Create a registry from a [`RamdiskConfig`].
    ///
    /// # Errors:
    ///
    /// * [`RamdiskSetupError::InvalidConfig`] - The `config` is inconsistent.
    /// * [`RamdiskSetupError::Cipher`] - The configured key has been rejected.
    ///
    /// Failures to set up individual devices are not reported here, but
    /// through [`setup_failures()`](Self::setup_failures).
    pub fn new(config: &RamdiskConfig) -> Result<Self, RamdiskSetupError> {
        config.validate()?;
        let cipher = config.instantiate_cipher()?;
        Ok(Self::with_device_configs(cipher, &config.device_configs()))
    }

    /// Create a registry with individually configured devices.
    ///
    /// # Arguments:
    ///
    /// * `cipher` - The block cipher shared among all devices, `None` to
    ///   disable encryption.
    /// * `device_configs` - Configuration for each device, in order.
    pub fn with_device_configs(cipher: Option<Arc<SymBlockCipher>>, device_configs: &[RamdiskDeviceConfig]) -> Self {
        let mut devices = Vec::with_capacity(device_configs.len());
        let mut setup_failures = Vec::new();
        for (index, device_config) in device_configs.iter().enumerate() {
            match RamdiskDevice::new(index, *device_config, cipher.clone()) {
                Ok(device) => devices.push(Some(device)),
                Err(e) => {
                    info!(device_id = index, error = %e, "device setup failed, not published");
                    setup_failures.push((DeviceId(index), e));
                    devices.push(None);
                }
            }
        }

        Self {
            devices,
            setup_failures,
        }
    }

    /// Number of device slots, including unpublished ones.
    pub fn devices_count(&self) -> usize {
        self.devices.len()
    }

    /// Iterate over the published devices.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &RamdiskDevice<ST>)> {
        self.devices
            .iter()
            .enumerate()
            .filter_map(|(index, device)| device.as_ref().map(|device| (DeviceId(index), device)))
    }

    /// Failures encountered while setting up individual devices.
    pub fn setup_failures(&self) -> &[(DeviceId, RamdiskSetupError)] {
        &self.setup_failures
    }

    /// Lookup a published device.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskIoError::NoSuchDevice`] - There's no published device
    ///   `device_id`.
    pub fn device(&self, device_id: DeviceId) -> Result<&RamdiskDevice<ST>, RamdiskIoError> {
        self.devices
            .get(device_id.0)
            .and_then(|device| device.as_ref())
            .ok_or(RamdiskIoError::NoSuchDevice)
    }

    pub fn open(&self, device_id: DeviceId) -> Result<(), RamdiskIoError> {
        self.device(device_id)?.open();
        Ok(())
    }

    pub fn close(&self, device_id: DeviceId) -> Result<(), RamdiskIoError> {
        self.device(device_id)?.close()
    }

    pub fn get_geometry(&self, device_id: DeviceId) -> Result<HdGeometry, RamdiskIoError> {
        Ok(self.device(device_id)?.geometry())
    }

    pub fn get_media_changed(&self, device_id: DeviceId) -> Result<bool, RamdiskIoError> {
        Ok(self.device(device_id)?.media_changed())
    }

    pub fn revalidate(&self, device_id: DeviceId) -> Result<(), RamdiskIoError> {
        self.device(device_id)?.revalidate();
        Ok(())
    }

    /// Capacity in units of the device's sectors.
    pub fn get_capacity(&self, device_id: DeviceId) -> Result<u64, RamdiskIoError> {
        Ok(self.device(device_id)?.capacity_sectors())
    }

    /// Submit a single segment request to a device.
    ///
    /// A request for an unpublished device completes with
    /// [`RamdiskIoError::NoSuchDevice`].
    pub fn submit(
        &self,
        device_id: DeviceId,
        sector: u64,
        sectors: u64,
        buffer: Vec<u8>,
        direction: IoDirection,
    ) -> IoCompletion {
        match self.device(device_id) {
            Ok(device) => device.submit(sector, sectors, buffer, direction),
            Err(e) => IoRequest::new(0, direction, sector, buffer).complete(Err(e)),
        }
    }

    /// Submit a batch of requests to a device.
    pub fn submit_requests<I: IntoIterator<Item = IoRequest>>(
        &self,
        device_id: DeviceId,
        requests: I,
    ) -> Vec<IoCompletion> {
        match self.device(device_id) {
            Ok(device) => device.submit_requests(requests),
            Err(e) => requests.into_iter().map(|request| request.complete(Err(e))).collect(),
        }
    }

    /// Tear all devices down.
    ///
    /// Returns the completions of requests failed because they were still
    /// queued.
    pub fn shutdown(&mut self) -> Vec<IoCompletion> {
        let mut completions = Vec::new();
        for device in self.devices.iter().flatten() {
            completions.extend(device.shutdown());
        }
        completions
    }
}

impl<ST: SyncTypes> Drop for RamdiskRegistry<ST> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
