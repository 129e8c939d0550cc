// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Ramdisk configuration parameters.

use crate::{
    crypto::symcipher::{SymBlockCipher, SymBlockCipherFamily},
    dispatch::DispatchStrategy,
    error::RamdiskSetupError,
};
use std::{fmt, sync::Arc, time};
use zeroize::Zeroizing;

/// Unit of capacities as reported to a host block layer, independent of the
/// device's sector size.
pub const KERNEL_SECTOR_SIZE: u64 = 512;

pub const DEFAULT_SECTOR_SIZE: u32 = 512;
pub const DEFAULT_SECTORS: u64 = 2048;
pub const DEFAULT_DEVICES: usize = 4;
/// Delay after the last close until the media is considered changed.
pub const DEFAULT_IDLE_DELAY: time::Duration = time::Duration::from_secs(30);

/// Static built-in key, used when none is configured explicitly.
pub const DEFAULT_KEY: &[u8; 32] = b"aasdfaksdfjDLKFJSDLKFJDf91238493";

/// Registry wide configuration.
///
/// Consumed read-only at registry creation.
#[derive(Clone)]
pub struct RamdiskConfig {
    /// Size of a device sector in bytes.
    pub sector_size: u32,
    /// Capacity of each device in units of sectors.
    pub sectors: u64,
    /// Number of devices.
    pub devices: usize,
    /// Raw dispatch strategy selection, c.f.
    /// [`DispatchStrategy::from_request_mode()`].
    pub request_mode: i32,
    /// Whether data is encrypted at rest.
    pub encrypt: bool,
    pub cipher_family: SymBlockCipherFamily,
    pub key: Zeroizing<Vec<u8>>,
    pub idle_delay: time::Duration,
}

impl Default for RamdiskConfig {
    fn default() -> Self {
        Self {
            sector_size: DEFAULT_SECTOR_SIZE,
            sectors: DEFAULT_SECTORS,
            devices: DEFAULT_DEVICES,
            request_mode: DispatchStrategy::Simple.request_mode(),
            encrypt: true,
            cipher_family: SymBlockCipherFamily::Aes,
            key: Zeroizing::new(DEFAULT_KEY.to_vec()),
            idle_delay: DEFAULT_IDLE_DELAY,
        }
    }
}

impl RamdiskConfig {
    /// Check the configuration for consistency.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskSetupError::InvalidConfig`] - Some parameter is out of range
    ///   or inconsistent with the others.
    pub fn validate(&self) -> Result<(), RamdiskSetupError> {
        if self.devices == 0 {
            return Err(RamdiskSetupError::InvalidConfig("device count is zero"));
        }
        let block_size = if self.encrypt {
            Some(self.block_size()?)
        } else {
            None
        };
        self.device_config(DispatchStrategy::Simple).validate(block_size)
    }

    /// Map the raw [`request_mode`](Self::request_mode) to a
    /// [`DispatchStrategy`], falling back to [`DispatchStrategy::Simple`].
    pub fn dispatch_strategy(&self) -> DispatchStrategy {
        DispatchStrategy::from_request_mode(self.request_mode)
    }

    /// Per-device configurations, uniform for all [`devices`](Self::devices).
    pub fn device_configs(&self) -> Vec<RamdiskDeviceConfig> {
        let strategy = self.dispatch_strategy();
        (0..self.devices).map(|_| self.device_config(strategy)).collect()
    }

    /// Instantiate the block cipher shared by all devices.
    ///
    /// Returns `None` if encryption is disabled.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskSetupError::Cipher`] - The key has been rejected.
    pub fn instantiate_cipher(&self) -> Result<Option<Arc<SymBlockCipher>>, RamdiskSetupError> {
        if !self.encrypt {
            return Ok(None);
        }
        let cipher = SymBlockCipher::new(self.cipher_family, &self.key)?;
        Ok(Some(Arc::new(cipher)))
    }

    fn block_size(&self) -> Result<usize, RamdiskSetupError> {
        Ok(self.cipher_family.alg_for_key_len(self.key.len())?.block_size())
    }

    fn device_config(&self, strategy: DispatchStrategy) -> RamdiskDeviceConfig {
        RamdiskDeviceConfig {
            sector_size: self.sector_size,
            sectors: self.sectors,
            strategy,
            idle_delay: self.idle_delay,
        }
    }
}

impl fmt::Debug for RamdiskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamdiskConfig")
            .field("sector_size", &self.sector_size)
            .field("sectors", &self.sectors)
            .field("devices", &self.devices)
            .field("request_mode", &self.request_mode)
            .field("encrypt", &self.encrypt)
            .field("cipher_family", &self.cipher_family)
            .field("key_len", &self.key.len())
            .field("idle_delay", &self.idle_delay)
            .finish()
    }
}

/// Configuration of an individual device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RamdiskDeviceConfig {
    pub sector_size: u32,
    pub sectors: u64,
    pub strategy: DispatchStrategy,
    pub idle_delay: time::Duration,
}

impl RamdiskDeviceConfig {
    /// Device capacity in bytes, `None` on overflow.
    pub fn capacity_bytes(&self) -> Option<u64> {
        self.sectors.checked_mul(self.sector_size as u64)
    }

    /// Check the device configuration for consistency.
    ///
    /// # Arguments:
    ///
    /// * `block_size` - The block cipher's block size if encryption is enabled,
    ///   `None` otherwise.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskSetupError::InvalidConfig`] - Some parameter is out of range.
    pub fn validate(&self, block_size: Option<usize>) -> Result<(), RamdiskSetupError> {
        if self.sector_size == 0 {
            return Err(RamdiskSetupError::InvalidConfig("sector size is zero"));
        } else if self.sectors == 0 {
            return Err(RamdiskSetupError::InvalidConfig("sector count is zero"));
        }
        if let Some(block_size) = block_size {
            if self.sector_size as usize % block_size != 0 {
                return Err(RamdiskSetupError::InvalidConfig(
                    "sector size not a multiple of the cipher block size",
                ));
            }
        }
        if self.capacity_bytes().is_none() {
            return Err(RamdiskSetupError::InvalidConfig("capacity overflows"));
        }
        Ok(())
    }
}
