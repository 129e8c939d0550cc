// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Ramdisk test helpers.

use crate::{
    config::RamdiskDeviceConfig,
    crypto::symcipher::{SymBlockCipher, SymBlockCipherFamily},
    device::RamdiskDevice,
    dispatch::DispatchStrategy,
    utils_sync::test::TestSyncTypes,
};
use std::{sync::Arc, time};

mod transfer;

pub(crate) const TEST_KEY: [u8; 16] = *b"0123456789abcdef";
pub(crate) const TEST_SECTOR_SIZE: u32 = 512;
pub(crate) const TEST_SECTORS: u64 = 64;
pub(crate) const TEST_IDLE_DELAY: time::Duration = time::Duration::from_secs(30);

pub(crate) const ALL_STRATEGIES: [DispatchStrategy; 3] = [
    DispatchStrategy::Simple,
    DispatchStrategy::Full,
    DispatchStrategy::DirectSegment,
];

pub(crate) fn test_cipher() -> Arc<SymBlockCipher> {
    Arc::new(SymBlockCipher::new(SymBlockCipherFamily::Aes, &TEST_KEY).unwrap())
}

pub(crate) fn test_device_config(strategy: DispatchStrategy) -> RamdiskDeviceConfig {
    RamdiskDeviceConfig {
        sector_size: TEST_SECTOR_SIZE,
        sectors: TEST_SECTORS,
        strategy,
        idle_delay: TEST_IDLE_DELAY,
    }
}

pub(crate) fn new_test_device(strategy: DispatchStrategy, encrypt: bool) -> RamdiskDevice<TestSyncTypes> {
    let cipher = encrypt.then(test_cipher);
    RamdiskDevice::new(0, test_device_config(strategy), cipher).unwrap()
}

/// Distinct, non-repeating test data.
pub(crate) fn test_pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32).wrapping_mul(2654435761).to_le_bytes()[(i % 4)] ^ seed)
        .collect()
}

pub(crate) fn raw_snapshot(device: &RamdiskDevice<TestSyncTypes>) -> Vec<u8> {
    device.read_raw(0, device.capacity_bytes()).unwrap()
}
