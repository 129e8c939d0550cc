// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Backing store of a ramdisk device.

use crate::error::RamdiskSetupError;
use zeroize::Zeroize as _;

/// Contiguous, fixed size in-memory byte store.
///
/// Holds the device's data at rest, i.e. in encrypted form if encryption is
/// enabled. The contents are wiped when the store is dropped.
pub struct RamdiskStore {
    bytes: Vec<u8>,
}

impl RamdiskStore {
    /// Allocate a zero-filled store.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskSetupError::AllocationFailure`] - The memory could not be
    ///   allocated.
    pub fn try_new(len: u64) -> Result<Self, RamdiskSetupError> {
        let len = usize::try_from(len).map_err(|_| RamdiskSetupError::AllocationFailure)?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| RamdiskSetupError::AllocationFailure)?;
        bytes.resize(len, 0u8);
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Fill the whole store with zeroes.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl Drop for RamdiskStore {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
