// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Sector range transfers between request buffers and a [`RamdiskStore`].

use crate::{
    crypto::{CryptoError, symcipher::SymBlockCipher},
    error::RamdiskIoError,
    request::IoDirection,
    store::RamdiskStore,
};
use core::ops;
use tracing::{info, trace};

/// Apply sector range transfers to a device's store.
///
/// A `TransferEngine` borrows the store for the duration of a dispatch run,
/// i.e. with the device lock held. If a block cipher is configured, data is
/// encrypted block by block on its way to the store and decrypted on its way
/// back, each block independently at its own position. Otherwise it is copied
/// verbatim.
pub struct TransferEngine<'a> {
    store: Option<&'a mut RamdiskStore>,
    cipher: Option<&'a SymBlockCipher>,
    sector_size: u32,
    device_name: &'a str,
}

impl<'a> TransferEngine<'a> {
    /// Create a `TransferEngine`.
    ///
    /// # Arguments:
    ///
    /// * `store` - The device's store, `None` if it has been released already.
    ///   Transfers will fail with [`RamdiskIoError::NoMedium`] then.
    /// * `cipher` - The block cipher, `None` if encryption is disabled.
    /// * `sector_size` - The device's sector size. If `cipher` is set, it must
    ///   be a multiple of the cipher block size.
    /// * `device_name` - Device name for diagnostics.
    pub fn new(
        store: Option<&'a mut RamdiskStore>,
        cipher: Option<&'a SymBlockCipher>,
        sector_size: u32,
        device_name: &'a str,
    ) -> Self {
        Self {
            store,
            cipher,
            sector_size,
            device_name,
        }
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Transfer a sector range.
    ///
    /// The range gets checked against the store's capacity before anything is
    /// transferred. A block cipher failure past that check aborts the transfer
    /// midway, leaving the store's range in a partially written state.
    ///
    /// Returns the number of sectors transferred, which equals `sectors` on
    /// success.
    ///
    /// # Arguments:
    ///
    /// * `sector` - First device sector of the range.
    /// * `sectors` - Length of the range in units of sectors.
    /// * `buffer` - Destination for reads, source for writes. Its length must
    ///   equal the range's length in bytes.
    /// * `direction` - The transfer direction.
    ///
    /// # Errors:
    ///
    /// * [`RamdiskIoError::OutOfBounds`] - The range exceeds the store.
    /// * [`RamdiskIoError::MalformedRequest`] - The `buffer`'s length doesn't
    ///   match the range.
    /// * [`RamdiskIoError::Cipher`] - A block transform failed.
    /// * [`RamdiskIoError::NoMedium`] - The store has been released.
    pub fn transfer(
        &mut self,
        sector: u64,
        sectors: u64,
        buffer: &mut [u8],
        direction: IoDirection,
    ) -> Result<u64, RamdiskIoError> {
        if self.store.is_none() {
            return Err(RamdiskIoError::NoMedium);
        }

        let sector_size = self.sector_size as u64;
        let byte_offset = sector.checked_mul(sector_size);
        let byte_length = sectors.checked_mul(sector_size);
        let range = match (byte_offset, byte_length) {
            (Some(byte_offset), Some(byte_length)) => self.store_range(byte_offset, byte_length)?,
            _ => {
                let err = self.out_of_bounds(sector.saturating_mul(sector_size), sectors.saturating_mul(sector_size));
                info!(device = self.device_name, sector, sectors, "beyond-end request");
                return Err(err);
            }
        };
        if range.len() != buffer.len() {
            return Err(RamdiskIoError::MalformedRequest);
        }

        let cipher = self.cipher;
        let store = self.store.as_deref_mut().ok_or(RamdiskIoError::NoMedium)?;
        let store_range = &mut store.as_mut_slice()[range];

        trace!(
            device = self.device_name,
            sector,
            sectors,
            direction = ?direction,
            encrypted = cipher.is_some(),
            "transfer"
        );

        match cipher {
            None => match direction {
                IoDirection::Read => buffer.copy_from_slice(store_range),
                IoDirection::Write => store_range.copy_from_slice(buffer),
            },
            Some(cipher) => {
                let block_size = cipher.block_size();
                if buffer.len() % block_size != 0 {
                    return Err(RamdiskIoError::Cipher(CryptoError::InvalidBlockLength {
                        len: buffer.len(),
                    }));
                }
                match direction {
                    IoDirection::Read => {
                        for (src, dst) in store_range
                            .chunks_exact(block_size)
                            .zip(buffer.chunks_exact_mut(block_size))
                        {
                            cipher.decrypt_block(src, dst)?;
                        }
                    }
                    IoDirection::Write => {
                        // Each chunk lands at its own position in the store.
                        for (src, dst) in buffer
                            .chunks_exact(block_size)
                            .zip(store_range.chunks_exact_mut(block_size))
                        {
                            dst.fill(0);
                            cipher.encrypt_block(src, dst)?;
                        }
                    }
                }
            }
        }

        Ok(sectors)
    }

    /// Construct a [`RamdiskIoError::OutOfBounds`] for the engine's store.
    pub(crate) fn out_of_bounds(&self, byte_offset: u64, byte_length: u64) -> RamdiskIoError {
        RamdiskIoError::OutOfBounds {
            byte_offset,
            byte_length,
            capacity: self.capacity(),
        }
    }

    fn capacity(&self) -> u64 {
        self.store.as_ref().map(|store| store.len() as u64).unwrap_or(0)
    }

    fn store_range(&self, byte_offset: u64, byte_length: u64) -> Result<ops::Range<usize>, RamdiskIoError> {
        let in_bounds = byte_offset
            .checked_add(byte_length)
            .map(|byte_end| byte_end <= self.capacity())
            .unwrap_or(false);
        if !in_bounds {
            info!(
                device = self.device_name,
                byte_offset,
                byte_length,
                capacity = self.capacity(),
                "beyond-end request"
            );
            return Err(self.out_of_bounds(byte_offset, byte_length));
        }
        // Both fit the store, hence usize.
        Ok(byte_offset as usize..(byte_offset + byte_length) as usize)
    }
}
