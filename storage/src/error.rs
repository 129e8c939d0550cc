// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Ramdisk error types.

use crate::crypto::CryptoError;

/// Error failing an individual I/O request or management operation.
///
/// None of these is fatal to the device: subsequent requests are processed
/// normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RamdiskIoError {
    /// The request's byte range exceeds the device capacity. Nothing has been
    /// transferred.
    #[error("request beyond end of device: offset={byte_offset}, length={byte_length}, capacity={capacity}")]
    OutOfBounds {
        /// Start of the requested range in bytes, saturated on overflow.
        byte_offset: u64,
        /// Length of the requested range in bytes, saturated on overflow.
        byte_length: u64,
        /// Device capacity in bytes.
        capacity: u64,
    },
    /// Not a storage I/O request, or segment lengths not a multiple of the
    /// sector size. Nothing has been transferred.
    #[error("malformed request")]
    MalformedRequest,
    /// A block transform failed. Contents of the store in the request's range
    /// are unknown.
    #[error("block cipher failure: {0}")]
    Cipher(#[from] CryptoError),
    /// The device's store has been released at teardown.
    #[error("no medium")]
    NoMedium,
    /// Close without a matching open.
    #[error("device not open")]
    NotOpen,
    /// The device identifier doesn't refer to a published device.
    #[error("no such device")]
    NoSuchDevice,
}

impl RamdiskIoError {
    /// Map to the POSIX errno a host block layer would report.
    #[must_use]
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Self::OutOfBounds { .. } | Self::MalformedRequest | Self::Cipher(_) | Self::NoMedium => libc::EIO,
            Self::NotOpen => libc::EINVAL,
            Self::NoSuchDevice => libc::ENXIO,
        }
    }
}

/// Error encountered while setting up a device or the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RamdiskSetupError {
    /// The backing store or the idle timer could not be acquired.
    #[error("resource allocation failure")]
    AllocationFailure,
    /// Configuration parameters are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The configured key has been rejected by the block cipher.
    #[error("block cipher setup failure: {0}")]
    Cipher(#[from] CryptoError),
}

impl RamdiskSetupError {
    /// Map to the POSIX errno a host module loader would report.
    #[must_use]
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Self::AllocationFailure => libc::ENOMEM,
            Self::InvalidConfig(_) | Self::Cipher(_) => libc::EINVAL,
        }
    }
}
