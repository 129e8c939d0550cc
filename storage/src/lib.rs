// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Encrypted, block-addressed ramdisk.
//!
//! A [`RamdiskRegistry`] owns a fixed set of [`RamdiskDevice`]s, each backed by
//! its own volatile in-memory [`RamdiskStore`]. Data is held encrypted at rest:
//! every write encrypts, every read decrypts, block by block with the shared
//! [`SymBlockCipher`](crypto::symcipher::SymBlockCipher) and no chaining.
//! Requests are drained by one of the [`DispatchStrategy`] variants, fixed per
//! device. The per-device lifecycle tracks open references and simulates a
//! media change after the device has been idle for a while.

// Lifetimes are not always obvious at first sight, allow for making them explicit even if
// redundant.
#![allow(clippy::needless_lifetimes)]

use cryptrd_crypto as crypto;
use cryptrd_utils_sync as utils_sync;

pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod request;
pub mod store;
pub mod transfer;

#[cfg(test)]
mod test;

pub use config::{KERNEL_SECTOR_SIZE, RamdiskConfig, RamdiskDeviceConfig};
pub use device::RamdiskDevice;
pub use dispatch::DispatchStrategy;
pub use error::{RamdiskIoError, RamdiskSetupError};
pub use lifecycle::HdGeometry;
pub use registry::{DeviceId, RamdiskRegistry};
pub use request::{IoCompletion, IoDirection, IoRequest, IoRequestKind};
pub use store::RamdiskStore;
pub use transfer::TransferEngine;
