// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Block cipher adapter for the `cryptrd` encrypted ramdisk.
//!
//! Provides a keyed [single block transform](symcipher::SymBlockCipher) over
//! the supported [block cipher algorithms](symcipher::SymBlockCipherAlg). No
//! chaining mode is layered on top: every block is transformed independently
//! and deterministically, identical plaintext blocks map to identical
//! ciphertext blocks under the same key.

#![no_std]

pub mod symcipher;

#[cfg(test)]
mod test;

/// Errors returned by the [`symcipher`] primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The key's length is not supported by the selected algorithm.
    #[error("invalid key length {len} for block cipher")]
    InvalidKeyLength {
        /// Length of the rejected key in bytes.
        len: usize,
    },
    /// The requested algorithm has not been enabled at build time.
    #[error("unsupported block cipher algorithm")]
    UnsupportedAlgorithm,
    /// A source or destination buffer is not a (multiple of the) cipher block
    /// size.
    #[error("invalid block length {len}")]
    InvalidBlockLength {
        /// Length of the offending buffer in bytes.
        len: usize,
    },
}
