// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

//! Keyed single block cipher transforms.

use crate::CryptoError;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};
use core::{fmt, str};

/// Block size shared by all supported block cipher algorithms.
pub const SYM_BLOCK_CIPHER_BLOCK_SIZE: usize = 16;

/// Block cipher family selection.
///
/// The concrete [`SymBlockCipherAlg`] key size variant gets derived from the
/// length of the key material supplied to [`SymBlockCipher::new()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymBlockCipherFamily {
    Aes,
    #[cfg(feature = "camellia")]
    Camellia,
    #[cfg(feature = "sm4")]
    Sm4,
}

impl SymBlockCipherFamily {
    /// Map a key length to the family's matching [`SymBlockCipherAlg`].
    ///
    /// # Arguments:
    ///
    /// * `key_len` - Length of the key material in bytes.
    ///
    /// # Errors:
    ///
    /// * [`CryptoError::InvalidKeyLength`] - No key size variant of the family
    ///   accepts keys of length `key_len`.
    pub fn alg_for_key_len(&self, key_len: usize) -> Result<SymBlockCipherAlg, CryptoError> {
        let alg = match self {
            Self::Aes => match key_len {
                16 => SymBlockCipherAlg::Aes(SymBlockCipherAesKeySize::Aes128),
                24 => SymBlockCipherAlg::Aes(SymBlockCipherAesKeySize::Aes192),
                32 => SymBlockCipherAlg::Aes(SymBlockCipherAesKeySize::Aes256),
                _ => return Err(CryptoError::InvalidKeyLength { len: key_len }),
            },
            #[cfg(feature = "camellia")]
            Self::Camellia => match key_len {
                16 => SymBlockCipherAlg::Camellia(SymBlockCipherCamelliaKeySize::Camellia128),
                24 => SymBlockCipherAlg::Camellia(SymBlockCipherCamelliaKeySize::Camellia192),
                32 => SymBlockCipherAlg::Camellia(SymBlockCipherCamelliaKeySize::Camellia256),
                _ => return Err(CryptoError::InvalidKeyLength { len: key_len }),
            },
            #[cfg(feature = "sm4")]
            Self::Sm4 => match key_len {
                16 => SymBlockCipherAlg::Sm4(SymBlockCipherSm4KeySize::Sm4_128),
                _ => return Err(CryptoError::InvalidKeyLength { len: key_len }),
            },
        };
        Ok(alg)
    }

    /// Lower case family name, as accepted by the [`FromStr`](str::FromStr)
    /// implementation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes => "aes",
            #[cfg(feature = "camellia")]
            Self::Camellia => "camellia",
            #[cfg(feature = "sm4")]
            Self::Sm4 => "sm4",
        }
    }
}

impl str::FromStr for SymBlockCipherFamily {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes" => Ok(Self::Aes),
            #[cfg(feature = "camellia")]
            "camellia" => Ok(Self::Camellia),
            #[cfg(feature = "sm4")]
            "sm4" => Ok(Self::Sm4),
            _ => Err(CryptoError::UnsupportedAlgorithm),
        }
    }
}

impl fmt::Display for SymBlockCipherFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// AES key sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymBlockCipherAesKeySize {
    Aes128,
    Aes192,
    Aes256,
}

/// Camellia key sizes.
#[cfg(feature = "camellia")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymBlockCipherCamelliaKeySize {
    Camellia128,
    Camellia192,
    Camellia256,
}

/// SM4 key sizes.
#[cfg(feature = "sm4")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymBlockCipherSm4KeySize {
    Sm4_128,
}

/// Block cipher algorithm, including the key size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymBlockCipherAlg {
    Aes(SymBlockCipherAesKeySize),
    #[cfg(feature = "camellia")]
    Camellia(SymBlockCipherCamelliaKeySize),
    #[cfg(feature = "sm4")]
    Sm4(SymBlockCipherSm4KeySize),
}

impl SymBlockCipherAlg {
    /// The algorithm's family.
    pub fn family(&self) -> SymBlockCipherFamily {
        match self {
            Self::Aes(_) => SymBlockCipherFamily::Aes,
            #[cfg(feature = "camellia")]
            Self::Camellia(_) => SymBlockCipherFamily::Camellia,
            #[cfg(feature = "sm4")]
            Self::Sm4(_) => SymBlockCipherFamily::Sm4,
        }
    }

    /// Length of keys for the algorithm in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes(key_size) => match key_size {
                SymBlockCipherAesKeySize::Aes128 => 16,
                SymBlockCipherAesKeySize::Aes192 => 24,
                SymBlockCipherAesKeySize::Aes256 => 32,
            },
            #[cfg(feature = "camellia")]
            Self::Camellia(key_size) => match key_size {
                SymBlockCipherCamelliaKeySize::Camellia128 => 16,
                SymBlockCipherCamelliaKeySize::Camellia192 => 24,
                SymBlockCipherCamelliaKeySize::Camellia256 => 32,
            },
            #[cfg(feature = "sm4")]
            Self::Sm4(key_size) => match key_size {
                SymBlockCipherSm4KeySize::Sm4_128 => 16,
            },
        }
    }

    /// Block size of the algorithm in bytes.
    pub fn block_size(&self) -> usize {
        SYM_BLOCK_CIPHER_BLOCK_SIZE
    }
}

enum SymBlockCipherInstance {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
    #[cfg(feature = "camellia")]
    Camellia128(camellia::Camellia128),
    #[cfg(feature = "camellia")]
    Camellia192(camellia::Camellia192),
    #[cfg(feature = "camellia")]
    Camellia256(camellia::Camellia256),
    #[cfg(feature = "sm4")]
    Sm4(sm4::Sm4),
}

// Dispatch an expression generic over the cipher implementation to the
// instance's concrete type.
macro_rules! with_block_cipher {
    ($instance:expr, $c:ident => $body:expr) => {
        match $instance {
            SymBlockCipherInstance::Aes128($c) => $body,
            SymBlockCipherInstance::Aes192($c) => $body,
            SymBlockCipherInstance::Aes256($c) => $body,
            #[cfg(feature = "camellia")]
            SymBlockCipherInstance::Camellia128($c) => $body,
            #[cfg(feature = "camellia")]
            SymBlockCipherInstance::Camellia192($c) => $body,
            #[cfg(feature = "camellia")]
            SymBlockCipherInstance::Camellia256($c) => $body,
            #[cfg(feature = "sm4")]
            SymBlockCipherInstance::Sm4($c) => $body,
        }
    };
}

impl SymBlockCipherInstance {
    fn new(alg: &SymBlockCipherAlg, key: &[u8]) -> Result<Self, CryptoError> {
        let invalid_key_len = |_| CryptoError::InvalidKeyLength { len: key.len() };
        if key.len() != alg.key_len() {
            return Err(CryptoError::InvalidKeyLength { len: key.len() });
        }

        let instance = match alg {
            SymBlockCipherAlg::Aes(key_size) => match key_size {
                SymBlockCipherAesKeySize::Aes128 => Self::Aes128(aes::Aes128::new_from_slice(key).map_err(invalid_key_len)?),
                SymBlockCipherAesKeySize::Aes192 => Self::Aes192(aes::Aes192::new_from_slice(key).map_err(invalid_key_len)?),
                SymBlockCipherAesKeySize::Aes256 => Self::Aes256(aes::Aes256::new_from_slice(key).map_err(invalid_key_len)?),
            },
            #[cfg(feature = "camellia")]
            SymBlockCipherAlg::Camellia(key_size) => match key_size {
                SymBlockCipherCamelliaKeySize::Camellia128 => {
                    Self::Camellia128(camellia::Camellia128::new_from_slice(key).map_err(invalid_key_len)?)
                }
                SymBlockCipherCamelliaKeySize::Camellia192 => {
                    Self::Camellia192(camellia::Camellia192::new_from_slice(key).map_err(invalid_key_len)?)
                }
                SymBlockCipherCamelliaKeySize::Camellia256 => {
                    Self::Camellia256(camellia::Camellia256::new_from_slice(key).map_err(invalid_key_len)?)
                }
            },
            #[cfg(feature = "sm4")]
            SymBlockCipherAlg::Sm4(key_size) => match key_size {
                SymBlockCipherSm4KeySize::Sm4_128 => Self::Sm4(sm4::Sm4::new_from_slice(key).map_err(invalid_key_len)?),
            },
        };
        Ok(instance)
    }
}

fn encrypt_one<C: BlockEncrypt>(c: &C, src: &[u8], dst: &mut [u8]) {
    c.encrypt_block_b2b(GenericArray::from_slice(src), GenericArray::from_mut_slice(dst));
}

fn decrypt_one<C: BlockDecrypt>(c: &C, src: &[u8], dst: &mut [u8]) {
    c.decrypt_block_b2b(GenericArray::from_slice(src), GenericArray::from_mut_slice(dst));
}

/// Keyed block cipher.
///
/// Transforms single blocks of [`SYM_BLOCK_CIPHER_BLOCK_SIZE`] bytes, without
/// any chaining or IV. A `SymBlockCipher` is immutable once shared, the
/// transform primitives take `&self` and may get invoked concurrently from
/// multiple threads.
pub struct SymBlockCipher {
    alg: SymBlockCipherAlg,
    instance: SymBlockCipherInstance,
}

impl SymBlockCipher {
    /// Instantiate a keyed block cipher.
    ///
    /// The key size variant of `family` gets selected by the length of `key`.
    ///
    /// # Arguments:
    ///
    /// * `family` - The block cipher algorithm family.
    /// * `key` - The key material.
    ///
    /// # Errors:
    ///
    /// * [`CryptoError::InvalidKeyLength`] - The key's length is not supported
    ///   by any variant of `family`.
    pub fn new(family: SymBlockCipherFamily, key: &[u8]) -> Result<Self, CryptoError> {
        let alg = family.alg_for_key_len(key.len())?;
        let instance = SymBlockCipherInstance::new(&alg, key)?;
        Ok(Self { alg, instance })
    }

    /// Replace the key.
    ///
    /// The previous key schedule gets dropped in its entirety, no state
    /// associated with the former key survives. The key size variant may change
    /// with the new key's length, the algorithm family stays the same. On
    /// failure, `self` is left unmodified.
    ///
    /// # Errors:
    ///
    /// * [`CryptoError::InvalidKeyLength`] - The key's length is not supported.
    pub fn set_key(&mut self, key: &[u8]) -> Result<(), CryptoError> {
        let alg = self.alg.family().alg_for_key_len(key.len())?;
        self.instance = SymBlockCipherInstance::new(&alg, key)?;
        self.alg = alg;
        Ok(())
    }

    pub fn alg(&self) -> &SymBlockCipherAlg {
        &self.alg
    }

    pub fn block_size(&self) -> usize {
        self.alg.block_size()
    }

    /// Encrypt a single block.
    ///
    /// # Arguments:
    ///
    /// * `src` - The plaintext block.
    /// * `dst` - Destination for the ciphertext, must not overlap with `src`.
    ///
    /// # Errors:
    ///
    /// * [`CryptoError::InvalidBlockLength`] - Either of `src` or `dst` is not
    ///   exactly one block in length.
    pub fn encrypt_block(&self, src: &[u8], dst: &mut [u8]) -> Result<(), CryptoError> {
        self.check_block_lengths(src, dst)?;
        with_block_cipher!(&self.instance, c => encrypt_one(c, src, dst));
        Ok(())
    }

    /// Decrypt a single block.
    ///
    /// # Arguments:
    ///
    /// * `src` - The ciphertext block.
    /// * `dst` - Destination for the plaintext, must not overlap with `src`.
    ///
    /// # Errors:
    ///
    /// * [`CryptoError::InvalidBlockLength`] - Either of `src` or `dst` is not
    ///   exactly one block in length.
    pub fn decrypt_block(&self, src: &[u8], dst: &mut [u8]) -> Result<(), CryptoError> {
        self.check_block_lengths(src, dst)?;
        with_block_cipher!(&self.instance, c => decrypt_one(c, src, dst));
        Ok(())
    }

    /// Encrypt a sequence of blocks, each independently.
    ///
    /// `src` and `dst` must have equal lengths, a multiple of the block size.
    /// Lengths are checked before anything is written to `dst`.
    ///
    /// # Errors:
    ///
    /// * [`CryptoError::InvalidBlockLength`] - The lengths of `src` and `dst`
    ///   differ or are not a multiple of the block size.
    pub fn encrypt_blocks(&self, src: &[u8], dst: &mut [u8]) -> Result<(), CryptoError> {
        self.check_blocks_lengths(src, dst)?;
        let block_size = self.block_size();
        with_block_cipher!(&self.instance, c => {
            for (src, dst) in src.chunks_exact(block_size).zip(dst.chunks_exact_mut(block_size)) {
                encrypt_one(c, src, dst);
            }
        });
        Ok(())
    }

    /// Decrypt a sequence of blocks, each independently.
    ///
    /// See [`encrypt_blocks()`](Self::encrypt_blocks) for the length
    /// constraints.
    pub fn decrypt_blocks(&self, src: &[u8], dst: &mut [u8]) -> Result<(), CryptoError> {
        self.check_blocks_lengths(src, dst)?;
        let block_size = self.block_size();
        with_block_cipher!(&self.instance, c => {
            for (src, dst) in src.chunks_exact(block_size).zip(dst.chunks_exact_mut(block_size)) {
                decrypt_one(c, src, dst);
            }
        });
        Ok(())
    }

    fn check_block_lengths(&self, src: &[u8], dst: &[u8]) -> Result<(), CryptoError> {
        let block_size = self.block_size();
        if src.len() != block_size {
            return Err(CryptoError::InvalidBlockLength { len: src.len() });
        } else if dst.len() != block_size {
            return Err(CryptoError::InvalidBlockLength { len: dst.len() });
        }
        Ok(())
    }

    fn check_blocks_lengths(&self, src: &[u8], dst: &[u8]) -> Result<(), CryptoError> {
        if src.len() % self.block_size() != 0 {
            return Err(CryptoError::InvalidBlockLength { len: src.len() });
        } else if dst.len() != src.len() {
            return Err(CryptoError::InvalidBlockLength { len: dst.len() });
        }
        Ok(())
    }
}

impl fmt::Debug for SymBlockCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymBlockCipher").field("alg", &self.alg).finish_non_exhaustive()
    }
}
