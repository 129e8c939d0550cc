// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

extern crate alloc;
use alloc::vec;

use crate::CryptoError;
use crate::symcipher::{SYM_BLOCK_CIPHER_BLOCK_SIZE, SymBlockCipher, SymBlockCipherAesKeySize, SymBlockCipherAlg, SymBlockCipherFamily};

fn hex(s: &str) -> alloc::vec::Vec<u8> {
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
}

fn sequential_key(len: usize) -> alloc::vec::Vec<u8> {
    (0..len as u8).collect()
}

// FIPS-197, Appendix C.
const FIPS197_PLAINTEXT: &str = "00112233445566778899aabbccddeeff";
const FIPS197_VECTORS: [(usize, &str); 3] = [
    (16, "69c4e0d86a7b0430d8cdb78070b4c55a"),
    (24, "dda97ca4864cdfe06eaf70a0ec0d7191"),
    (32, "8ea2b7ca516745bfeafc49904b496089"),
];

#[test]
fn test_aes_known_answer() {
    let pt = hex(FIPS197_PLAINTEXT);
    for (key_len, expected_ct) in FIPS197_VECTORS {
        let cipher = SymBlockCipher::new(SymBlockCipherFamily::Aes, &sequential_key(key_len)).unwrap();
        let mut ct = [0u8; SYM_BLOCK_CIPHER_BLOCK_SIZE];
        cipher.encrypt_block(&pt, &mut ct).unwrap();
        assert_eq!(&ct[..], &hex(expected_ct)[..]);

        let mut decrypted = [0u8; SYM_BLOCK_CIPHER_BLOCK_SIZE];
        cipher.decrypt_block(&ct, &mut decrypted).unwrap();
        assert_eq!(&decrypted[..], &pt[..]);
    }
}

#[test]
fn test_key_len_selects_variant() {
    let cipher = SymBlockCipher::new(SymBlockCipherFamily::Aes, &sequential_key(24)).unwrap();
    assert_eq!(*cipher.alg(), SymBlockCipherAlg::Aes(SymBlockCipherAesKeySize::Aes192));
    assert_eq!(cipher.alg().key_len(), 24);
    assert_eq!(cipher.block_size(), 16);
}

#[test]
fn test_invalid_key_len() {
    for key_len in [0usize, 1, 15, 17, 31, 33, 47] {
        assert_eq!(
            SymBlockCipher::new(SymBlockCipherFamily::Aes, &vec![0x5au8; key_len]).unwrap_err(),
            CryptoError::InvalidKeyLength { len: key_len }
        );
    }
}

#[test]
fn test_set_key_replaces_schedule() {
    let pt = hex(FIPS197_PLAINTEXT);
    let mut cipher = SymBlockCipher::new(SymBlockCipherFamily::Aes, &[0u8; 16]).unwrap();
    cipher.set_key(&sequential_key(32)).unwrap();
    assert_eq!(*cipher.alg(), SymBlockCipherAlg::Aes(SymBlockCipherAesKeySize::Aes256));

    let mut ct = [0u8; 16];
    cipher.encrypt_block(&pt, &mut ct).unwrap();
    assert_eq!(&ct[..], &hex(FIPS197_VECTORS[2].1)[..]);

    // A rejected key leaves the installed one in place.
    assert_eq!(
        cipher.set_key(&[0u8; 20]).unwrap_err(),
        CryptoError::InvalidKeyLength { len: 20 }
    );
    let mut ct2 = [0u8; 16];
    cipher.encrypt_block(&pt, &mut ct2).unwrap();
    assert_eq!(ct, ct2);
}

#[test]
fn test_identical_blocks_identical_ciphertext() {
    let cipher = SymBlockCipher::new(SymBlockCipherFamily::Aes, &sequential_key(16)).unwrap();
    let pt = [0xabu8; 4 * SYM_BLOCK_CIPHER_BLOCK_SIZE];
    let mut ct = [0u8; 4 * SYM_BLOCK_CIPHER_BLOCK_SIZE];
    cipher.encrypt_blocks(&pt, &mut ct).unwrap();
    let first = &ct[..SYM_BLOCK_CIPHER_BLOCK_SIZE];
    for block in ct.chunks_exact(SYM_BLOCK_CIPHER_BLOCK_SIZE) {
        assert_eq!(block, first);
    }
    assert_ne!(first, &pt[..SYM_BLOCK_CIPHER_BLOCK_SIZE]);

    let mut ct_again = [0u8; SYM_BLOCK_CIPHER_BLOCK_SIZE];
    cipher.encrypt_block(&pt[..SYM_BLOCK_CIPHER_BLOCK_SIZE], &mut ct_again).unwrap();
    assert_eq!(&ct_again[..], first);
}

#[test]
fn test_blocks_roundtrip() {
    for key_len in [16usize, 24, 32] {
        let cipher = SymBlockCipher::new(SymBlockCipherFamily::Aes, &sequential_key(key_len)).unwrap();
        let pt: alloc::vec::Vec<u8> = (0..1024usize).map(|i| (i * 7 + 3) as u8).collect();
        let mut ct = vec![0u8; pt.len()];
        cipher.encrypt_blocks(&pt, &mut ct).unwrap();
        assert_ne!(ct, pt);
        let mut decrypted = vec![0u8; pt.len()];
        cipher.decrypt_blocks(&ct, &mut decrypted).unwrap();
        assert_eq!(decrypted, pt);
    }
}

#[test]
fn test_invalid_block_len() {
    let cipher = SymBlockCipher::new(SymBlockCipherFamily::Aes, &sequential_key(16)).unwrap();
    let mut dst = [0u8; 16];
    assert_eq!(
        cipher.encrypt_block(&[0u8; 15], &mut dst).unwrap_err(),
        CryptoError::InvalidBlockLength { len: 15 }
    );
    assert_eq!(
        cipher.decrypt_block(&[0u8; 16], &mut [0u8; 32]).unwrap_err(),
        CryptoError::InvalidBlockLength { len: 32 }
    );

    // Nothing gets written on a length mismatch.
    let mut dst = [0x11u8; 40];
    assert_eq!(
        cipher.encrypt_blocks(&[0u8; 40], &mut dst).unwrap_err(),
        CryptoError::InvalidBlockLength { len: 40 }
    );
    assert_eq!(dst, [0x11u8; 40]);
    assert_eq!(
        cipher.encrypt_blocks(&[0u8; 32], &mut [0u8; 48]).unwrap_err(),
        CryptoError::InvalidBlockLength { len: 48 }
    );
}

#[test]
fn test_family_from_str() {
    assert_eq!("aes".parse::<SymBlockCipherFamily>().unwrap(), SymBlockCipherFamily::Aes);
    assert_eq!(
        "des".parse::<SymBlockCipherFamily>().unwrap_err(),
        CryptoError::UnsupportedAlgorithm
    );
    assert_eq!(SymBlockCipherFamily::Aes.name(), "aes");
}

#[cfg(feature = "sm4")]
#[test]
fn test_sm4_key_len() {
    assert!(SymBlockCipher::new(SymBlockCipherFamily::Sm4, &sequential_key(16)).is_ok());
    assert_eq!(
        SymBlockCipher::new(SymBlockCipherFamily::Sm4, &sequential_key(32)).unwrap_err(),
        CryptoError::InvalidKeyLength { len: 32 }
    );
}

// RFC 3713, Appendix A.
#[cfg(feature = "camellia")]
#[test]
fn test_camellia_known_answer() {
    use crate::symcipher::SymBlockCipherCamelliaKeySize;

    let pt = hex("0123456789abcdeffedcba9876543210");
    let key = hex("0123456789abcdeffedcba987654321000112233445566778899aabbccddeeff");
    for (key_len, expected_key_size, expected_ct) in [
        (
            16,
            SymBlockCipherCamelliaKeySize::Camellia128,
            "67673138549669730857065648eabe43",
        ),
        (
            24,
            SymBlockCipherCamelliaKeySize::Camellia192,
            "b4993401b3e996f84ee5cee7d79b09b9",
        ),
        (
            32,
            SymBlockCipherCamelliaKeySize::Camellia256,
            "9acc237dff16d76c20ef7c919e3a7509",
        ),
    ] {
        let cipher = SymBlockCipher::new(SymBlockCipherFamily::Camellia, &key[..key_len]).unwrap();
        assert_eq!(*cipher.alg(), SymBlockCipherAlg::Camellia(expected_key_size));
        assert_eq!(cipher.block_size(), SYM_BLOCK_CIPHER_BLOCK_SIZE);

        let mut ct = [0u8; SYM_BLOCK_CIPHER_BLOCK_SIZE];
        cipher.encrypt_block(&pt, &mut ct).unwrap();
        assert_eq!(&ct[..], &hex(expected_ct)[..]);

        let mut decrypted = [0u8; SYM_BLOCK_CIPHER_BLOCK_SIZE];
        cipher.decrypt_block(&ct, &mut decrypted).unwrap();
        assert_eq!(&decrypted[..], &pt[..]);
    }

    assert_eq!(
        SymBlockCipher::new(SymBlockCipherFamily::Camellia, &key[..20]).unwrap_err(),
        CryptoError::InvalidKeyLength { len: 20 }
    );
}
