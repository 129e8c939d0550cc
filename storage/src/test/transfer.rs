// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

use super::{TEST_SECTOR_SIZE, test_cipher, test_pattern};
use crate::{
    crypto::CryptoError, error::RamdiskIoError, request::IoDirection, store::RamdiskStore,
    transfer::TransferEngine,
};

const STORE_SECTORS: u64 = 16;
const STORE_LEN: u64 = STORE_SECTORS * TEST_SECTOR_SIZE as u64;

#[test]
fn test_transfer_roundtrip_positions() {
    let cipher = test_cipher();
    let mut store = RamdiskStore::try_new(STORE_LEN).unwrap();
    let mut engine = TransferEngine::new(Some(&mut store), Some(&*cipher), TEST_SECTOR_SIZE, "test");

    for (sector, sectors) in [(0u64, 1u64), (3, 5), (15, 1), (0, STORE_SECTORS), (7, 9)] {
        let data = test_pattern((sectors * TEST_SECTOR_SIZE as u64) as usize, sector as u8);
        let mut buf = data.clone();
        assert_eq!(
            engine.transfer(sector, sectors, &mut buf, IoDirection::Write).unwrap(),
            sectors
        );
        // The source buffer is left alone on writes.
        assert_eq!(buf, data);

        let mut read_buf = vec![0u8; data.len()];
        assert_eq!(
            engine.transfer(sector, sectors, &mut read_buf, IoDirection::Read).unwrap(),
            sectors
        );
        assert_eq!(read_buf, data);
    }
}

#[test]
fn test_transfer_write_blocks_land_in_place() {
    let cipher = test_cipher();
    let mut store = RamdiskStore::try_new(STORE_LEN).unwrap();
    let sector = 2u64;
    let data = test_pattern(TEST_SECTOR_SIZE as usize * 2, 0x5a);
    {
        let mut engine = TransferEngine::new(Some(&mut store), Some(&*cipher), TEST_SECTOR_SIZE, "test");
        let mut buf = data.clone();
        engine.transfer(sector, 2, &mut buf, IoDirection::Write).unwrap();
    }

    let byte_offset = sector as usize * TEST_SECTOR_SIZE as usize;
    let block_size = cipher.block_size();
    for (i, plaintext_block) in data.chunks_exact(block_size).enumerate() {
        let mut expected = vec![0u8; block_size];
        cipher.encrypt_block(plaintext_block, &mut expected).unwrap();
        let at = byte_offset + i * block_size;
        assert_eq!(&store.as_slice()[at..at + block_size], &expected[..]);
    }
    // Nothing outside the range has been touched.
    assert!(store.as_slice()[..byte_offset].iter().all(|b| *b == 0));
    assert!(store.as_slice()[byte_offset + data.len()..].iter().all(|b| *b == 0));
}

#[test]
fn test_transfer_identical_blocks_identical_ciphertext() {
    let cipher = test_cipher();
    let mut store = RamdiskStore::try_new(STORE_LEN).unwrap();
    {
        let mut engine = TransferEngine::new(Some(&mut store), Some(&*cipher), TEST_SECTOR_SIZE, "test");
        let mut buf = vec![0xabu8; TEST_SECTOR_SIZE as usize];
        engine.transfer(1, 1, &mut buf, IoDirection::Write).unwrap();
    }
    let at_rest = &store.as_slice()[TEST_SECTOR_SIZE as usize..2 * TEST_SECTOR_SIZE as usize];
    let first = &at_rest[..16];
    assert_ne!(first, &[0xabu8; 16][..]);
    for block in at_rest.chunks_exact(16) {
        assert_eq!(block, first);
    }
}

#[test]
fn test_transfer_unencrypted_bypass() {
    let mut store = RamdiskStore::try_new(STORE_LEN).unwrap();
    let data = test_pattern(3 * TEST_SECTOR_SIZE as usize, 1);
    {
        let mut engine = TransferEngine::new(Some(&mut store), None, TEST_SECTOR_SIZE, "test");
        let mut buf = data.clone();
        engine.transfer(4, 3, &mut buf, IoDirection::Write).unwrap();
        let mut read_buf = vec![0u8; data.len()];
        engine.transfer(4, 3, &mut read_buf, IoDirection::Read).unwrap();
        assert_eq!(read_buf, data);
    }
    let at = 4 * TEST_SECTOR_SIZE as usize;
    assert_eq!(&store.as_slice()[at..at + data.len()], &data[..]);
}

#[test]
fn test_transfer_bounds() {
    let cipher = test_cipher();
    let mut store = RamdiskStore::try_new(STORE_LEN).unwrap();
    let mut engine = TransferEngine::new(Some(&mut store), Some(&*cipher), TEST_SECTOR_SIZE, "test");

    // Up to the exact end is fine.
    let mut buf = vec![0x11u8; 2 * TEST_SECTOR_SIZE as usize];
    engine
        .transfer(STORE_SECTORS - 2, 2, &mut buf, IoDirection::Write)
        .unwrap();
    drop(engine);
    let before = store.as_slice().to_vec();

    let mut engine = TransferEngine::new(Some(&mut store), Some(&*cipher), TEST_SECTOR_SIZE, "test");
    // One sector past the end.
    let mut buf = vec![0x22u8; 2 * TEST_SECTOR_SIZE as usize];
    assert_eq!(
        engine.transfer(STORE_SECTORS - 1, 2, &mut buf, IoDirection::Write),
        Err(RamdiskIoError::OutOfBounds {
            byte_offset: (STORE_SECTORS - 1) * TEST_SECTOR_SIZE as u64,
            byte_length: 2 * TEST_SECTOR_SIZE as u64,
            capacity: STORE_LEN,
        })
    );
    // Starting at the end.
    let mut buf = vec![0x22u8; TEST_SECTOR_SIZE as usize];
    assert!(matches!(
        engine.transfer(STORE_SECTORS, 1, &mut buf, IoDirection::Write),
        Err(RamdiskIoError::OutOfBounds { .. })
    ));
    // Offset computation overflowing.
    assert!(matches!(
        engine.transfer(u64::MAX / 2, 1, &mut buf, IoDirection::Write),
        Err(RamdiskIoError::OutOfBounds { .. })
    ));
    assert!(matches!(
        engine.transfer(u64::MAX, 1, &mut buf, IoDirection::Read),
        Err(RamdiskIoError::OutOfBounds { .. })
    ));
    // Nothing has been read into the buffer either.
    assert_eq!(buf, vec![0x22u8; TEST_SECTOR_SIZE as usize]);
    drop(engine);

    assert_eq!(store.as_slice(), &before[..]);
}

#[test]
fn test_transfer_buffer_length_mismatch() {
    let mut store = RamdiskStore::try_new(STORE_LEN).unwrap();
    let mut engine = TransferEngine::new(Some(&mut store), None, TEST_SECTOR_SIZE, "test");
    let mut buf = vec![0u8; TEST_SECTOR_SIZE as usize];
    assert_eq!(
        engine.transfer(0, 2, &mut buf, IoDirection::Read),
        Err(RamdiskIoError::MalformedRequest)
    );
}

#[test]
fn test_transfer_partial_cipher_block() {
    let cipher = test_cipher();
    let sector_size = 8u32;
    let mut store = RamdiskStore::try_new(64).unwrap();
    let mut engine = TransferEngine::new(Some(&mut store), Some(&*cipher), sector_size, "test");
    let mut buf = vec![0u8; sector_size as usize];
    assert_eq!(
        engine.transfer(0, 1, &mut buf, IoDirection::Write),
        Err(RamdiskIoError::Cipher(CryptoError::InvalidBlockLength { len: 8 }))
    );
    // Two sectors make up a full block.
    let mut buf = vec![0x33u8; 2 * sector_size as usize];
    engine.transfer(2, 2, &mut buf, IoDirection::Write).unwrap();
    let mut read_buf = vec![0u8; buf.len()];
    engine.transfer(2, 2, &mut read_buf, IoDirection::Read).unwrap();
    assert_eq!(read_buf, buf);
}

#[test]
fn test_transfer_no_medium() {
    let mut engine = TransferEngine::new(None, None, TEST_SECTOR_SIZE, "test");
    let mut buf = vec![0u8; TEST_SECTOR_SIZE as usize];
    assert_eq!(
        engine.transfer(0, 1, &mut buf, IoDirection::Read),
        Err(RamdiskIoError::NoMedium)
    );
}

#[test]
fn test_store_allocation_failure() {
    assert!(RamdiskStore::try_new(1u64 << 54).is_err());
    assert!(RamdiskStore::try_new(u64::MAX).is_err());
    let store = RamdiskStore::try_new(4096).unwrap();
    assert_eq!(store.len(), 4096);
    assert!(store.as_slice().iter().all(|b| *b == 0));
}
