// Checksums for MiniVSFS metadata
// Superblock and inodes use reflected CRC-32 (poly 0xEDB88320); directory
// entries use a one-byte XOR fold.

use super::constants::*;

const CRC32_POLY: u32 = 0xEDB8_8320;

/// Reference lookup table for the MiniVSFS checksum engine: byte-at-a-time
/// CRC-32 over the reflected polynomial. Built at compile time and never
/// mutated. Output is identical to the standard CRC-32 (`crc32fast::hash`),
/// which the tests check against.
pub static CRC32_TABLE: [u32; 256] = build_crc32_table();

const fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;
        while j < 8 {
            c = if c & 1 != 0 { CRC32_POLY ^ (c >> 1) } else { c >> 1 };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Standard CRC-32 (initial and final XOR 0xFFFFFFFF).
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFF
}

/// Checksum of superblock block 0 as it would be stored.
/// The stored checksum field is treated as zero.
pub fn superblock_checksum(block: &[u8]) -> u32 {
    let mut covered = block[..SUPERBLOCK_CHECKSUM_COVERAGE].to_vec();
    covered[SUPERBLOCK_CHECKSUM_OFFSET..SUPERBLOCK_CHECKSUM_OFFSET + 4].fill(0);
    crc32(&covered)
}

/// Recompute and store the superblock checksum in place.
/// Call only after every other superblock field is final.
pub fn finalize_superblock(block: &mut [u8]) -> u32 {
    let field = SUPERBLOCK_CHECKSUM_OFFSET..SUPERBLOCK_CHECKSUM_OFFSET + 4;
    block[field.clone()].fill(0);
    let crc = crc32(&block[..SUPERBLOCK_CHECKSUM_COVERAGE]);
    block[field].copy_from_slice(&crc.to_le_bytes());
    crc
}

/// Checksum of a 128-byte inode record, with its own 8-byte field zeroed.
pub fn inode_checksum(record: &[u8; INODE_SIZE]) -> u64 {
    let mut copy = *record;
    copy[INODE_CHECKSUM_OFFSET..].fill(0);
    crc32(&copy[..INODE_CHECKSUM_OFFSET]) as u64
}

/// XOR of the first 63 bytes of a directory entry.
pub fn dirent_checksum(record: &[u8; DIRENT_SIZE]) -> u8 {
    record[..DIRENT_CHECKSUM_OFFSET].iter().fold(0u8, |acc, &b| acc ^ b)
}

pub fn stored_superblock_checksum(block: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&block[SUPERBLOCK_CHECKSUM_OFFSET..SUPERBLOCK_CHECKSUM_OFFSET + 4]);
    u32::from_le_bytes(raw)
}
