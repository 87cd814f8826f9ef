// MiniVSFS on-disk constants
// Every value here is part of the image format; changing one breaks compatibility.

use static_assertions::const_assert;

// Magic number: bytes 4D 56 53 46 ("MVSF") stored little-endian
pub const MINIVSFS_MAGIC: u32 = 0x4653_564D;
pub const MINIVSFS_VERSION: u32 = 1;

// Geometry
pub const BLOCK_SIZE: u32 = 4096;
pub const BLOCK_SIZE_BYTES: usize = BLOCK_SIZE as usize;
pub const INODE_SIZE: usize = 128;
pub const DIRENT_SIZE: usize = 64;
pub const SUPERBLOCK_SIZE: usize = 116;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE_BYTES / INODE_SIZE;
pub const DIRENTS_PER_BLOCK: usize = BLOCK_SIZE_BYTES / DIRENT_SIZE;

// Fixed region placement
pub const SUPERBLOCK_BLOCK: u64 = 0;
pub const INODE_BITMAP_START: u64 = 1;
pub const INODE_BITMAP_BLOCKS: u64 = 1;
pub const DATA_BITMAP_START: u64 = 2;
pub const DATA_BITMAP_BLOCKS: u64 = 1;
pub const INODE_TABLE_START: u64 = 3;

// Bits one bitmap block can track
pub const BITS_PER_BITMAP_BLOCK: u64 = BLOCK_SIZE as u64 * 8;

// Inodes
pub const ROOT_INO: u32 = 1;
pub const DIRECT_POINTERS: usize = 12;
pub const MAX_FILE_SIZE: u64 = DIRECT_POINTERS as u64 * BLOCK_SIZE as u64;
pub const MODE_DIRECTORY: u16 = 0o040000;
pub const MODE_REGULAR: u16 = 0o100000;
pub const PROJECT_ID: u32 = 5;

// Directory entries
pub const DIRENT_TYPE_FILE: u8 = 1;
pub const DIRENT_TYPE_DIRECTORY: u8 = 2;
pub const NAME_FIELD_LEN: usize = 58;
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;

// Checksum coverage
pub const SUPERBLOCK_CHECKSUM_OFFSET: usize = 112;
pub const SUPERBLOCK_CHECKSUM_COVERAGE: usize = BLOCK_SIZE_BYTES - 4;
pub const INODE_CHECKSUM_OFFSET: usize = 120;
pub const DIRENT_CHECKSUM_OFFSET: usize = 63;

const_assert!(SUPERBLOCK_SIZE <= BLOCK_SIZE_BYTES);
const_assert!(SUPERBLOCK_CHECKSUM_OFFSET + 4 == SUPERBLOCK_SIZE);
const_assert!(INODE_CHECKSUM_OFFSET + 8 == INODE_SIZE);
const_assert!(DIRENT_CHECKSUM_OFFSET + 1 == DIRENT_SIZE);
const_assert!(4 + 1 + NAME_FIELD_LEN + 1 == DIRENT_SIZE);
const_assert!(BLOCK_SIZE_BYTES % INODE_SIZE == 0);
const_assert!(BLOCK_SIZE_BYTES % DIRENT_SIZE == 0);
