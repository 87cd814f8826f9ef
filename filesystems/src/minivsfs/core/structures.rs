// MiniVSFS on-disk records: superblock, inode, directory entry
// All fields are little-endian and packed; each record is encoded field by
// field at fixed offsets.

use super::checksum;
use super::constants::*;
use super::layout::Layout;
use byteorder::{ByteOrder, LittleEndian};
use minivsfs_core::MiniVsfsError;

/// Superblock (116 bytes at the start of block 0)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /* 0x00 */ pub magic: u32,
    /* 0x04 */ pub version: u32,
    /* 0x08 */ pub block_size: u32,
    /* 0x0C */ pub total_blocks: u64,
    /* 0x14 */ pub inode_count: u64,
    /* 0x1C */ pub inode_bitmap_start: u64,
    /* 0x24 */ pub inode_bitmap_blocks: u64,
    /* 0x2C */ pub data_bitmap_start: u64,
    /* 0x34 */ pub data_bitmap_blocks: u64,
    /* 0x3C */ pub inode_table_start: u64,
    /* 0x44 */ pub inode_table_blocks: u64,
    /* 0x4C */ pub data_region_start: u64,
    /* 0x54 */ pub data_region_blocks: u64,
    /* 0x5C */ pub root_inode: u64,
    /* 0x64 */ pub mtime_epoch: u64,
    /* 0x6C */ pub flags: u32,
    /* 0x70 */ pub checksum: u32,
}

impl Superblock {
    pub fn new(layout: &Layout, build_time: u64) -> Self {
        Self {
            magic: MINIVSFS_MAGIC,
            version: MINIVSFS_VERSION,
            block_size: BLOCK_SIZE,
            total_blocks: layout.total_blocks,
            inode_count: layout.inode_count,
            inode_bitmap_start: layout.inode_bitmap_start,
            inode_bitmap_blocks: layout.inode_bitmap_blocks,
            data_bitmap_start: layout.data_bitmap_start,
            data_bitmap_blocks: layout.data_bitmap_blocks,
            inode_table_start: layout.inode_table_start,
            inode_table_blocks: layout.inode_table_blocks,
            data_region_start: layout.data_region_start,
            data_region_blocks: layout.data_region_blocks,
            root_inode: ROOT_INO as u64,
            mtime_epoch: build_time,
            flags: 0,
            checksum: 0,
        }
    }

    /// Decode block 0. Fails on a wrong magic; geometry is checked separately.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MiniVsfsError> {
        if bytes.len() < SUPERBLOCK_SIZE {
            return Err(MiniVsfsError::Corrupted(format!(
                "image too small for a superblock ({} bytes)",
                bytes.len()
            )));
        }

        let magic = LittleEndian::read_u32(&bytes[0x00..]);
        if magic != MINIVSFS_MAGIC {
            return Err(MiniVsfsError::InvalidMagic { found: magic });
        }

        Ok(Self {
            magic,
            version: LittleEndian::read_u32(&bytes[0x04..]),
            block_size: LittleEndian::read_u32(&bytes[0x08..]),
            total_blocks: LittleEndian::read_u64(&bytes[0x0C..]),
            inode_count: LittleEndian::read_u64(&bytes[0x14..]),
            inode_bitmap_start: LittleEndian::read_u64(&bytes[0x1C..]),
            inode_bitmap_blocks: LittleEndian::read_u64(&bytes[0x24..]),
            data_bitmap_start: LittleEndian::read_u64(&bytes[0x2C..]),
            data_bitmap_blocks: LittleEndian::read_u64(&bytes[0x34..]),
            inode_table_start: LittleEndian::read_u64(&bytes[0x3C..]),
            inode_table_blocks: LittleEndian::read_u64(&bytes[0x44..]),
            data_region_start: LittleEndian::read_u64(&bytes[0x4C..]),
            data_region_blocks: LittleEndian::read_u64(&bytes[0x54..]),
            root_inode: LittleEndian::read_u64(&bytes[0x5C..]),
            mtime_epoch: LittleEndian::read_u64(&bytes[0x64..]),
            flags: LittleEndian::read_u32(&bytes[0x6C..]),
            checksum: LittleEndian::read_u32(&bytes[0x70..]),
        })
    }

    pub fn to_bytes(&self) -> [u8; SUPERBLOCK_SIZE] {
        let mut b = [0u8; SUPERBLOCK_SIZE];
        LittleEndian::write_u32(&mut b[0x00..], self.magic);
        LittleEndian::write_u32(&mut b[0x04..], self.version);
        LittleEndian::write_u32(&mut b[0x08..], self.block_size);
        LittleEndian::write_u64(&mut b[0x0C..], self.total_blocks);
        LittleEndian::write_u64(&mut b[0x14..], self.inode_count);
        LittleEndian::write_u64(&mut b[0x1C..], self.inode_bitmap_start);
        LittleEndian::write_u64(&mut b[0x24..], self.inode_bitmap_blocks);
        LittleEndian::write_u64(&mut b[0x2C..], self.data_bitmap_start);
        LittleEndian::write_u64(&mut b[0x34..], self.data_bitmap_blocks);
        LittleEndian::write_u64(&mut b[0x3C..], self.inode_table_start);
        LittleEndian::write_u64(&mut b[0x44..], self.inode_table_blocks);
        LittleEndian::write_u64(&mut b[0x4C..], self.data_region_start);
        LittleEndian::write_u64(&mut b[0x54..], self.data_region_blocks);
        LittleEndian::write_u64(&mut b[0x5C..], self.root_inode);
        LittleEndian::write_u64(&mut b[0x64..], self.mtime_epoch);
        LittleEndian::write_u32(&mut b[0x6C..], self.flags);
        LittleEndian::write_u32(&mut b[0x70..], self.checksum);
        b
    }

    /// Encode into block 0 and recompute the checksum over the whole block.
    /// Call only after every other field is final.
    pub fn finalize_into(&mut self, block: &mut [u8]) {
        block[..SUPERBLOCK_SIZE].copy_from_slice(&self.to_bytes());
        self.checksum = checksum::finalize_superblock(block);
    }
}

/// Inode (128 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inode {
    /* 0x00 */ pub mode: u16,
    /* 0x02 */ pub links: u16,
    /* 0x04 */ pub uid: u32,
    /* 0x08 */ pub gid: u32,
    /* 0x0C */ pub size_bytes: u64,
    /* 0x14 */ pub atime: u64,
    /* 0x1C */ pub mtime: u64,
    /* 0x24 */ pub ctime: u64,
    /* 0x2C */ pub direct: [u32; DIRECT_POINTERS],
    /* 0x5C */ pub reserved_0: u32,
    /* 0x60 */ pub reserved_1: u32,
    /* 0x64 */ pub reserved_2: u32,
    /* 0x68 */ pub proj_id: u32,
    /* 0x6C */ pub uid16_gid16: u32,
    /* 0x70 */ pub xattr_ptr: u64,
    /* 0x78 */ pub inode_crc: u64,
}

impl Inode {
    /// Root directory inode holding "." and "..".
    pub fn new_root(now: u64, dir_block: u32) -> Self {
        let mut direct = [0u32; DIRECT_POINTERS];
        direct[0] = dir_block;
        Self {
            mode: MODE_DIRECTORY,
            links: 2,
            size_bytes: 2 * DIRENT_SIZE as u64,
            atime: now,
            mtime: now,
            ctime: now,
            direct,
            proj_id: PROJECT_ID,
            ..Self::default()
        }
    }

    /// Regular file inode. `blocks` must hold at most 12 entries.
    pub fn new_file(now: u64, size_bytes: u64, blocks: &[u32]) -> Self {
        let mut direct = [0u32; DIRECT_POINTERS];
        for (slot, &block) in direct.iter_mut().zip(blocks) {
            *slot = block;
        }
        Self {
            mode: MODE_REGULAR,
            links: 1,
            size_bytes,
            atime: now,
            mtime: now,
            ctime: now,
            direct,
            proj_id: PROJECT_ID,
            ..Self::default()
        }
    }

    pub fn from_bytes(b: &[u8; INODE_SIZE]) -> Self {
        let mut direct = [0u32; DIRECT_POINTERS];
        LittleEndian::read_u32_into(&b[0x2C..0x5C], &mut direct);
        Self {
            mode: LittleEndian::read_u16(&b[0x00..]),
            links: LittleEndian::read_u16(&b[0x02..]),
            uid: LittleEndian::read_u32(&b[0x04..]),
            gid: LittleEndian::read_u32(&b[0x08..]),
            size_bytes: LittleEndian::read_u64(&b[0x0C..]),
            atime: LittleEndian::read_u64(&b[0x14..]),
            mtime: LittleEndian::read_u64(&b[0x1C..]),
            ctime: LittleEndian::read_u64(&b[0x24..]),
            direct,
            reserved_0: LittleEndian::read_u32(&b[0x5C..]),
            reserved_1: LittleEndian::read_u32(&b[0x60..]),
            reserved_2: LittleEndian::read_u32(&b[0x64..]),
            proj_id: LittleEndian::read_u32(&b[0x68..]),
            uid16_gid16: LittleEndian::read_u32(&b[0x6C..]),
            xattr_ptr: LittleEndian::read_u64(&b[0x70..]),
            inode_crc: LittleEndian::read_u64(&b[0x78..]),
        }
    }

    pub fn to_bytes(&self) -> [u8; INODE_SIZE] {
        let mut b = [0u8; INODE_SIZE];
        LittleEndian::write_u16(&mut b[0x00..], self.mode);
        LittleEndian::write_u16(&mut b[0x02..], self.links);
        LittleEndian::write_u32(&mut b[0x04..], self.uid);
        LittleEndian::write_u32(&mut b[0x08..], self.gid);
        LittleEndian::write_u64(&mut b[0x0C..], self.size_bytes);
        LittleEndian::write_u64(&mut b[0x14..], self.atime);
        LittleEndian::write_u64(&mut b[0x1C..], self.mtime);
        LittleEndian::write_u64(&mut b[0x24..], self.ctime);
        LittleEndian::write_u32_into(&self.direct, &mut b[0x2C..0x5C]);
        LittleEndian::write_u32(&mut b[0x5C..], self.reserved_0);
        LittleEndian::write_u32(&mut b[0x60..], self.reserved_1);
        LittleEndian::write_u32(&mut b[0x64..], self.reserved_2);
        LittleEndian::write_u32(&mut b[0x68..], self.proj_id);
        LittleEndian::write_u32(&mut b[0x6C..], self.uid16_gid16);
        LittleEndian::write_u64(&mut b[0x70..], self.xattr_ptr);
        LittleEndian::write_u64(&mut b[0x78..], self.inode_crc);
        b
    }

    /// Recompute the checksum. Call only after every other field is final.
    pub fn finalize(&mut self) {
        self.inode_crc = checksum::inode_checksum(&self.to_bytes());
    }

    pub fn checksum_valid(&self) -> bool {
        self.inode_crc == checksum::inode_checksum(&self.to_bytes())
    }

    pub fn is_directory(&self) -> bool {
        self.mode == MODE_DIRECTORY
    }

    pub fn is_regular(&self) -> bool {
        self.mode == MODE_REGULAR
    }

    /// Non-zero direct pointers, in slot order.
    pub fn blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().copied().filter(|&b| b != 0)
    }
}

/// Entry type byte of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

impl FileType {
    pub fn as_u8(self) -> u8 {
        match self {
            FileType::File => DIRENT_TYPE_FILE,
            FileType::Directory => DIRENT_TYPE_DIRECTORY,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            DIRENT_TYPE_FILE => Some(FileType::File),
            DIRENT_TYPE_DIRECTORY => Some(FileType::Directory),
            _ => None,
        }
    }
}

/// Directory entry (64 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /* 0x00 */ pub inode_no: u32,
    /* 0x04 */ pub file_type: u8,
    /* 0x05 */ pub name: [u8; NAME_FIELD_LEN],
    /* 0x3F */ pub checksum: u8,
}

impl DirEntry {
    pub fn new(inode_no: u32, file_type: FileType, name: &str) -> Result<Self, MiniVsfsError> {
        let name = encode_name(name)?;
        Ok(Self {
            inode_no,
            file_type: file_type.as_u8(),
            name,
            checksum: 0,
        })
    }

    pub fn from_bytes(b: &[u8; DIRENT_SIZE]) -> Self {
        let mut name = [0u8; NAME_FIELD_LEN];
        name.copy_from_slice(&b[0x05..0x05 + NAME_FIELD_LEN]);
        Self {
            inode_no: LittleEndian::read_u32(&b[0x00..]),
            file_type: b[0x04],
            name,
            checksum: b[DIRENT_CHECKSUM_OFFSET],
        }
    }

    pub fn to_bytes(&self) -> [u8; DIRENT_SIZE] {
        let mut b = [0u8; DIRENT_SIZE];
        LittleEndian::write_u32(&mut b[0x00..], self.inode_no);
        b[0x04] = self.file_type;
        b[0x05..0x05 + NAME_FIELD_LEN].copy_from_slice(&self.name);
        b[DIRENT_CHECKSUM_OFFSET] = self.checksum;
        b
    }

    /// Recompute the XOR checksum. Call only after inode, type and name are final.
    pub fn finalize(&mut self) {
        self.checksum = checksum::dirent_checksum(&self.to_bytes());
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum == checksum::dirent_checksum(&self.to_bytes())
    }

    pub fn is_free(&self) -> bool {
        self.inode_no == 0
    }

    /// Name bytes up to the first NUL.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        &self.name[..end]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_u8(self.file_type)
    }
}

/// Check a name fits the 58-byte field with its terminator.
pub fn validate_name(name: &str) -> Result<(), MiniVsfsError> {
    if name.is_empty() {
        return Err(MiniVsfsError::InvalidInput("filename is empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(MiniVsfsError::NameTooLong {
            name: name.to_string(),
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    if name.bytes().any(|b| b == 0 || b == b'/') {
        return Err(MiniVsfsError::InvalidInput(format!(
            "filename '{}' contains a NUL or '/'",
            name.escape_default()
        )));
    }
    Ok(())
}

fn encode_name(name: &str) -> Result<[u8; NAME_FIELD_LEN], MiniVsfsError> {
    validate_name(name)?;
    let mut field = [0u8; NAME_FIELD_LEN];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Ok(field)
}
