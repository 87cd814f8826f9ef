// In-memory MiniVSFS image
// The whole image lives in one owned buffer; structural edits happen in
// place and the buffer is written back in a single pass.

use crate::minivsfs::core::{
    Bitmap, DirEntry, Inode, Layout, Superblock, checksum, BLOCK_SIZE_BYTES, DIRENTS_PER_BLOCK,
    DIRENT_SIZE, INODE_SIZE,
};
use log::{debug, info};
use minivsfs_core::MiniVsfsError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub struct Image {
    bytes: Vec<u8>,
    superblock: Superblock,
    layout: Layout,
}

impl Image {
    /// Wrap a zero-filled buffer sized for `layout`. The caller writes the
    /// superblock before the image is used.
    pub(crate) fn zeroed(layout: Layout, superblock: Superblock) -> Self {
        Self {
            bytes: vec![0u8; layout.image_bytes()],
            superblock,
            layout,
        }
    }

    /// Parse an existing image. The layout is taken from the superblock as
    /// persisted and only checked for consistency with the buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MiniVsfsError> {
        let superblock = Superblock::from_bytes(&bytes)?;
        if superblock.block_size as usize != BLOCK_SIZE_BYTES {
            return Err(MiniVsfsError::Corrupted(format!(
                "unsupported block size {}",
                superblock.block_size
            )));
        }

        let layout = Layout::from_superblock(&superblock);
        layout.validate_against(bytes.len())?;
        debug!("Parsed superblock: {:?}", layout);

        Ok(Self {
            bytes,
            superblock,
            layout,
        })
    }

    pub fn open(path: &Path) -> Result<Self, MiniVsfsError> {
        let bytes = std::fs::read(path)?;
        info!("Read image {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(bytes)
    }

    /// Write the buffer to `path` through a temporary file in the same
    /// directory, so the destination is either the old file or the complete
    /// new image.
    pub fn save(&self, path: &Path) -> Result<(), MiniVsfsError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| MiniVsfsError::IoError(e.error))?;

        info!("Wrote image {} ({} bytes)", path.display(), self.bytes.len());
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn block(&self, block: u64) -> &[u8] {
        let start = block as usize * BLOCK_SIZE_BYTES;
        &self.bytes[start..start + BLOCK_SIZE_BYTES]
    }

    pub fn block_mut(&mut self, block: u64) -> &mut [u8] {
        let start = block as usize * BLOCK_SIZE_BYTES;
        &mut self.bytes[start..start + BLOCK_SIZE_BYTES]
    }

    pub fn inode_bitmap(&mut self) -> Bitmap<'_> {
        let (start, blocks, bits) = (
            self.layout.inode_bitmap_start,
            self.layout.inode_bitmap_blocks,
            self.layout.inode_count as u32,
        );
        Bitmap::new(self.region_mut(start, blocks), bits)
    }

    pub fn data_bitmap(&mut self) -> Bitmap<'_> {
        let (start, blocks, bits) = (
            self.layout.data_bitmap_start,
            self.layout.data_bitmap_blocks,
            self.layout.data_region_blocks as u32,
        );
        Bitmap::new(self.region_mut(start, blocks), bits)
    }

    pub fn inode_bitmap_bytes(&self) -> &[u8] {
        self.region(self.layout.inode_bitmap_start, self.layout.inode_bitmap_blocks)
    }

    pub fn data_bitmap_bytes(&self) -> &[u8] {
        self.region(self.layout.data_bitmap_start, self.layout.data_bitmap_blocks)
    }

    fn region(&self, start: u64, blocks: u64) -> &[u8] {
        let from = start as usize * BLOCK_SIZE_BYTES;
        &self.bytes[from..from + blocks as usize * BLOCK_SIZE_BYTES]
    }

    fn region_mut(&mut self, start: u64, blocks: u64) -> &mut [u8] {
        let from = start as usize * BLOCK_SIZE_BYTES;
        &mut self.bytes[from..from + blocks as usize * BLOCK_SIZE_BYTES]
    }

    fn inode_offset(&self, ino: u32) -> Result<usize, MiniVsfsError> {
        if ino == 0 || ino as u64 > self.layout.inode_count {
            return Err(MiniVsfsError::Corrupted(format!(
                "inode number {} outside 1..={}",
                ino, self.layout.inode_count
            )));
        }
        let slot = (ino - 1) as usize;
        Ok(self.layout.inode_table_start as usize * BLOCK_SIZE_BYTES + slot * INODE_SIZE)
    }

    /// Read inode `ino` (1-based).
    pub fn read_inode(&self, ino: u32) -> Result<Inode, MiniVsfsError> {
        let offset = self.inode_offset(ino)?;
        let mut raw = [0u8; INODE_SIZE];
        raw.copy_from_slice(&self.bytes[offset..offset + INODE_SIZE]);
        Ok(Inode::from_bytes(&raw))
    }

    /// Store inode `ino` (1-based) exactly as given; checksums are the
    /// caller's job.
    pub fn write_inode(&mut self, ino: u32, inode: &Inode) -> Result<(), MiniVsfsError> {
        let offset = self.inode_offset(ino)?;
        self.bytes[offset..offset + INODE_SIZE].copy_from_slice(&inode.to_bytes());
        Ok(())
    }

    pub fn read_dirent(&self, block: u64, slot: usize) -> DirEntry {
        let offset = slot * DIRENT_SIZE;
        let mut raw = [0u8; DIRENT_SIZE];
        raw.copy_from_slice(&self.block(block)[offset..offset + DIRENT_SIZE]);
        DirEntry::from_bytes(&raw)
    }

    pub fn write_dirent(&mut self, block: u64, slot: usize, entry: &DirEntry) {
        let offset = slot * DIRENT_SIZE;
        self.block_mut(block)[offset..offset + DIRENT_SIZE].copy_from_slice(&entry.to_bytes());
    }

    /// All slots of a directory block, free ones included.
    pub fn dirents(&self, block: u64) -> Vec<DirEntry> {
        (0..DIRENTS_PER_BLOCK).map(|slot| self.read_dirent(block, slot)).collect()
    }

    /// Encode the superblock into block 0 and refresh its checksum. Must be
    /// the last step of any modification.
    pub fn finalize_superblock(&mut self) {
        let mut superblock = self.superblock.clone();
        superblock.finalize_into(self.block_mut(0));
        self.superblock = superblock;
    }

    pub fn superblock_checksum_valid(&self) -> bool {
        checksum::superblock_checksum(self.block(0)) == checksum::stored_superblock_checksum(self.block(0))
    }
}
