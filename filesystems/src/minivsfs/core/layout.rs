// Region layout for MiniVSFS images
// Block 0 superblock, block 1 inode bitmap, block 2 data bitmap, then the
// inode table, then data to the end of the image.

use super::constants::*;
use super::structures::Superblock;
use minivsfs_core::{FormatOptions, MiniVsfsError, RegionInfo};
use serde::Serialize;

/// Absolute block ranges of every region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub total_blocks: u64,
    pub inode_count: u64,
    pub inode_bitmap_start: u64,
    pub inode_bitmap_blocks: u64,
    pub data_bitmap_start: u64,
    pub data_bitmap_blocks: u64,
    pub inode_table_start: u64,
    pub inode_table_blocks: u64,
    pub data_region_start: u64,
    pub data_region_blocks: u64,
}

impl Layout {
    /// Compute the layout for a new image.
    pub fn compute(options: &FormatOptions) -> Result<Self, MiniVsfsError> {
        options.validate()?;

        let total_blocks = options.size_kib * 1024 / BLOCK_SIZE as u64;
        let inode_table_bytes = options.inode_count * INODE_SIZE as u64;
        let inode_table_blocks = (inode_table_bytes + BLOCK_SIZE as u64 - 1) / BLOCK_SIZE as u64;
        let data_region_start = INODE_TABLE_START + inode_table_blocks;

        if total_blocks <= data_region_start {
            return Err(MiniVsfsError::InvalidInput(format!(
                "no space for data blocks: {} blocks total, metadata needs {}",
                total_blocks, data_region_start
            )));
        }

        Ok(Self {
            total_blocks,
            inode_count: options.inode_count,
            inode_bitmap_start: INODE_BITMAP_START,
            inode_bitmap_blocks: INODE_BITMAP_BLOCKS,
            data_bitmap_start: DATA_BITMAP_START,
            data_bitmap_blocks: DATA_BITMAP_BLOCKS,
            inode_table_start: INODE_TABLE_START,
            inode_table_blocks,
            data_region_start,
            data_region_blocks: total_blocks - data_region_start,
        })
    }

    /// Take the layout recorded in an existing superblock. Nothing is
    /// recomputed; `validate_against` checks it is usable.
    pub fn from_superblock(sb: &Superblock) -> Self {
        Self {
            total_blocks: sb.total_blocks,
            inode_count: sb.inode_count,
            inode_bitmap_start: sb.inode_bitmap_start,
            inode_bitmap_blocks: sb.inode_bitmap_blocks,
            data_bitmap_start: sb.data_bitmap_start,
            data_bitmap_blocks: sb.data_bitmap_blocks,
            inode_table_start: sb.inode_table_start,
            inode_table_blocks: sb.inode_table_blocks,
            data_region_start: sb.data_region_start,
            data_region_blocks: sb.data_region_blocks,
        }
    }

    /// Reject persisted geometry that would address memory outside an image
    /// of `image_len` bytes.
    pub fn validate_against(&self, image_len: usize) -> Result<(), MiniVsfsError> {
        let image_blocks = (image_len / BLOCK_SIZE_BYTES) as u64;
        if self.total_blocks == 0 || self.total_blocks > image_blocks {
            return Err(MiniVsfsError::Corrupted(format!(
                "superblock claims {} blocks but image holds {}",
                self.total_blocks, image_blocks
            )));
        }

        let regions = [
            ("inode bitmap", self.inode_bitmap_start, self.inode_bitmap_blocks),
            ("data bitmap", self.data_bitmap_start, self.data_bitmap_blocks),
            ("inode table", self.inode_table_start, self.inode_table_blocks),
            ("data region", self.data_region_start, self.data_region_blocks),
        ];
        // Regions must follow the superblock in order without overlapping.
        let mut prev_end = SUPERBLOCK_BLOCK + 1;
        for (name, start, blocks) in regions {
            let end = match start.checked_add(blocks) {
                Some(end) if blocks > 0 && end <= self.total_blocks => end,
                _ => {
                    return Err(MiniVsfsError::Corrupted(format!(
                        "{} range {}+{} is outside the image",
                        name, start, blocks
                    )))
                }
            };
            if start < prev_end {
                return Err(MiniVsfsError::Corrupted(format!(
                    "{} starts at block {} inside the preceding region (ends at {})",
                    name, start, prev_end
                )));
            }
            prev_end = end;
        }

        if self.inode_count == 0
            || self.inode_count > self.inode_bitmap_blocks * BITS_PER_BITMAP_BLOCK
            || self
                .inode_count
                .checked_mul(INODE_SIZE as u64)
                .map_or(true, |bytes| bytes > self.inode_table_blocks * BLOCK_SIZE as u64)
        {
            return Err(MiniVsfsError::Corrupted(format!(
                "inode count {} does not fit its bitmap or table",
                self.inode_count
            )));
        }

        if self.data_region_blocks > self.data_bitmap_blocks * BITS_PER_BITMAP_BLOCK {
            return Err(MiniVsfsError::Corrupted(format!(
                "data region of {} blocks exceeds its bitmap",
                self.data_region_blocks
            )));
        }

        Ok(())
    }

    pub fn image_bytes(&self) -> usize {
        self.total_blocks as usize * BLOCK_SIZE_BYTES
    }

    /// Absolute block number of data-bitmap bit `index`.
    pub fn data_block(&self, index: u32) -> u64 {
        self.data_region_start + index as u64
    }

    pub fn contains_data_block(&self, block: u64) -> bool {
        block >= self.data_region_start && block < self.data_region_start + self.data_region_blocks
    }

    pub fn regions(&self) -> Vec<RegionInfo> {
        let region = |name: &str, start, blocks| RegionInfo {
            name: name.to_string(),
            start,
            blocks,
        };
        vec![
            region("superblock", SUPERBLOCK_BLOCK, 1),
            region("inode_bitmap", self.inode_bitmap_start, self.inode_bitmap_blocks),
            region("data_bitmap", self.data_bitmap_start, self.data_bitmap_blocks),
            region("inode_table", self.inode_table_start, self.inode_table_blocks),
            region("data_region", self.data_region_start, self.data_region_blocks),
        ]
    }
}
