use crate::MiniVsfsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options accepted by the format operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Image size in KiB.
    pub size_kib: u64,
    /// Number of inode slots in the inode table.
    pub inode_count: u64,
}

impl FormatOptions {
    pub const MIN_SIZE_KIB: u64 = 180;
    pub const MAX_SIZE_KIB: u64 = 4096;
    pub const MIN_INODES: u64 = 128;
    pub const MAX_INODES: u64 = 512;

    pub fn new(size_kib: u64, inode_count: u64) -> Self {
        Self { size_kib, inode_count }
    }

    /// Range checks only. Whether the inode table leaves room for data is
    /// decided by the layout calculation.
    pub fn validate(&self) -> Result<(), MiniVsfsError> {
        if self.size_kib < Self::MIN_SIZE_KIB
            || self.size_kib > Self::MAX_SIZE_KIB
            || self.size_kib % 4 != 0
        {
            return Err(MiniVsfsError::InvalidInput(format!(
                "size-kib must be between {}-{} and a multiple of 4 (got {})",
                Self::MIN_SIZE_KIB,
                Self::MAX_SIZE_KIB,
                self.size_kib
            )));
        }

        if self.inode_count < Self::MIN_INODES || self.inode_count > Self::MAX_INODES {
            return Err(MiniVsfsError::InvalidInput(format!(
                "inodes must be between {} and {} (got {})",
                Self::MIN_INODES,
                Self::MAX_INODES,
                self.inode_count
            )));
        }

        Ok(())
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            size_kib: Self::MIN_SIZE_KIB,
            inode_count: Self::MIN_INODES,
        }
    }
}

/// Options accepted by the inject operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectOptions {
    /// Existing image to read.
    pub input: PathBuf,
    /// Where the updated image is written. May equal `input`.
    pub output: PathBuf,
    /// Host file to add to the root directory.
    pub file: PathBuf,
}

/// One contiguous block range of the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub name: String,
    pub start: u64,
    pub blocks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatReport {
    pub options: FormatOptions,
    pub total_blocks: u64,
    pub regions: Vec<RegionInfo>,
    /// Build timestamp recorded in the superblock (seconds since epoch).
    pub built_at: u64,
    /// False for a dry run.
    pub written: bool,
}

impl FormatReport {
    pub fn region(&self, name: &str) -> Option<&RegionInfo> {
        self.regions.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectReport {
    pub name: String,
    /// 1-based inode number assigned to the file.
    pub inode: u32,
    pub size_bytes: u64,
    /// Absolute block numbers holding the file data, in order.
    pub blocks: Vec<u32>,
    /// Size of the root directory after the entry was added.
    pub root_size: u64,
}

pub trait ImageFormatter {
    fn name(&self) -> &'static str;

    fn validate_options(&self, options: &FormatOptions) -> Result<(), MiniVsfsError>;

    /// Compute what `format` would produce without writing anything.
    fn dry_run(&self, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError>;

    fn format(&self, image: &Path, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError>;
}

pub trait ImageInjector {
    fn name(&self) -> &'static str;

    fn inject(&self, options: &InjectOptions) -> Result<InjectReport, MiniVsfsError>;
}
