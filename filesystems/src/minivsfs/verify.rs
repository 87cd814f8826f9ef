// MiniVSFS image verification
// Read-only consistency check of checksums, bitmaps, and the root directory.

use crate::minivsfs::core::{
    bitmap, checksum, timestamps, FileType, Inode, BLOCK_SIZE_BYTES, DIRENT_SIZE,
    MINIVSFS_VERSION, ROOT_INO,
};
use crate::minivsfs::image::Image;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Default, Clone, Serialize)]
pub struct ImageStats {
    pub inodes_total: u64,
    pub inodes_used: u64,
    pub data_blocks_total: u64,
    pub data_blocks_used: u64,
    pub files: u64,
    pub built_at: String,
}

/// Verification results
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
    pub stats: ImageStats,
}

impl VerificationReport {
    fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            stats: ImageStats::default(),
        }
    }

    fn add_error(&mut self, msg: String) {
        error!("Verification error: {}", msg);
        self.errors.push(msg);
        self.is_valid = false;
    }

    fn add_warning(&mut self, msg: String) {
        warn!("Verification warning: {}", msg);
        self.warnings.push(msg);
    }

    fn add_info(&mut self, msg: String) {
        debug!("Verification info: {}", msg);
        self.info.push(msg);
    }
}

/// Verify a parsed image. Parsing already rejected a wrong magic and
/// impossible geometry, so this only reports on content.
pub fn verify_image(image: &Image) -> VerificationReport {
    let mut report = VerificationReport::new();
    let layout = *image.layout();
    let sb = image.superblock();
    info!("Starting MiniVSFS verification");

    // Step 1: superblock
    let stored = checksum::stored_superblock_checksum(image.block(0));
    let calculated = checksum::superblock_checksum(image.block(0));
    if stored != calculated {
        report.add_error(format!(
            "Superblock checksum mismatch: stored=0x{:08X}, calculated=0x{:08X}",
            stored, calculated
        ));
    } else {
        report.add_info("Superblock checksum valid".to_string());
    }
    if sb.version != MINIVSFS_VERSION {
        report.add_warning(format!("Unexpected version {}", sb.version));
    }
    if sb.root_inode != ROOT_INO as u64 {
        report.add_error(format!("Root inode is {} (expected {})", sb.root_inode, ROOT_INO));
    }
    if sb.flags != 0 {
        report.add_warning(format!("Reserved flags are 0x{:08X}", sb.flags));
    }
    if (image.as_bytes().len() / BLOCK_SIZE_BYTES) as u64 != layout.total_blocks {
        report.add_warning(format!(
            "Image holds {} bytes beyond the {} blocks the superblock describes",
            image.as_bytes().len() - layout.image_bytes(),
            layout.total_blocks
        ));
    }

    // Step 2: every allocated inode
    let inode_bits = image.inode_bitmap_bytes();
    let mut live_inodes = Vec::new();
    for bit in 0..layout.inode_count as u32 {
        if !bitmap::is_set(inode_bits, bit) {
            continue;
        }
        let ino = bit + 1;
        match image.read_inode(ino) {
            Ok(inode) => {
                check_inode(&mut report, image, ino, &inode);
                live_inodes.push((ino, inode));
            }
            Err(e) => report.add_error(format!("Inode {}: {}", ino, e)),
        }
    }

    // Step 3: data bitmap agrees with the blocks inodes point at
    let mut referenced = BTreeSet::new();
    for (ino, inode) in &live_inodes {
        for block in inode.blocks() {
            let block = block as u64;
            if !layout.contains_data_block(block) {
                continue;
            }
            if !referenced.insert(block) {
                report.add_error(format!("Block {} referenced twice (inode {})", block, ino));
            }
        }
    }
    let data_bits = image.data_bitmap_bytes();
    let mut data_used = 0u64;
    for bit in 0..layout.data_region_blocks as u32 {
        let block = layout.data_block(bit);
        let marked = bitmap::is_set(data_bits, bit);
        data_used += marked as u64;
        match (marked, referenced.contains(&block)) {
            (false, true) => report.add_error(format!("Block {} in use but free in bitmap", block)),
            (true, false) => report.add_warning(format!("Block {} marked but unreferenced", block)),
            _ => {}
        }
    }

    // Step 4: root directory
    let scan = check_root_directory(&mut report, image, &live_inodes);

    // Step 5: every allocated inode is reachable from the root directory
    if let Some(scan) = &scan {
        for (ino, _) in &live_inodes {
            if *ino != ROOT_INO && !scan.referenced.contains(ino) {
                report.add_warning(format!(
                    "Inode {} allocated but not referenced by any directory entry",
                    ino
                ));
            }
        }
    }
    let files = scan.map_or(0, |scan| scan.files);

    report.stats = ImageStats {
        inodes_total: layout.inode_count,
        inodes_used: live_inodes.len() as u64,
        data_blocks_total: layout.data_region_blocks,
        data_blocks_used: data_used,
        files,
        built_at: timestamps::format_epoch(sb.mtime_epoch),
    };

    if report.is_valid {
        info!("Verification passed");
    }
    report
}

fn check_inode(report: &mut VerificationReport, image: &Image, ino: u32, inode: &Inode) {
    if !inode.checksum_valid() {
        report.add_error(format!("Inode {} checksum mismatch", ino));
    }
    if !inode.is_directory() && !inode.is_regular() {
        report.add_error(format!("Inode {} has unknown mode 0o{:o}", ino, inode.mode));
    }

    let layout = image.layout();
    let used_slots = inode.direct.iter().take_while(|&&b| b != 0).count();
    if inode.direct[used_slots..].iter().any(|&b| b != 0) {
        report.add_error(format!("Inode {} has gaps in its direct pointers", ino));
    }
    for block in inode.blocks() {
        if !layout.contains_data_block(block as u64) {
            report.add_error(format!(
                "Inode {} points at block {} outside the data region",
                ino, block
            ));
        }
    }

    let capacity = used_slots as u64 * BLOCK_SIZE_BYTES as u64;
    if inode.is_regular() && inode.size_bytes > capacity {
        report.add_error(format!(
            "Inode {} size {} exceeds its {} blocks",
            ino, inode.size_bytes, used_slots
        ));
    }
}

/// What the root directory scan found.
struct RootScan {
    files: u64,
    /// Inode numbers named by live entries, including "." and "..".
    referenced: HashSet<u32>,
}

/// Returns `None` when the root directory itself cannot be read.
fn check_root_directory(
    report: &mut VerificationReport,
    image: &Image,
    live_inodes: &[(u32, Inode)],
) -> Option<RootScan> {
    let Some((_, root)) = live_inodes.iter().find(|(ino, _)| *ino == ROOT_INO) else {
        report.add_error("Root inode is not allocated".to_string());
        return None;
    };
    if !root.is_directory() {
        report.add_error("Root inode is not a directory".to_string());
        return None;
    }
    let root_block = root.direct[0] as u64;
    if root_block != image.layout().data_region_start {
        report.add_error(format!(
            "Root directory block is {} (expected {})",
            root_block,
            image.layout().data_region_start
        ));
        if !image.layout().contains_data_block(root_block) {
            return None;
        }
    }

    let live: HashSet<u32> = live_inodes.iter().map(|(ino, _)| *ino).collect();
    let mut names = HashSet::new();
    let mut referenced = HashSet::from([ROOT_INO]);
    let mut used = 0u64;
    let mut files = 0u64;

    for (slot, entry) in image.dirents(root_block).iter().enumerate() {
        if entry.is_free() {
            continue;
        }
        used += 1;
        referenced.insert(entry.inode_no);
        let name = entry.name();
        if !entry.checksum_valid() {
            report.add_error(format!("Directory entry {} ('{}') checksum mismatch", slot, name));
        }
        if entry.name_bytes().is_empty() {
            report.add_error(format!("Directory entry {} has an empty name", slot));
        }
        if !names.insert(entry.name_bytes().to_vec()) {
            report.add_error(format!("Duplicate directory entry '{}'", name));
        }
        if !live.contains(&entry.inode_no) {
            report.add_error(format!(
                "Entry '{}' points at unallocated inode {}",
                name, entry.inode_no
            ));
        }
        match entry.file_type() {
            Some(FileType::File) => files += 1,
            Some(FileType::Directory) => {}
            None => report.add_error(format!(
                "Entry '{}' has unknown type {}",
                name, entry.file_type
            )),
        }
    }

    if root.size_bytes != used * DIRENT_SIZE as u64 {
        report.add_warning(format!(
            "Root size {} does not match {} live entries",
            root.size_bytes, used
        ));
    }
    report.add_info(format!("Root directory holds {} entries", used));
    Some(RootScan { files, referenced })
}
