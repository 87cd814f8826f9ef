// MiniVSFS file injector (inject)
// Adds one regular file to the root directory of an existing image.

use crate::minivsfs::core::{
    structures::validate_name, DirEntry, FileType, Inode, BLOCK_SIZE_BYTES, DIRENT_SIZE,
    MAX_FILE_SIZE, ROOT_INO,
};
use crate::minivsfs::image::Image;
use log::{debug, info};
use minivsfs_core::{InjectReport, MiniVsfsError};

/// Bits claimed by an injection that has not completed yet.
struct PendingAllocation {
    inode_bit: u32,
    block_bits: Vec<u32>,
}

impl PendingAllocation {
    /// Release every bit so a failed call leaves the bitmaps as they were.
    fn rollback(self, image: &mut Image) {
        debug!(
            "Rolling back inode bit {} and data bits {:?}",
            self.inode_bit, self.block_bits
        );
        image.inode_bitmap().clear(self.inode_bit);
        let mut data = image.data_bitmap();
        for bit in self.block_bits {
            data.clear(bit);
        }
    }
}

/// Where the new directory entry goes.
struct DirectorySlot {
    slot: usize,
    used_entries: usize,
}

/// Number of data blocks a file of `size` bytes occupies.
pub fn blocks_needed(size: u64) -> usize {
    ((size + BLOCK_SIZE_BYTES as u64 - 1) / BLOCK_SIZE_BYTES as u64) as usize
}

/// Check the name and size a file must satisfy before anything is allocated.
pub fn validate_source(name: &str, size: u64) -> Result<(), MiniVsfsError> {
    validate_name(name)?;
    if size > MAX_FILE_SIZE {
        return Err(MiniVsfsError::FileTooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

/// Add `contents` to the root directory of `image` under `name`.
///
/// On error the image is left exactly as it was: any inode or data bits
/// claimed during the call are released before returning, and no data,
/// inode, or directory bytes are written until every resource is secured.
pub fn inject_file(
    image: &mut Image,
    name: &str,
    contents: &[u8],
    now: u64,
) -> Result<InjectReport, MiniVsfsError> {
    let size = contents.len() as u64;
    validate_source(name, size)?;

    let root = image.read_inode(ROOT_INO)?;
    let root_block = root.direct[0] as u64;
    if !root.is_directory() || !image.layout().contains_data_block(root_block) {
        return Err(MiniVsfsError::Corrupted(format!(
            "root inode is not a directory with a data block (mode 0o{:o}, block {})",
            root.mode, root_block
        )));
    }

    let inode_bit = image.inode_bitmap().allocate().ok_or(MiniVsfsError::NoFreeInodes)?;
    let mut pending = PendingAllocation {
        inode_bit,
        block_bits: Vec::new(),
    };

    for _ in 0..blocks_needed(size) {
        match image.data_bitmap().allocate() {
            Some(bit) => pending.block_bits.push(bit),
            None => {
                pending.rollback(image);
                return Err(MiniVsfsError::NoFreeDataBlocks);
            }
        }
    }

    let slot = match find_directory_slot(image, root_block, name) {
        Ok(slot) => slot,
        Err(e) => {
            pending.rollback(image);
            return Err(e);
        }
    };

    let ino = inode_bit + 1;
    let mut entry = match DirEntry::new(ino, FileType::File, name) {
        Ok(entry) => entry,
        Err(e) => {
            pending.rollback(image);
            return Err(e);
        }
    };

    // Everything is secured; from here on the image is only written.
    let blocks: Vec<u32> = pending
        .block_bits
        .iter()
        .map(|&bit| image.layout().data_block(bit) as u32)
        .collect();
    for (chunk_index, &block) in blocks.iter().enumerate() {
        let start = chunk_index * BLOCK_SIZE_BYTES;
        let chunk = &contents[start..contents.len().min(start + BLOCK_SIZE_BYTES)];
        let target = image.block_mut(block as u64);
        target[..chunk.len()].copy_from_slice(chunk);
        target[chunk.len()..].fill(0);
    }

    let mut inode = Inode::new_file(now, size, &blocks);

    entry.finalize();
    image.write_dirent(root_block, slot.slot, &entry);

    let mut root = root;
    root.size_bytes = ((slot.used_entries + 1) * DIRENT_SIZE) as u64;
    root.mtime = now;

    inode.finalize();
    image.write_inode(ino, &inode)?;
    root.finalize();
    image.write_inode(ROOT_INO, &root)?;
    image.finalize_superblock();

    info!(
        "Added '{}' as inode {} ({} bytes, blocks {:?})",
        name, ino, size, blocks
    );

    Ok(InjectReport {
        name: name.to_string(),
        inode: ino,
        size_bytes: size,
        blocks,
        root_size: root.size_bytes,
    })
}

/// Scan the root directory block for the first free slot while checking
/// that no live entry already uses `name`.
fn find_directory_slot(
    image: &Image,
    dir_block: u64,
    name: &str,
) -> Result<DirectorySlot, MiniVsfsError> {
    let mut free_slot = None;
    let mut used_entries = 0;

    for (slot, entry) in image.dirents(dir_block).iter().enumerate() {
        if entry.is_free() {
            free_slot.get_or_insert(slot);
            continue;
        }
        used_entries += 1;
        if entry.name_bytes() == name.as_bytes() {
            return Err(MiniVsfsError::AlreadyExists(name.to_string()));
        }
    }

    let slot = free_slot.ok_or(MiniVsfsError::DirectoryFull)?;
    debug!("Directory slot {} ({} entries in use)", slot, used_entries);
    Ok(DirectorySlot { slot, used_entries })
}
