// MiniVSFS image builder (format)
// Lays out a fresh image holding only the root directory.

use crate::minivsfs::core::{
    DirEntry, FileType, Inode, Layout, Superblock, ROOT_INO,
};
use crate::minivsfs::image::Image;
use log::{debug, info};
use minivsfs_core::{FormatOptions, FormatReport, MiniVsfsError};

/// Build a complete image in memory. `build_time` is recorded in the
/// superblock and in all three root inode timestamps.
pub fn build_image(options: &FormatOptions, build_time: u64) -> Result<Image, MiniVsfsError> {
    let layout = Layout::compute(options)?;
    info!(
        "MiniVSFS layout: {} blocks, inode table {}+{}, data region {}+{}",
        layout.total_blocks,
        layout.inode_table_start,
        layout.inode_table_blocks,
        layout.data_region_start,
        layout.data_region_blocks
    );

    let superblock = Superblock::new(&layout, build_time);
    let mut image = Image::zeroed(layout, superblock);

    // Root inode takes inode bit 0, its directory block takes data bit 0
    image.inode_bitmap().set(ROOT_INO - 1);
    image.data_bitmap().set(0);

    let root_block = layout.data_block(0);
    let mut dot = DirEntry::new(ROOT_INO, FileType::Directory, ".")?;
    let mut dotdot = DirEntry::new(ROOT_INO, FileType::Directory, "..")?;
    dot.finalize();
    dotdot.finalize();
    image.write_dirent(root_block, 0, &dot);
    image.write_dirent(root_block, 1, &dotdot);

    let mut root = Inode::new_root(build_time, root_block as u32);
    root.finalize();
    image.write_inode(ROOT_INO, &root)?;
    debug!("Root inode: {:?}", root);

    image.finalize_superblock();
    Ok(image)
}

/// Summary of a build, shared by dry runs and real formats.
pub fn format_report(
    options: &FormatOptions,
    layout: &Layout,
    built_at: u64,
    written: bool,
) -> FormatReport {
    FormatReport {
        options: options.clone(),
        total_blocks: layout.total_blocks,
        regions: layout.regions(),
        built_at,
        written,
    }
}
