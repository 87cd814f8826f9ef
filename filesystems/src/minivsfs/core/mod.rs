// Core MiniVSFS format modules

pub mod bitmap;
pub mod checksum;
pub mod constants;
pub mod layout;
pub mod structures;
pub mod timestamps;

// Re-export commonly used items
pub use bitmap::{find_free_bit, set_bit, Bitmap};
pub use checksum::crc32;
pub use constants::*;
pub use layout::Layout;
pub use structures::{DirEntry, FileType, Inode, Superblock};
