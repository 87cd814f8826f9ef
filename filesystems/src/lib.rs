// On-disk MiniVSFS implementation
pub mod minivsfs;

pub use minivsfs::{
    build_image, inject_file, verify_image, Image, MiniVsfsFormatter, MiniVsfsInjector,
    VerificationReport,
};
pub use minivsfs::core::Layout;
