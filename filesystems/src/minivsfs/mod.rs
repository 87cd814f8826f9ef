// MiniVSFS: single-directory filesystem images with bitmap allocation and
// checksummed metadata

pub mod builder;
pub mod core;
pub mod formatter;
pub mod image;
pub mod injector;
pub mod verify;

// Re-export main entry points
pub use self::builder::build_image;
pub use self::formatter::{MiniVsfsFormatter, MiniVsfsInjector};
pub use self::image::Image;
pub use self::injector::inject_file;
pub use self::verify::{verify_image, VerificationReport};
