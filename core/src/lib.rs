pub mod error;
pub mod filesystem;
pub mod format;

pub use error::{ErrorCategory, MiniVsfsError};
pub use filesystem::{
    FormatOptions, FormatReport, ImageFormatter, ImageInjector, InjectOptions, InjectReport,
    RegionInfo,
};
pub use format::FormatManager;
