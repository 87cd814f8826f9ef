use std::path::PathBuf;
use thiserror::Error;

/// Broad classes of failure. Every variant of [`MiniVsfsError`] belongs to
/// exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad options, bad source file, or an image that is not MiniVSFS.
    /// Raised before any allocation state is touched.
    Validation,
    /// The image ran out of inodes, data blocks, or directory slots.
    ResourceExhaustion,
    /// Reading or writing a file failed.
    Io,
}

#[derive(Debug, Error)]
pub enum MiniVsfsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Not a regular file: {}", .0.display())]
    NotRegularFile(PathBuf),

    #[error("Filename too long: '{name}' is {len} bytes (max {max})")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid filesystem magic number: 0x{found:08X}")]
    InvalidMagic { found: u32 },

    #[error("Corrupted image: {0}")]
    Corrupted(String),

    #[error("No free inodes")]
    NoFreeInodes,

    #[error("No free data blocks")]
    NoFreeDataBlocks,

    #[error("Root directory full")]
    DirectoryFull,

    #[error("File '{0}' already exists in filesystem")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl MiniVsfsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MiniVsfsError::NoFreeInodes
            | MiniVsfsError::NoFreeDataBlocks
            | MiniVsfsError::DirectoryFull => ErrorCategory::ResourceExhaustion,
            MiniVsfsError::IoError(_) | MiniVsfsError::SerializationError(_) => ErrorCategory::Io,
            _ => ErrorCategory::Validation,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    pub fn is_resource_exhaustion(&self) -> bool {
        self.category() == ErrorCategory::ResourceExhaustion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(MiniVsfsError::NoFreeInodes.category(), ErrorCategory::ResourceExhaustion);
        assert_eq!(MiniVsfsError::DirectoryFull.category(), ErrorCategory::ResourceExhaustion);
        assert!(MiniVsfsError::InvalidMagic { found: 0 }.is_validation());
        assert!(MiniVsfsError::AlreadyExists("a.txt".to_string()).is_validation());

        let io = MiniVsfsError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_error_messages() {
        let err = MiniVsfsError::InvalidMagic { found: 0x12345678 };
        assert_eq!(err.to_string(), "Invalid filesystem magic number: 0x12345678");

        let err = MiniVsfsError::AlreadyExists("a.txt".to_string());
        assert_eq!(err.to_string(), "File 'a.txt' already exists in filesystem");
    }
}
