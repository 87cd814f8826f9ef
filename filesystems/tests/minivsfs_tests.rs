// End-to-end tests for MiniVSFS format and inject through the file-level API

use minivsfs_core::{
    ErrorCategory, FormatOptions, ImageFormatter, ImageInjector, InjectOptions, InjectReport,
    MiniVsfsError,
};
use minivsfs_filesystems::{verify_image, Image, Layout, MiniVsfsFormatter, MiniVsfsInjector};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAX_FILE: usize = 12 * 4096;

fn format_image(dir: &TempDir, size_kib: u64, inodes: u64) -> PathBuf {
    let path = dir.path().join("fs.img");
    MiniVsfsFormatter
        .format(&path, &FormatOptions::new(size_kib, inodes))
        .unwrap();
    path
}

fn write_source(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let sources = dir.path().join("src");
    fs::create_dir_all(&sources).unwrap();
    let path = sources.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn inject(input: &Path, output: &Path, file: &Path) -> Result<InjectReport, MiniVsfsError> {
    MiniVsfsInjector.inject(&InjectOptions {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        file: file.to_path_buf(),
    })
}

#[test]
fn test_format_round_trip_matches_layout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();

    for (size_kib, inodes) in [(180, 128), (1024, 300), (4096, 512)] {
        let path = dir.path().join(format!("fs-{}-{}.img", size_kib, inodes));
        let options = FormatOptions::new(size_kib, inodes);
        let report = MiniVsfsFormatter.format(&path, &options).unwrap();
        assert!(report.written);

        let expected = Layout::compute(&options).unwrap();
        let image = Image::open(&path).unwrap();
        assert_eq!(*image.layout(), expected);
        assert_eq!(fs::metadata(&path).unwrap().len(), expected.total_blocks * 4096);
        assert!(verify_image(&image).is_valid);
    }
}

#[test]
fn test_format_rejects_bad_options_without_writing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fs.img");

    for (size_kib, inodes) in [(179, 128), (4100, 128), (181, 128), (180, 100), (180, 600)] {
        let err = MiniVsfsFormatter
            .format(&path, &FormatOptions::new(size_kib, inodes))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!path.exists());
    }
}

#[test]
fn test_inject_scenario_on_disk() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);
    let output = dir.path().join("out.img");
    let source = write_source(&dir, "a.txt", &vec![b'a'; 5000]);

    let report = inject(&image, &output, &source).unwrap();
    assert_eq!(report.name, "a.txt");
    assert_eq!(report.inode, 2);
    assert_eq!(report.blocks, vec![8, 9]);
    assert_eq!(report.root_size, 192);

    let bytes = fs::read(&output).unwrap();
    // Inode bitmap block 1, data bitmap block 2
    assert_eq!(bytes[4096], 0b0000_0011);
    assert_eq!(bytes[2 * 4096], 0b0000_0111);
    assert_eq!(&bytes[8 * 4096..8 * 4096 + 4096], &vec![b'a'; 4096][..]);

    let parsed = Image::from_bytes(bytes).unwrap();
    let verification = verify_image(&parsed);
    assert!(verification.is_valid, "{:?}", verification.errors);
    assert_eq!(verification.stats.files, 1);
}

#[test]
fn test_inject_leaves_source_image_untouched() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);
    let before = fs::read(&image).unwrap();
    let output = dir.path().join("out.img");
    let source = write_source(&dir, "b.bin", b"payload");

    inject(&image, &output, &source).unwrap();
    assert_eq!(fs::read(&image).unwrap(), before);
    assert_ne!(fs::read(&output).unwrap(), before);
}

#[test]
fn test_inject_in_place() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);
    let first = write_source(&dir, "one", b"1");
    let second = write_source(&dir, "two", b"2");

    inject(&image, &image, &first).unwrap();
    let report = inject(&image, &image, &second).unwrap();
    assert_eq!(report.inode, 3);
    assert_eq!(report.blocks, vec![9]);
    assert_eq!(report.root_size, 4 * 64);
}

#[test]
fn test_duplicate_name_fails_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);
    let source = write_source(&dir, "dup.txt", b"first");
    inject(&image, &image, &source).unwrap();
    let before = fs::read(&image).unwrap();

    let output = dir.path().join("second.img");
    let err = inject(&image, &output, &source).unwrap_err();
    assert!(matches!(err, MiniVsfsError::AlreadyExists(ref name) if name == "dup.txt"));
    assert!(!output.exists());
    assert_eq!(fs::read(&image).unwrap(), before);
}

#[test]
fn test_file_size_boundary() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);

    let exact = write_source(&dir, "exact.bin", &vec![1u8; MAX_FILE]);
    let report = inject(&image, &image, &exact).unwrap();
    assert_eq!(report.blocks.len(), 12);

    let over = write_source(&dir, "over.bin", &vec![1u8; MAX_FILE + 1]);
    let err = inject(&image, &image, &over).unwrap_err();
    assert!(matches!(err, MiniVsfsError::FileTooLarge { size, .. } if size == MAX_FILE as u64 + 1));
}

#[test]
fn test_filename_length_boundary() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);

    let ok = write_source(&dir, &"n".repeat(57), b"x");
    assert!(inject(&image, &image, &ok).is_ok());

    let long = write_source(&dir, &"m".repeat(58), b"x");
    let err = inject(&image, &image, &long).unwrap_err();
    assert!(matches!(err, MiniVsfsError::NameTooLong { len: 58, max: 57, .. }));
}

#[test]
fn test_missing_and_non_regular_sources() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);

    let err = inject(&image, &image, &dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, MiniVsfsError::FileNotFound(_)));

    let err = inject(&image, &image, dir.path()).unwrap_err();
    assert!(matches!(err, MiniVsfsError::NotRegularFile(_)));
}

#[test]
fn test_rejects_foreign_image() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("bogus.img");
    fs::write(&bogus, vec![0u8; 45 * 4096]).unwrap();
    let source = write_source(&dir, "a.txt", b"x");

    let err = inject(&bogus, &dir.path().join("out.img"), &source).unwrap_err();
    assert!(matches!(err, MiniVsfsError::InvalidMagic { found: 0 }));
    assert!(err.is_validation());
}

#[test]
fn test_data_region_exhaustion() {
    let dir = TempDir::new().unwrap();
    let image = format_image(&dir, 180, 128);

    // 37 free data blocks: three full files use 36
    for i in 0..3 {
        let source = write_source(&dir, &format!("big{}", i), &vec![i as u8; MAX_FILE]);
        inject(&image, &image, &source).unwrap();
    }
    let before = fs::read(&image).unwrap();

    let two_blocks = write_source(&dir, "two", &vec![9u8; 4097]);
    let err = inject(&image, &image, &two_blocks).unwrap_err();
    assert!(matches!(err, MiniVsfsError::NoFreeDataBlocks));
    assert_eq!(fs::read(&image).unwrap(), before);

    let one_block = write_source(&dir, "one", &vec![9u8; 4096]);
    let report = inject(&image, &image, &one_block).unwrap();
    assert_eq!(report.blocks, vec![44]);
}

#[test]
fn test_root_directory_fills_before_inodes() {
    let dir = TempDir::new().unwrap();
    let path = format_image(&dir, 1024, 128);
    let mut image = Image::open(&path).unwrap();

    for i in 0..62 {
        minivsfs_filesystems::inject_file(&mut image, &format!("file{:03}", i), b"", 1).unwrap();
    }
    let err = minivsfs_filesystems::inject_file(&mut image, "file062", b"", 1).unwrap_err();
    assert!(matches!(err, MiniVsfsError::DirectoryFull));

    let report = verify_image(&image);
    assert!(report.is_valid, "{:?}", report.errors);
    assert_eq!(report.stats.inodes_used, 63);
    assert_eq!(report.stats.files, 62);
}
