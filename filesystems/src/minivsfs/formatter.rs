// File-level entry points for MiniVSFS
// These wrap the in-memory builder and injector with reading the source
// files and persisting the finished image.

use crate::minivsfs::builder::{build_image, format_report};
use crate::minivsfs::core::{timestamps, Layout};
use crate::minivsfs::image::Image;
use crate::minivsfs::injector::{inject_file, validate_source};
use log::info;
use minivsfs_core::{
    FormatOptions, FormatReport, ImageFormatter, ImageInjector, InjectOptions, InjectReport,
    MiniVsfsError,
};
use std::io::ErrorKind;
use std::path::Path;

pub struct MiniVsfsFormatter;

impl ImageFormatter for MiniVsfsFormatter {
    fn name(&self) -> &'static str {
        "minivsfs"
    }

    fn validate_options(&self, options: &FormatOptions) -> Result<(), MiniVsfsError> {
        // Range checks plus the data-region check
        Layout::compute(options).map(|_| ())
    }

    fn dry_run(&self, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError> {
        let layout = Layout::compute(options)?;
        Ok(format_report(options, &layout, timestamps::now_epoch(), false))
    }

    fn format(&self, image: &Path, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError> {
        let now = timestamps::now_epoch();
        let built = build_image(options, now)?;
        built.save(image)?;
        info!("MiniVSFS created: {}", image.display());
        Ok(format_report(options, built.layout(), now, true))
    }
}

pub struct MiniVsfsInjector;

impl MiniVsfsInjector {
    /// Probe the host file and return the name it will be stored under.
    fn probe_source(path: &Path) -> Result<(String, u64), MiniVsfsError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MiniVsfsError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(MiniVsfsError::NotRegularFile(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                MiniVsfsError::InvalidInput(format!(
                    "'{}' has no UTF-8 file name",
                    path.display()
                ))
            })?
            .to_string();

        validate_source(&name, metadata.len())?;
        Ok((name, metadata.len()))
    }
}

impl ImageInjector for MiniVsfsInjector {
    fn name(&self) -> &'static str {
        "minivsfs"
    }

    fn inject(&self, options: &InjectOptions) -> Result<InjectReport, MiniVsfsError> {
        let (name, size) = Self::probe_source(&options.file)?;
        info!("Adding '{}' ({} bytes) from {}", name, size, options.file.display());

        let mut image = Image::open(&options.input)?;
        let contents = std::fs::read(&options.file)?;
        let report = inject_file(&mut image, &name, &contents, timestamps::now_epoch())?;
        image.save(&options.output)?;
        Ok(report)
    }
}
