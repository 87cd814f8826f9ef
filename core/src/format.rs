use crate::{
    FormatOptions, FormatReport, ImageFormatter, ImageInjector, InjectOptions, InjectReport,
    MiniVsfsError,
};
use std::path::Path;
use std::sync::Arc;

/// Front door for both image operations. Options are validated before the
/// backend is asked to do anything.
pub struct FormatManager {
    formatter: Arc<dyn ImageFormatter>,
    injector: Arc<dyn ImageInjector>,
}

impl FormatManager {
    pub fn new(formatter: Arc<dyn ImageFormatter>, injector: Arc<dyn ImageInjector>) -> Self {
        Self { formatter, injector }
    }

    pub fn simulate_format(&self, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError> {
        self.formatter.validate_options(options)?;
        self.formatter.dry_run(options)
    }

    pub fn execute_format(
        &self,
        image: &Path,
        options: &FormatOptions,
    ) -> Result<FormatReport, MiniVsfsError> {
        self.formatter.validate_options(options)?;
        self.formatter.format(image, options)
    }

    pub fn execute_inject(&self, options: &InjectOptions) -> Result<InjectReport, MiniVsfsError> {
        self.injector.inject(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingFormatter {
        formats: Cell<u32>,
    }

    impl ImageFormatter for CountingFormatter {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn validate_options(&self, options: &FormatOptions) -> Result<(), MiniVsfsError> {
            options.validate()
        }

        fn dry_run(&self, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError> {
            Ok(FormatReport {
                options: options.clone(),
                total_blocks: options.size_kib / 4,
                regions: Vec::new(),
                built_at: 0,
                written: false,
            })
        }

        fn format(&self, _image: &Path, options: &FormatOptions) -> Result<FormatReport, MiniVsfsError> {
            self.formats.set(self.formats.get() + 1);
            let mut report = self.dry_run(options)?;
            report.written = true;
            Ok(report)
        }
    }

    struct NoInjector;

    impl ImageInjector for NoInjector {
        fn name(&self) -> &'static str {
            "none"
        }

        fn inject(&self, _options: &InjectOptions) -> Result<InjectReport, MiniVsfsError> {
            Err(MiniVsfsError::InvalidInput("injection disabled".to_string()))
        }
    }

    #[test]
    fn test_invalid_options_never_reach_backend() {
        let formatter = Arc::new(CountingFormatter::default());
        let manager = FormatManager::new(formatter.clone(), Arc::new(NoInjector));

        let err = manager
            .execute_format(Path::new("unused.img"), &FormatOptions::new(100, 128))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(formatter.formats.get(), 0);

        let report = manager
            .execute_format(Path::new("unused.img"), &FormatOptions::new(180, 128))
            .unwrap();
        assert!(report.written);
        assert_eq!(formatter.formats.get(), 1);
    }

    #[test]
    fn test_simulate_does_not_format() {
        let formatter = Arc::new(CountingFormatter::default());
        let manager = FormatManager::new(formatter.clone(), Arc::new(NoInjector));

        let report = manager.simulate_format(&FormatOptions::new(180, 128)).unwrap();
        assert!(!report.written);
        assert_eq!(report.total_blocks, 45);
        assert_eq!(formatter.formats.get(), 0);
    }
}
