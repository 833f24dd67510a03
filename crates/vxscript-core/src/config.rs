//! Build configuration.

/// Tunables of the builder and compiler.
///
/// ```
/// use vxscript_core::BuildConfig;
///
/// let config = BuildConfig::default().with_warnings_as_errors(true).with_switch_range_gap(8);
/// assert_eq!(config.switch_range_gap, 8);
/// assert!(config.emit_suspend);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Largest difference between adjacent case values that keeps them in one
    /// dispatch range of a `switch`.
    pub switch_range_gap: u32,
    /// Ranges with at least this many case values compile to a jump table,
    /// smaller ones to a chain of equality tests.
    pub switch_table_min_cases: usize,
    /// Record source lines for each statement.
    pub emit_line_info: bool,
    /// Emit `SUSPEND` once per loop iteration so the VM can yield.
    pub emit_suspend: bool,
    /// Report warnings as errors.
    pub warnings_as_errors: bool,
    /// Cap on retry passes over global initializers. `None` retries until no
    /// further initializer compiles.
    pub max_global_passes: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            switch_range_gap: 5,
            switch_table_min_cases: 3,
            emit_line_info: true,
            emit_suspend: true,
            warnings_as_errors: false,
            max_global_passes: None,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switch_range_gap(mut self, gap: u32) -> Self {
        self.switch_range_gap = gap;
        self
    }

    pub fn with_switch_table_min_cases(mut self, min: usize) -> Self {
        self.switch_table_min_cases = min.max(1);
        self
    }

    pub fn with_line_info(mut self, emit: bool) -> Self {
        self.emit_line_info = emit;
        self
    }

    pub fn with_suspend(mut self, emit: bool) -> Self {
        self.emit_suspend = emit;
        self
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn with_max_global_passes(mut self, passes: Option<usize>) -> Self {
        self.max_global_passes = passes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.switch_range_gap, 5);
        assert_eq!(config.switch_table_min_cases, 3);
        assert!(config.emit_line_info);
        assert!(!config.warnings_as_errors);
        assert_eq!(config.max_global_passes, None);
    }

    #[test]
    fn table_threshold_never_zero() {
        assert_eq!(BuildConfig::new().with_switch_table_min_cases(0).switch_table_min_cases, 1);
    }
}
