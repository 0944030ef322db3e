//! Tunables applied while a content model is resolved.
//==================================================================================CONF
/// Deepest chain of base containers, base commands and sub-container
/// inclusions followed before the walk is aborted.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;
/// Largest repeat or array count honoured; bigger counts are clamped.
pub const DEFAULT_MAX_REPEAT_COUNT: u64 = 65_536;
/// Iterations allowed when inverting a non-linear polynomial calibrator.
pub(crate) const POLYNOMIAL_INVERSION_MAX_ITERATIONS: usize = 64;
/// Relative tolerance used for numeric equality of calibrated values.
pub(crate) const NUMERIC_EQUALITY_TOLERANCE: f64 = 1e-9;

//==================================================================================MODEL_OPTIONS
/// Options controlling how a content model is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    /// Descend into excluded branches so their structure is still listed.
    pub show_all_conditions: bool,
    /// See [`DEFAULT_MAX_NESTING_DEPTH`].
    pub max_nesting_depth: usize,
    /// See [`DEFAULT_MAX_REPEAT_COUNT`].
    pub max_repeat_count: u64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            show_all_conditions: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_repeat_count: DEFAULT_MAX_REPEAT_COUNT,
        }
    }
}

impl ModelOptions {
    pub fn with_show_all_conditions(mut self, show_all_conditions: bool) -> Self {
        self.show_all_conditions = show_all_conditions;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_max_repeat_count(mut self, count: u64) -> Self {
        self.max_repeat_count = count;
        self
    }
}
