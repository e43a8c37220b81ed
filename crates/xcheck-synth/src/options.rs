use xcheck_hash::DEFAULT_MAX_HASH_DEPTH;

/// Engine-wide options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Lowest-precedence disable flag, below file and function settings.
    pub disable_xchecks: bool,
    /// Depth budget passed to top-level hash routine calls.
    pub max_hash_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            disable_xchecks: false,
            max_hash_depth: DEFAULT_MAX_HASH_DEPTH,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_disable_xchecks(mut self, disable: bool) -> Self {
        self.disable_xchecks = disable;
        self
    }

    #[must_use]
    pub const fn with_max_hash_depth(mut self, depth: usize) -> Self {
        self.max_hash_depth = depth;
        self
    }
}
