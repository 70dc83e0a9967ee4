//! Configuration for discount resolution.

/// Controls how the resolution pipeline uses its cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionConfig {
    /// Consult the cache before falling back to the repository.
    ///
    /// When disabled every request goes to the repository.
    pub cache_reads: bool,
    /// Write repository results back to the cache through the staleness
    /// guard.
    pub write_back: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            cache_reads: true,
            write_back: true,
        }
    }
}

impl ResolutionConfig {
    /// Enables or disables cache reads.
    pub fn with_cache_reads(mut self, enabled: bool) -> Self {
        self.cache_reads = enabled;
        self
    }

    /// Enables or disables cache write-back.
    pub fn with_write_back(mut self, enabled: bool) -> Self {
        self.write_back = enabled;
        self
    }
}
