//! Client settings applied on initialization

/// Settings handed to the backend when the bridge initializes a client
///
/// The defaults match what the bridge has always asked for: an on-disk cache
/// with no size limit and persistence switched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Whether to enable local persistent storage
    ///
    /// When enabled, the client caches documents locally and serves them when
    /// offline.
    ///
    /// Default: true
    pub persistence_enabled: bool,

    /// Cache size threshold for on-disk data in bytes
    ///
    /// Set to [`Settings::CACHE_SIZE_UNLIMITED`] to disable garbage collection.
    ///
    /// Default: unlimited
    pub cache_size_bytes: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            persistence_enabled: true,
            cache_size_bytes: Self::CACHE_SIZE_UNLIMITED,
        }
    }
}

impl Settings {
    /// Constant to use with cache_size_bytes to disable garbage collection
    pub const CACHE_SIZE_UNLIMITED: i64 = -1;

    /// Creates default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cache is allowed to grow without bound
    pub fn is_cache_unlimited(&self) -> bool {
        self.cache_size_bytes == Self::CACHE_SIZE_UNLIMITED
    }
}
