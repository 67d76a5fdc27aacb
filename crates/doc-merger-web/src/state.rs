use doc_merger_core::{AppConfig, Merger};

/// Global application state
///
/// Holds no per-request data: every merge acquires and releases its own
/// render session.
pub struct AppState {
    pub config: AppConfig,
    pub merger: Merger,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let merger = Merger::new(&config);
        Self { config, merger }
    }

    /// Create with a custom merger, to swap the renderer in tests
    #[cfg(test)]
    pub const fn with_merger(config: AppConfig, merger: Merger) -> Self {
        Self { config, merger }
    }

    /// Largest request body accepted before decoding.
    ///
    /// Base64 inflates content by 4/3; the rest is headroom for JSON or
    /// multipart framing.
    pub const fn body_limit(&self) -> usize {
        self.config.limits.max_payload_bytes / 3 * 4 + 64 * 1024
    }
}
