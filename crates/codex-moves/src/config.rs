//! Environment-driven configuration for move processing.

use codex_core::defaults;

/// Defaults applied to move batches that don't set their own flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveConfig {
    /// Clear `last_indexed_at` on affected strands.
    pub update_embeddings: bool,
    /// Also rewrite strands that link into a moved path.
    pub rewrite_referencing: bool,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            update_embeddings: defaults::MOVE_UPDATE_EMBEDDINGS,
            rewrite_referencing: defaults::MOVE_REWRITE_REFERENCING,
        }
    }
}

impl MoveConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MOVE_UPDATE_EMBEDDINGS` | `false` | Flag moved strands for re-embedding |
    /// | `MOVE_REWRITE_REFERENCING` | `false` | Rewrite back-references too |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(default)
        };

        Self {
            update_embeddings: flag("MOVE_UPDATE_EMBEDDINGS", defaults::MOVE_UPDATE_EMBEDDINGS),
            rewrite_referencing: flag(
                "MOVE_REWRITE_REFERENCING",
                defaults::MOVE_REWRITE_REFERENCING,
            ),
        }
    }

    pub fn with_update_embeddings(mut self, enabled: bool) -> Self {
        self.update_embeddings = enabled;
        self
    }

    pub fn with_rewrite_referencing(mut self, enabled: bool) -> Self {
        self.rewrite_referencing = enabled;
        self
    }
}
