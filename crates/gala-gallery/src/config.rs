use gala_core::{GroupingConfig, GroupingStrategy, DEFAULT_MAX_MATCHES, DEFAULT_SIMILARITY_THRESHOLD};

/// Gallery service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Match threshold in percent for the grouping pass.
    pub similarity_threshold: f32,
    /// Result cap per recognition search call.
    pub max_matches: usize,
    /// Which grouping strategy to run.
    pub strategy: GroupingStrategy,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_matches: DEFAULT_MAX_MATCHES,
            strategy: GroupingStrategy::PerFace,
        }
    }
}

impl GalleryConfig {
    /// Load configuration from `GALA_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let strategy = match std::env::var("GALA_STRATEGY").as_deref() {
            Ok("whole-image") => GroupingStrategy::WholeImage,
            Ok("per-face") | Err(_) => GroupingStrategy::PerFace,
            Ok(other) => {
                tracing::warn!(value = other, "unknown GALA_STRATEGY; using per-face");
                GroupingStrategy::PerFace
            }
        };
        Self {
            similarity_threshold: env_f32("GALA_SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD),
            max_matches: env_usize("GALA_MAX_MATCHES", DEFAULT_MAX_MATCHES),
            strategy,
        }
    }

    pub fn grouping(&self) -> GroupingConfig {
        GroupingConfig {
            strategy: self.strategy,
            similarity_threshold: self.similarity_threshold,
            max_matches: self.max_matches,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
