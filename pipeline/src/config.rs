use serde::Deserialize;

use pupil_engine::EngineConfig;

/// Controls pipeline behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Embedding network parameters.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Minimum cosine similarity for a comparison to count as a match.
    /// Range [-1, 1], higher is stricter. Default: 0.8.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,

    /// Worker threads for recognition sweeps. Default: 4.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_match_threshold() -> f32 {
    0.8
}

fn default_workers() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            match_threshold: default_match_threshold(),
            workers: default_workers(),
        }
    }
}
