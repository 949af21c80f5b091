//! Process-wide core configuration.
//!
//! Read once at startup, typically from the environment, then handed to the
//! [`IndexRegistry`](crate::registry::IndexRegistry) which applies it to
//! every instance it creates.

use std::env;
use std::str::FromStr;

use crate::index::hnsw::HnswConfig;
use crate::index::lsh::LshConfig;
use crate::index::AlgorithmTag;

/// Configuration for the vector search core.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Width of every vector handled by this process (e.g. 1024 for
    /// Cohere embed-english-v3.0).
    pub dimension: usize,
    /// Algorithm used when callers do not name one.
    pub default_algorithm: AlgorithmTag,
    /// HNSW knobs.
    pub hnsw: HnswConfig,
    /// LSH knobs.
    pub lsh: LshConfig,
}

impl CoreConfig {
    /// Default dimension when `EMBEDDING_DIMENSION` is unset.
    pub const DEFAULT_DIMENSION: usize = 1024;

    /// Creates a config with the given dimension and default knobs.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            default_algorithm: AlgorithmTag::default(),
            hnsw: HnswConfig::default(),
            lsh: LshConfig::default(),
        }
    }

    /// Sets the default algorithm. Chainable.
    pub fn with_default_algorithm(mut self, algorithm: AlgorithmTag) -> Self {
        self.default_algorithm = algorithm;
        self
    }

    /// Reads configuration from the environment, falling back to defaults
    /// for unset or unparsable values.
    ///
    /// Recognized variables: `EMBEDDING_DIMENSION`, `DEFAULT_VECTOR_INDEX`
    /// (`hnsw` | `lsh` | `brute_force`), `HNSW_M`, `HNSW_M0`, `LSH_TABLES`,
    /// `LSH_HASH_BITS`, `LSH_SEED`.
    pub fn from_env() -> Self {
        let mut config = Self::new(env_parse("EMBEDDING_DIMENSION", Self::DEFAULT_DIMENSION));
        config.default_algorithm =
            env_parse("DEFAULT_VECTOR_INDEX", AlgorithmTag::default());
        config.hnsw.m = env_parse("HNSW_M", config.hnsw.m);
        config.hnsw.m0 = env_parse("HNSW_M0", config.hnsw.m0);
        config.lsh.tables = env_parse("LSH_TABLES", config.lsh.tables);
        config.lsh.hash_bits = env_parse("LSH_HASH_BITS", config.lsh.hash_bits).min(64);
        config.lsh.seed = env_parse("LSH_SEED", config.lsh.seed);
        config
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.dimension, 1024);
        assert_eq!(config.default_algorithm, AlgorithmTag::Hnsw);
        assert_eq!(config.hnsw.m, 16);
        assert_eq!(config.hnsw.m0, 32);
        assert_eq!(config.lsh.tables, 8);
        assert_eq!(config.lsh.hash_bits, 12);
    }

    #[test]
    fn test_with_default_algorithm() {
        let config = CoreConfig::new(4).with_default_algorithm(AlgorithmTag::Lsh);
        assert_eq!(config.default_algorithm, AlgorithmTag::Lsh);
    }

    // Environment-backed parsing is exercised through `env_parse` directly;
    // mutating process env in tests races with parallel test threads.
    #[test]
    fn test_env_parse_falls_back() {
        assert_eq!(env_parse("LODESTONE_TEST_UNSET_VAR", 7usize), 7);
    }
}
