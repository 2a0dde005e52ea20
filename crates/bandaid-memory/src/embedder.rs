use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::MemoryError;

/// Pluggable embedding backend. A real implementation wraps a sentence
/// transformer (`sentence-transformers/all-MiniLM-L6-v2` or equivalent,
/// dimension 384); tests and local development use [`HashEmbedder`].
/// Embedding must be a pure function of the input text.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// Deterministic stand-in embedder: hashes the text to seed a PRNG, fills a
/// vector of the configured dimension, and unit-normalizes it. Two calls
/// with the same text always produce the same vector, which is all the
/// `find_similar`/`absorb` dedup logic requires of a real embedder.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            // Splitmix64-style step: cheap, deterministic, decent spread.
            state = state.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
            let mixed = (state ^ (state >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
            let unit = (mixed >> 11) as f64 / (1u64 << 53) as f64;
            vector.push((unit as f32) - 0.5);
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
