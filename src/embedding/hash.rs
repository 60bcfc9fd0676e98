//! Deterministic digest-based embedding provider.
//!
//! Implements [`EmbeddingProvider`] without any model: the MD5 digest of the
//! text is partitioned into four big-endian u32 values, each mapped into
//! `[-1, 1]`, and the resulting 4-float pattern is tiled out to the target
//! dimensionality. Identical text always yields an identical vector across
//! calls and process restarts.
//!
//! This is a stand-in for a real embedding service: the similarity signal it
//! produces is weak by construction. The transform is kept exactly as-is for
//! behavioral compatibility with systems that already persist its output.

use md5::{Digest, Md5};

use super::EmbeddingProvider;

/// Deterministic pseudo-embedding provider.
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// A zero vector of the target dimensionality, the never-fail fallback.
    pub fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimension]
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let digest = Md5::digest(text.as_bytes());

        // Four 32-bit big-endian chunks, each mapped to [-1, 1].
        let mut base = [0.0f32; 4];
        for (i, chunk) in digest.chunks_exact(4).enumerate() {
            let raw = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            base[i] = (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32;
        }

        // Tile the base pattern until the target length, then truncate.
        let mut vector = Vec::with_capacity(self.dimension + base.len());
        while vector.len() < self.dimension {
            vector.extend_from_slice(&base);
        }
        vector.truncate(self.dimension);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}
