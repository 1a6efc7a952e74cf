/// PSEUDO-RANDOM INDEX SELECTION
///
/// Oracle indexes and request indexes are drawn through an injected
/// `RandomSource`, so the ledger entropy can be swapped for a scripted
/// sequence in tests.

use sha2::{Digest, Sha256};
use std::collections::VecDeque;

pub trait RandomSource: Send {
    /// Draw a value in `[0, range)`; `seed` carries caller-supplied material
    /// (identity, counters, ledger entropy). `range` must be non-zero.
    fn draw(&mut self, seed: &[u8], range: u8) -> u8;
}

/// Hash-based source: `sha256(seed || nonce)`, reduced modulo the range.
#[derive(Debug, Clone, Default)]
pub struct HashRandomSource {
    nonce: u64,
}

impl HashRandomSource {
    pub fn new() -> Self {
        HashRandomSource { nonce: 0 }
    }
}

impl RandomSource for HashRandomSource {
    fn draw(&mut self, seed: &[u8], range: u8) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(self.nonce.to_be_bytes());
        self.nonce = self.nonce.wrapping_add(1);
        let digest = hasher.finalize();
        digest[0] % range
    }
}

/// Replays a fixed sequence of values, then falls back to hashing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandomSource {
    script: VecDeque<u8>,
    fallback: HashRandomSource,
}

impl ScriptedRandomSource {
    pub fn new(values: impl IntoIterator<Item = u8>) -> Self {
        ScriptedRandomSource {
            script: values.into_iter().collect(),
            fallback: HashRandomSource::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for ScriptedRandomSource {
    fn draw(&mut self, seed: &[u8], range: u8) -> u8 {
        match self.script.pop_front() {
            Some(value) => value % range,
            None => self.fallback.draw(seed, range),
        }
    }
}
