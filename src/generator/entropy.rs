//! Entropy sources for token generation and noise.
//!
//! The engine only ever asks for 64-bit words. Production engines use
//! [`SystemEntropy`]; tests inject [`SeededEntropy`] or [`ReplayEntropy`] to
//! get bit-identical token sequences.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

pub trait EntropySource: Send {
    fn next_word(&mut self) -> u64;
}

/// OS randomness mixed with a nanosecond clock and a call counter.
#[derive(Debug, Default)]
pub struct SystemEntropy {
    calls: u64,
}

impl SystemEntropy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntropySource for SystemEntropy {
    fn next_word(&mut self) -> u64 {
        self.calls = self.calls.wrapping_add(1);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        OsRng.next_u64() ^ nanos.rotate_left(17) ^ self.calls
    }
}

/// Deterministic stream from a seed.
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: StdRng,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn next_word(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

/// Replays a fixed word sequence, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ReplayEntropy {
    words: Vec<u64>,
    position: usize,
}

impl ReplayEntropy {
    /// An empty sequence replays zeros.
    pub fn new(words: Vec<u64>) -> Self {
        Self { words, position: 0 }
    }
}

impl EntropySource for ReplayEntropy {
    fn next_word(&mut self) -> u64 {
        if self.words.is_empty() {
            return 0;
        }
        let word = self.words[self.position % self.words.len()];
        self.position = self.position.wrapping_add(1);
        word
    }
}
