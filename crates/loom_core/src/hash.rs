//! Hash folding helpers.
//!
//! Generated programs are cached by a content hash built from every piece of
//! declared state that affects the emitted source. [`HashFolder`] accumulates
//! such a hash value by value; [`hash_f32_bits`] is the single place where
//! floating point values enter a hash.

use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;

/// Returns the bit pattern of `value` for hashing.
///
/// Floats are hashed by their exact IEEE-754 representation so that two
/// configurations hash equal only when their constants are bit-identical.
/// Two consequences follow and are accepted:
///
/// - `+0.0` and `-0.0` compare equal but hash differently.
/// - NaN values hash by payload, so distinct NaNs hash differently while a
///   NaN still hashes consistently with itself.
#[inline]
#[must_use]
pub fn hash_f32_bits(value: f32) -> u32 {
    value.to_bits()
}

/// Mixes `value` into `seed`.
///
/// The step is order dependent and not idempotent: folding the same value
/// twice yields a different result than folding it once.
#[inline]
#[must_use]
pub fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Incremental hash accumulator.
///
/// ```rust,ignore
/// let mut folder = HashFolder::new();
/// folder.fold(&sampler_index).fold(&texture_type).fold_f32(factor);
/// let key = folder.finish();
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashFolder {
    state: u64,
}

impl HashFolder {
    #[must_use]
    pub const fn new() -> Self {
        Self { state: 0 }
    }

    /// Starts from an existing hash, e.g. a base hash computed elsewhere.
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Folds any hashable value.
    #[inline]
    pub fn fold<T: Hash + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.state = hash_combine(self.state, FxBuildHasher.hash_one(value));
        self
    }

    /// Folds a float by its bit pattern, see [`hash_f32_bits`].
    #[inline]
    pub fn fold_f32(&mut self, value: f32) -> &mut Self {
        self.fold(&hash_f32_bits(value))
    }

    /// Folds an already computed hash without rehashing it.
    #[inline]
    pub fn fold_hash(&mut self, hash: u64) -> &mut Self {
        self.state = hash_combine(self.state, hash);
        self
    }

    #[inline]
    #[must_use]
    pub fn finish(&self) -> u64 {
        self.state
    }
}
