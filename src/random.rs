use rand::Rng;

/// Randomness used by the presentation layer; swapped for a fixed source in
/// tests.
pub trait RandomSource: Send + Sync {
    /// Uniform pick in `low..=high`. Returns `low` when the range is empty.
    fn pick_in(&self, low: u64, high: u64) -> u64;

    /// Uniform index into a collection of `len` items.
    fn pick_index(&self, len: usize) -> Option<usize>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick_in(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        rand::rng().random_range(low..=high)
    }

    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(rand::rng().random_range(0..len))
    }
}

/// Always answers with the same offset, clamped to the requested range.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedRandom(pub u64);

impl RandomSource for FixedRandom {
    fn pick_in(&self, low: u64, high: u64) -> u64 {
        low.saturating_add(self.0).min(high.max(low))
    }

    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some((self.0 as usize).min(len - 1))
    }
}
