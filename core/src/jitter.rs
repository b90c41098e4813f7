//! Random wobble applied on top of intonation curves.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;
use std::sync::Mutex;

/// Source of uniform jitter.
///
/// `sample(amount)` returns a value in `[-amount, amount]`; non-positive or
/// non-finite amounts always yield `0.0`.
pub trait JitterSource: Send + Sync + Debug {
    fn sample(&self, amount: f32) -> f32;
}

fn usable(amount: f32) -> bool {
    amount.is_finite() && amount > 0.0
}

/// Thread-local generator, the default for every table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadJitter;

impl JitterSource for ThreadJitter {
    fn sample(&self, amount: f32) -> f32 {
        if !usable(amount) {
            return 0.0;
        }
        rand::thread_rng().gen_range(-amount..=amount)
    }
}

/// Reproducible jitter from a fixed seed
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&self, amount: f32) -> f32 {
        if !usable(amount) {
            return 0.0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(-amount..=amount)
    }
}

/// Always lands at the same fraction of the jitter range.
///
/// `FixedJitter(0.0)` disables jitter, `FixedJitter(1.0)` always picks the upper bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedJitter(pub f32);

impl JitterSource for FixedJitter {
    fn sample(&self, amount: f32) -> f32 {
        if !usable(amount) {
            return 0.0;
        }
        amount * self.0.clamp(-1.0, 1.0)
    }
}
