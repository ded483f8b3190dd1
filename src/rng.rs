//! Portable seeded PRNG (SPEC_FULL.md §4.7).
//!
//! A Mulberry32-equivalent 32-bit state machine. The state-transition
//! arithmetic below is written to match the reference JavaScript
//! implementation term-for-term (`a = a + 0x6D2B79F5 | 0; t = Math.imul(...)`)
//! so that a port of this crate to another language reproduces the same
//! bit sequence for the same seed, per the determinism guarantee this
//! spec makes a first-class requirement (logs, snapshots, and
//! simulation outputs are golden-tested across languages).

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Rng { state: seed }
    }

    /// One Mulberry32 step, returning a raw 32-bit word. All operations
    /// are wrapping 32-bit unsigned arithmetic, matching JavaScript's
    /// `| 0` / `>>> 0` ToInt32/ToUint32 coercions around `+`, `^`, `*`.
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61)) ^ t;
        t ^ (t >> 14)
    }

    /// Uniform float in `[0, 1)`.
    pub fn random_float(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    /// Uniform float in `(0, 1]`, used where a draw of exactly 0 would
    /// blow up a `ln` (Box-Muller, inverse-CDF exponential draws).
    fn random_float_nonzero(&mut self) -> f64 {
        1.0 - self.random_float()
    }

    /// Uniform integer in `[min, max]` inclusive.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        assert!(max >= min, "random_int: max must be >= min");
        let span = (max - min + 1) as f64;
        min + (self.random_float() * span).floor() as i64
    }

    /// Uniform `Decimal` in `[min, max)`.
    pub fn random_range(&mut self, min: Decimal, max: Decimal) -> Decimal {
        let span = max - min;
        let sample = Decimal::from_f64_retain(self.random_float()).unwrap_or(Decimal::ZERO);
        min + sample * span
    }

    pub fn random_choice<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "random_choice: items must not be empty");
        let idx = self.random_int(0, items.len() as i64 - 1) as usize;
        &items[idx]
    }

    /// Standard normal draw via the Box-Muller transform, scaled to
    /// `(mean, stddev)`.
    pub fn random_normal(&mut self, mean: f64, stddev: f64) -> f64 {
        let u1 = self.random_float_nonzero();
        let u2 = self.random_float();
        let z0 = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + stddev * z0
    }

    /// Exponential draw with rate `lambda` via inverse-CDF.
    pub fn random_exp(&mut self, lambda: f64) -> f64 {
        -(self.random_float_nonzero().ln()) / lambda
    }

    /// Derives an independent sub-stream deterministically from this
    /// RNG's next draw, per SPEC_FULL.md §4.7: callers that want an
    /// isolated stream (e.g. one per synthetic agent) fork rather than
    /// re-seed from wall-clock or a shared counter.
    pub fn fork(&mut self) -> Rng {
        Rng::new(self.next_u32())
    }
}
