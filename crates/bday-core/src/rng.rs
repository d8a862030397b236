//! Multiply-with-rotate bit generators.
//!
//! Both generators keep an accumulator `x` and a multiplier-accumulator `w`
//! and advance with `x = rotr(x * w, 32); w += x`. [`Mxws32`] runs one such
//! stream and emits its low 32 bits; [`Mxws64`] runs two independent streams
//! side by side and concatenates them, which hides the bit correlation a
//! single stream shows when consumed 64 bits at a time.
//!
//! Same seed and same call sequence always yield the same outputs.

use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Multiplier state used when no usable seed is available.
pub const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// 2^53, the number of distinct doubles in `[0, 1)` at full precision.
const TWO_POW_53: f64 = 9_007_199_254_740_992.0;

/// 2^32.
const TWO_POW_32: f64 = 4_294_967_296.0;

/// A seedable source of uniformly distributed raw bits.
///
/// Range helpers reduce draws with a plain modulo. When `max + 1` does not
/// divide the output range the low values are very slightly favored; for the
/// bucket counts this crate deals in (hundreds against 2^64) the bias is far
/// below Monte-Carlo noise, and the speed matters more.
pub trait BitGenerator {
    /// Number of significant bits in each value returned by [`next_bits`].
    ///
    /// [`next_bits`]: BitGenerator::next_bits
    const OUTPUT_BITS: u32;

    /// Advance the state and return the next raw draw.
    fn next_bits(&mut self) -> u64;

    /// Next float in `[0, 1)` built from the top bits of one draw.
    fn next_unit(&mut self) -> f64;

    /// Value in `[0, max]`, computed as `next_bits() % (max + 1)`.
    ///
    /// A `max` at or above the generator's largest output returns the raw
    /// draw, so a 32-bit generator never exceeds `u32::MAX`.
    #[inline]
    fn next_at_most(&mut self, max: u64) -> u64 {
        let largest = u64::MAX >> (64 - Self::OUTPUT_BITS.clamp(1, 64));
        if max >= largest {
            return self.next_bits();
        }
        self.next_bits() % (max + 1)
    }

    /// Value in `[min, max]`, computed as `min + next_bits() % (max - min + 1)`.
    ///
    /// Bounds given in the wrong order are swapped.
    #[inline]
    fn next_in_range(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = hi.abs_diff(lo);
        lo.wrapping_add_unsigned(self.next_at_most(span))
    }

    /// Float in `[0, scale)`.
    #[inline]
    fn next_f64(&mut self, scale: f64) -> f64 {
        self.next_unit() * scale
    }

    /// Float in `[min, max)`, an affine map of [`next_unit`](BitGenerator::next_unit).
    #[inline]
    fn next_f64_in(&mut self, min: f64, max: f64) -> f64 {
        self.next_unit().mul_add(max - min, min)
    }

    /// Float draw in `[0, scale)` rounded to the nearest integer, ties to even.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn next_rounded(&mut self, scale: f64) -> i64 {
        self.next_f64(scale).round_ties_even() as i64
    }

    /// Float draw in `[min, max)` rounded to the nearest integer, ties to even.
    ///
    /// Integral bounds give values in `[min, max]`; the endpoints come up
    /// half as often as interior values.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn next_rounded_in(&mut self, min: f64, max: f64) -> i64 {
        self.next_f64_in(min, max).round_ties_even() as i64
    }
}

/// One multiply-with-rotate step.
#[inline(always)]
const fn step(x: &mut u64, w: &mut u64) -> u64 {
    *x = x.wrapping_mul(*w).rotate_right(32);
    *w = w.wrapping_add(*x);
    *x
}

/// SplitMix64 finalizer; spreads small or adjacent seeds over the state space.
const fn mix_seed(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A zero multiplier pins the stream at zero forever.
const fn nonzero_multiplier(w: u64) -> u64 {
    if w == 0 { DEFAULT_SEED } else { w }
}

/// Draw a 64-bit base seed from the operating system.
///
/// Falls back to [`DEFAULT_SEED`] (and logs a warning) when the entropy
/// source is unavailable, so runs seeded this way are then reproducible
/// rather than unique.
#[must_use]
pub fn entropy_seed() -> u64 {
    let mut buf = [0_u8; 8];
    match OsRng.try_fill_bytes(&mut buf) {
        Ok(()) => {
            let hi = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
            let lo = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
            (u64::from(hi) << 32) | u64::from(lo)
        }
        Err(err) => {
            warn!(%err, seed = DEFAULT_SEED, "entropy source unavailable, using default seed");
            DEFAULT_SEED
        }
    }
}

/// Single-stream generator emitting 32-bit values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mxws32 {
    x: u64,
    w: u64,
}

impl Mxws32 {
    /// Deterministic generator for `seed`.
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self::with_multiplier(mix_seed(seed))
    }

    /// Generator whose multiplier state is `(hi << 32) | lo`, unmixed.
    #[must_use]
    pub const fn from_words(hi: u32, lo: u32) -> Self {
        Self::with_multiplier(((hi as u64) << 32) | lo as u64)
    }

    /// Generator seeded from the operating system's entropy source.
    #[must_use]
    pub fn from_os_entropy() -> Self {
        Self::with_multiplier(entropy_seed())
    }

    const fn with_multiplier(w: u64) -> Self {
        Self {
            x: 1,
            w: nonzero_multiplier(w),
        }
    }

    /// Next 32-bit value.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn next_u32(&mut self) -> u32 {
        step(&mut self.x, &mut self.w) as u32
    }
}

impl BitGenerator for Mxws32 {
    const OUTPUT_BITS: u32 = 32;

    #[inline]
    fn next_bits(&mut self) -> u64 {
        u64::from(self.next_u32())
    }

    #[inline]
    fn next_unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

/// Two interleaved streams combined into 64-bit values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mxws64 {
    x1: u64,
    w1: u64,
    x2: u64,
    w2: u64,
}

impl Mxws64 {
    /// Deterministic generator for `seed`.
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self::with_multiplier(mix_seed(seed))
    }

    /// Generator whose first multiplier is `(hi << 32) | lo`, unmixed.
    #[must_use]
    pub const fn from_words(hi: u32, lo: u32) -> Self {
        Self::with_multiplier(((hi as u64) << 32) | lo as u64)
    }

    /// Generator seeded from the operating system's entropy source.
    #[must_use]
    pub fn from_os_entropy() -> Self {
        Self::with_multiplier(entropy_seed())
    }

    const fn with_multiplier(w: u64) -> Self {
        let w1 = nonzero_multiplier(w);
        Self {
            x1: 1,
            w1,
            x2: 1,
            w2: nonzero_multiplier(w1.wrapping_add(1)),
        }
    }

    /// Next 64-bit value: stream one in the high half, stream two in the low.
    #[inline]
    pub const fn next_u64(&mut self) -> u64 {
        let hi = step(&mut self.x1, &mut self.w1);
        let lo = step(&mut self.x2, &mut self.w2);
        (hi << 32) | (lo & 0xFFFF_FFFF)
    }
}

impl BitGenerator for Mxws64 {
    const OUTPUT_BITS: u32 = 64;

    #[inline]
    fn next_bits(&mut self) -> u64 {
        self.next_u64()
    }

    #[inline]
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / TWO_POW_53
    }
}

fn fill_via_u64(dest: &mut [u8], mut next: impl FnMut() -> u64) {
    for chunk in dest.chunks_mut(8) {
        let bytes = next().to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}

impl RngCore for Mxws32 {
    fn next_u32(&mut self) -> u32 {
        Self::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(Self::next_u32(self));
        let lo = u64::from(Self::next_u32(self));
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        fill_via_u64(dest, || RngCore::next_u64(self));
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl RngCore for Mxws64 {
    #[allow(clippy::cast_possible_truncation)]
    fn next_u32(&mut self) -> u32 {
        (Self::next_u64(self) >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        Self::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        fill_via_u64(dest, || Self::next_u64(self));
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mxws32 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::with_seed(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::with_seed(state)
    }
}

impl SeedableRng for Mxws64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::with_seed(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::with_seed(state)
    }
}
