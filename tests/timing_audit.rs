//! Qualitative constant-time audit for variable-base scalar multiplication.
//!
//! Wall-clock measurements on shared machines are noisy, so this check is
//! ignored by default; run it with `cargo test --release -- --ignored`. It
//! buckets scalars by Hamming weight and requires the per-bucket means to
//! stay within a loose factor of each other, which catches gross
//! data-dependent branching but not microarchitectural leakage.

use std::time::Instant;

use goldilocks448::{Point, Scalar, SER_BYTES};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

fn hamming_weight(bytes: &[u8]) -> u32 {
    bytes.iter().map(|b| b.count_ones()).sum()
}

#[test]
#[ignore]
fn scalarmul_time_is_independent_of_scalar_weight() {
    let mut rng = StdRng::seed_from_u64(0x6f6c6469);
    let mut hash = [0u8; 2 * SER_BYTES];
    rng.fill_bytes(&mut hash);
    let base = Point::from_uniform_hash(&hash);

    // Bucket 0: low-weight scalars; bucket 1: random; bucket 2: high-weight.
    let mut totals = [0u128; 3];
    let mut counts = [0u32; 3];

    for _ in 0..300 {
        let mut bytes = [0u8; SER_BYTES];
        rng.fill_bytes(&mut bytes);
        let scalar = Scalar::decode_long(&bytes);
        let weight = hamming_weight(&scalar.encode());
        let bucket = match weight {
            w if w < 200 => 0,
            w if w < 250 => 1,
            _ => 2,
        };

        let start = Instant::now();
        let _ = &base * &scalar;
        let elapsed = start.elapsed().as_nanos();
        totals[bucket] += elapsed;
        counts[bucket] += 1;
    }

    // Force the extreme buckets with crafted scalars.
    for fill in [0x01u8, 0xffu8] {
        for _ in 0..100 {
            let mut bytes = [fill; SER_BYTES];
            bytes[0] = (rng.next_u32() & 0xff) as u8;
            bytes[SER_BYTES - 1] = 0;
            let scalar = Scalar::decode_long(&bytes);
            let bucket = if fill == 0x01 { 0 } else { 2 };

            let start = Instant::now();
            let _ = &base * &scalar;
            totals[bucket] += start.elapsed().as_nanos();
            counts[bucket] += 1;
        }
    }

    let means: Vec<f64> = totals
        .iter()
        .zip(&counts)
        .filter(|(_, &c)| c > 0)
        .map(|(&t, &c)| t as f64 / c as f64)
        .collect();
    let max = means.iter().cloned().fold(f64::MIN, f64::max);
    let min = means.iter().cloned().fold(f64::MAX, f64::min);
    assert!(
        max / min < 1.25,
        "per-weight-bucket means diverge: {means:?}"
    );
}
