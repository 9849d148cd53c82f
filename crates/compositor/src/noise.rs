//! Deterministic per-sample jitter.
//!
//! The GLSL composite shader carries a line-for-line copy of these functions;
//! both must produce the same bits for the same inputs.

use glam::Vec2;

/// PCG-RXS-M-XS 32-bit hash.
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Maps the top 24 bits of a hash to [-1, 1).
fn signed_unit(hash: u32) -> f32 {
    (hash >> 8) as f32 / 16_777_216.0 * 2.0 - 1.0
}

/// Offset for one motion-blur tap; each component lies in `[-amplitude, amplitude]`.
pub fn jitter(seed: u32, frame: u32, sample: u32, amplitude: f32) -> Vec2 {
    if amplitude == 0.0 {
        return Vec2::ZERO;
    }
    let h = pcg_hash(seed ^ pcg_hash(frame ^ pcg_hash(sample)));
    Vec2::new(signed_unit(h), signed_unit(pcg_hash(h))) * amplitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable() {
        assert_eq!(pcg_hash(0), pcg_hash(0));
        assert_ne!(pcg_hash(0), pcg_hash(1));
    }

    #[test]
    fn jitter_stays_within_amplitude() {
        for frame in 0..32 {
            for sample in 0..16 {
                let offset = jitter(7, frame, sample, 0.002);
                assert!(offset.x.abs() <= 0.002);
                assert!(offset.y.abs() <= 0.002);
            }
        }
    }

    #[test]
    fn jitter_depends_on_every_input() {
        let base = jitter(1, 2, 3, 0.01);
        assert_eq!(base, jitter(1, 2, 3, 0.01));
        assert_ne!(base, jitter(2, 2, 3, 0.01));
        assert_ne!(base, jitter(1, 3, 3, 0.01));
        assert_ne!(base, jitter(1, 2, 4, 0.01));
    }

    #[test]
    fn zero_amplitude_disables_jitter() {
        assert_eq!(jitter(9, 9, 9, 0.0), Vec2::ZERO);
    }
}
