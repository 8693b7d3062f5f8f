use ndarray::Array3;
use rand::Rng;

use crate::text::length_to_mask;

/// Lower bound on `u1` in the Box-Muller transform, avoiding `ln(0)`.
const BOX_MULLER_EPSILON: f32 = 1e-4;

/// Draw one standard-normal sample via Box-Muller, matching the distilled
/// spec's `sqrt(-2 ln u1) * cos(2*pi*u2)` formula exactly (rather than
/// `rand_distr::Normal`, whose sampling algorithm is unspecified and would
/// make the seeded-RNG determinism property untestable across rand
/// versions).
fn box_muller_sample<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(BOX_MULLER_EPSILON);
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// Sample noisy latent from normal distribution and apply the latent mask.
///
/// `rng` is caller-supplied so tests can pass a seeded `rand::rngs::StdRng`
/// and get reproducible output; production call sites pass
/// `&mut rand::thread_rng()`.
pub fn sample_noisy_latent<R: Rng + ?Sized>(
    duration: &[f32],
    sample_rate: i32,
    base_chunk_size: i32,
    chunk_compress: i32,
    latent_dim: i32,
    rng: &mut R,
) -> (Array3<f32>, Array3<f32>) {
    let bsz = duration.len();
    let max_dur = duration.iter().fold(0.0f32, |a, &b| a.max(b));

    let wav_len_max = (max_dur * sample_rate as f32) as usize;
    let wav_lengths: Vec<usize> = duration
        .iter()
        .map(|&d| (d * sample_rate as f32) as usize)
        .collect();

    let chunk_size = (base_chunk_size * chunk_compress) as usize;
    let latent_len = (wav_len_max + chunk_size - 1) / chunk_size;
    let latent_dim_val = (latent_dim * chunk_compress) as usize;

    let mut noisy_latent = Array3::<f32>::zeros((bsz, latent_dim_val, latent_len));

    for b in 0..bsz {
        for d in 0..latent_dim_val {
            for t in 0..latent_len {
                noisy_latent[[b, d, t]] = box_muller_sample(rng);
            }
        }
    }

    let latent_lengths: Vec<usize> = wav_lengths
        .iter()
        .map(|&len| (len + chunk_size - 1) / chunk_size)
        .collect();

    let latent_mask = length_to_mask(&latent_lengths, Some(latent_len));

    // Zero out padded positions.
    for b in 0..bsz {
        for d in 0..latent_dim_val {
            for t in 0..latent_len {
                noisy_latent[[b, d, t]] *= latent_mask[[b, 0, t]];
            }
        }
    }

    (noisy_latent, latent_mask)
}

/// Convenience wrapper using the thread-local RNG, matching the teacher's
/// original (non-seedable) call sites.
pub fn sample_noisy_latent_default(
    duration: &[f32],
    sample_rate: i32,
    base_chunk_size: i32,
    chunk_compress: i32,
    latent_dim: i32,
) -> (Array3<f32>, Array3<f32>) {
    let mut rng = rand::thread_rng();
    sample_noisy_latent(
        duration,
        sample_rate,
        base_chunk_size,
        chunk_compress,
        latent_dim,
        &mut rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn latent_mask_has_exact_ones_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let (_xt, mask) = sample_noisy_latent(&[1.0], 24_000, 320, 4, 8, &mut rng);
        // chunk_size = 320*4 = 1280; wav_len = 24000; latent_lengths = ceil(24000/1280) = 19
        let ones: f32 = mask.iter().sum();
        assert_eq!(ones, 19.0);
    }

    #[test]
    fn latent_sampling_is_deterministic_given_seed() {
        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let (xt1, _) = sample_noisy_latent(&[0.5], 24_000, 320, 4, 8, &mut rng1);
        let (xt2, _) = sample_noisy_latent(&[0.5], 24_000, 320, 4, 8, &mut rng2);
        assert_eq!(xt1, xt2);
    }

    #[test]
    fn latent_shape_matches_formula() {
        let mut rng = StdRng::seed_from_u64(1);
        let (xt, _) = sample_noisy_latent(&[1.0, 2.0], 24_000, 320, 4, 8, &mut rng);
        // latent_dim_val = 8*4=32; latent_len = ceil(48000/1280) = 38
        assert_eq!(xt.shape(), &[2, 32, 38]);
    }
}
