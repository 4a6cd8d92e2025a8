//! Channel impairments applied between modulation and demodulation.

use crate::error::{FskTestError, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Additive white Gaussian noise at a given Eb/No.
///
/// Assumes a unit-amplitude real carrier and one bit per symbol, so
/// Eb = Ts / 2 and the per-sample noise variance is No / 2.
#[derive(Debug, Clone, Copy)]
pub struct AwgnChannel {
    ebno_db: f32,
    noise: Normal<f32>,
}

impl AwgnChannel {
    pub fn from_ebno(ebno_db: f32, samples_per_symbol: usize) -> Result<Self> {
        if !ebno_db.is_finite() {
            return Err(FskTestError::InvalidConfig(format!(
                "Eb/No must be finite, got {}",
                ebno_db
            )));
        }
        let eb = samples_per_symbol as f32 / 2.0;
        let no = eb / 10f32.powf(ebno_db / 10.0);
        let noise = Normal::new(0.0, (no / 2.0).sqrt())
            .map_err(|e| FskTestError::InvalidConfig(format!("noise distribution: {}", e)))?;
        Ok(Self { ebno_db, noise })
    }

    pub fn ebno_db(&self) -> f32 {
        self.ebno_db
    }

    /// Noise standard deviation per sample
    pub fn sigma(&self) -> f32 {
        self.noise.std_dev()
    }

    pub fn apply<R: Rng + ?Sized>(&self, samples: &mut [f32], rng: &mut R) {
        for sample in samples.iter_mut() {
            *sample += self.noise.sample(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sigma_from_ebno() {
        // Ts = 80: Eb = 40, at 0 dB No = 40, sigma = sqrt(20)
        let channel = AwgnChannel::from_ebno(0.0, 80).unwrap();
        assert!((channel.sigma() - 20f32.sqrt()).abs() < 1e-4);

        let quieter = AwgnChannel::from_ebno(10.0, 80).unwrap();
        assert!((quieter.sigma() - 2f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_noise_variance() {
        let channel = AwgnChannel::from_ebno(8.0, 80).unwrap();
        let mut samples = vec![0.0f32; 50_000];
        channel.apply(&mut samples, &mut StdRng::seed_from_u64(3));

        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / samples.len() as f32;
        let expected = channel.sigma() * channel.sigma();
        assert!(mean.abs() < 0.05, "mean={}", mean);
        assert!((var - expected).abs() < 0.05 * expected, "var={} expected={}", var, expected);
    }

    #[test]
    fn test_non_finite_ebno_rejected() {
        assert!(AwgnChannel::from_ebno(f32::NAN, 80).is_err());
        assert!(AwgnChannel::from_ebno(f32::INFINITY, 80).is_err());
    }
}
