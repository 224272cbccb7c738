use rand::Rng;

pub fn factorial(k: u32) -> f64 {
    (1..=k).map(f64::from).product()
}

/// `P(X <= k)` for a Poisson distribution with mean `lambda`.
pub fn poisson_cdf(lambda: f64, k: u32) -> f64 {
    // Summed in log space so large means do not underflow `exp(-lambda)`.
    let mut log_term = -lambda;
    let mut sum = 0.0;
    for i in 0..=k {
        if i > 0 {
            log_term += (lambda / f64::from(i)).ln();
        }
        sum += log_term.exp();
    }
    sum.min(1.0)
}

/// Precomputed CDF for drawing Poisson-distributed integers.
#[derive(Debug, Clone)]
pub struct PoissonTable {
    cdf: Vec<f64>,
}

impl PoissonTable {
    pub fn new(lambda: f64) -> Self {
        // At twice the mean the CDF is indistinguishable from 1.
        let max = (2.0 * lambda).ceil() as u32 + 1;
        let cdf = (0..=max).map(|k| poisson_cdf(lambda, k)).collect();
        Self { cdf }
    }

    pub fn max(&self) -> u32 {
        (self.cdf.len() - 1) as u32
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let uniform: f64 = rng.random();
        self.cdf
            .iter()
            .position(|&p| uniform < p)
            .map_or(self.max(), |i| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn factorial_small() {
        assert_eq!(factorial(0), 1.0);
        assert_eq!(factorial(5), 120.0);
    }

    #[test]
    fn cdf_is_monotonic_and_bounded() {
        let mut last = 0.0;
        for k in 0..40 {
            let p = poisson_cdf(16.0, k);
            assert!(p >= last);
            assert!(p <= 1.0 + 1e-9);
            last = p;
        }
        assert!(last > 0.99);
    }

    #[test]
    fn samples_center_on_lambda() {
        let table = PoissonTable::new(16.0);
        let mut rng = StdRng::seed_from_u64(7);
        let n = 2000;
        let total: u32 = (0..n).map(|_| table.sample(&mut rng)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 16.0).abs() < 1.5, "mean {mean}");
    }
}
