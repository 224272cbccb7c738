use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kaze::net::Interpolator;

#[test]
fn pruning_keeps_a_bracketing_pair() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut interp: Interpolator<u32> = Interpolator::new(8).unwrap();
    let mut t = 0.0;
    let mut pushed = 0;

    for _ in 0..5000 {
        if rng.random_bool(0.55) {
            let delta = if interp.is_empty() { 0.0 } else { rng.random_range(1.0..40.0) };
            let shift = interp.push(
                Vec2::new(rng.random_range(0.0..500.0), rng.random_range(0.0..500.0)),
                Vec2::ZERO,
                Vec2::X,
                delta,
                pushed,
            );
            t = (t - shift).max(0.0);
            pushed += 1;
        } else if !interp.is_empty() {
            t += rng.random_range(0.0..60.0);
            let sample = interp.interpolate(t.min(interp.last_dist().unwrap_or(0.0)));
            assert!(sample.is_ok());
            assert!(sample.unwrap().position.is_finite());
            t = interp.prune(t);
        }

        if pushed >= 2 {
            assert!(interp.len() >= 2, "only {} left after {pushed} pushes", interp.len());
        }
        let dists: Vec<f32> = interp.snapshots().map(|s| s.dist).collect();
        assert!(dists.iter().all(|d| *d >= 0.0));
        assert!(dists.windows(2).all(|w| w[0] < w[1]), "{dists:?}");
        assert!(t >= 0.0);
    }
}
