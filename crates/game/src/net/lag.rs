use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::math::PoissonTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LagConfig {
    /// Expected deliveries per second once frames are queued.
    pub average_fps: f32,
    pub fixed_delay_ms: f32,
    /// Queue length beyond which everything queued is flushed at once.
    pub queue_max_len: usize,
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            average_fps: 60.0,
            fixed_delay_ms: 0.0,
            queue_max_len: 10,
        }
    }
}

/// Delays frames by a fixed amount, then releases them one at a time with
/// Poisson distributed gaps around `1000 / average_fps` ms. Order is kept.
#[derive(Debug)]
pub struct LagMaker<T> {
    config: LagConfig,
    table: PoissonTable,
    rng: StdRng,
    now: f32,
    next_release: f32,
    in_flight: VecDeque<(f32, T)>,
    queue: VecDeque<T>,
}

impl<T> LagMaker<T> {
    pub fn new(config: LagConfig, seed: u64) -> Self {
        let average_delay = 1000.0 / f64::from(config.average_fps.max(f32::EPSILON));
        Self {
            table: PoissonTable::new(average_delay),
            rng: StdRng::seed_from_u64(seed),
            config,
            now: 0.0,
            next_release: 0.0,
            in_flight: VecDeque::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &LagConfig {
        &self.config
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len() + self.queue.len()
    }

    pub fn send(&mut self, item: T) {
        let arrival = self.now + self.config.fixed_delay_ms;
        self.in_flight.push_back((arrival, item));
    }

    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += dt;
        while let Some((arrival, _)) = self.in_flight.front() {
            if *arrival > self.now {
                break;
            }
            if let Some((_, item)) = self.in_flight.pop_front() {
                self.queue.push_back(item);
            }
        }

        let mut delivered = Vec::new();
        // Idle link: the next frame may go out as soon as it arrives.
        if self.queue.is_empty() {
            self.next_release = self.next_release.max(self.now);
            return delivered;
        }

        while self.next_release <= self.now {
            let Some(item) = self.queue.pop_front() else {
                self.next_release = self.now;
                break;
            };
            delivered.push(item);
            // Gaps are whole milliseconds drawn around the average rate.
            self.next_release += self.table.sample(&mut self.rng) as f32;

            if self.queue.len() > self.config.queue_max_len {
                log::debug!("lag queue over limit, dumping {} frames", self.queue.len());
                delivered.extend(self.queue.drain(..));
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_holds_frames_back() {
        let mut lag = LagMaker::new(
            LagConfig {
                average_fps: 1000.0,
                fixed_delay_ms: 100.0,
                queue_max_len: 10,
            },
            1,
        );
        lag.send(1);
        assert!(lag.advance(50.0).is_empty());
        assert_eq!(lag.advance(60.0), vec![1]);
    }

    #[test]
    fn order_is_preserved() {
        let mut lag = LagMaker::new(LagConfig::default(), 9);
        for i in 0..8 {
            lag.send(i);
        }
        let mut out = Vec::new();
        for _ in 0..100 {
            out.extend(lag.advance(16.0));
        }
        assert_eq!(out, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn overfull_queue_is_dumped() {
        let mut lag = LagMaker::new(
            LagConfig {
                average_fps: 1.0,
                fixed_delay_ms: 0.0,
                queue_max_len: 3,
            },
            3,
        );
        for i in 0..10 {
            lag.send(i);
        }
        let out = lag.advance(0.0);
        assert_eq!(out.len(), 10);
        assert_eq!(lag.pending(), 0);
    }
}
