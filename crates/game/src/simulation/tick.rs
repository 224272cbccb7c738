/// Accumulates wall-clock milliseconds and hands them out as fixed ticks.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt_ms: f32,
    accumulator: f32,
    max_frame_ms: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt_ms: 1000.0 / tick_rate as f32,
            accumulator: 0.0,
            max_frame_ms: 250.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt_ms(&self) -> f32 {
        self.dt_ms
    }

    /// Frames longer than 250 ms count as 250 ms.
    pub fn accumulate(&mut self, delta_ms: f32) {
        self.accumulator += delta_ms.clamp(0.0, self.max_frame_ms);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt_ms {
            self.accumulator -= self.dt_ms;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(50);

        ts.accumulate(40.0);
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn long_frames_are_capped() {
        let mut ts = FixedTimestep::new(50);
        ts.accumulate(10_000.0);
        let mut ticks = 0;
        while ts.consume_tick() {
            ticks += 1;
        }
        assert_eq!(ticks, 12);
    }
}
