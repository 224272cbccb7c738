use std::collections::VecDeque;

use glam::Vec2;

use crate::math::{hermite, slerp};

/// One authoritative sample. `dist` is milliseconds since the oldest
/// retained sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim: Vec2,
    pub dist: f32,
    pub dist_to_prev: f32,
    pub other: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedSnapshot<T> {
    pub position: Vec2,
    pub aim: Vec2,
    pub other: T,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("interpolator needs room for at least two snapshots, got {0}")]
    CapacityTooSmall(usize),
    #[error("tried to interpolate with no snapshots")]
    Empty,
    #[error("playback time must not be negative, got {0}")]
    NegativeTime(f32),
}

/// How fast to advance playback given the number of buffered snapshots.
/// Anything beyond the bracketing pair means we have fallen behind.
pub fn playback_speed(buffered: usize) -> f32 {
    1.0 + 0.1 * buffered.saturating_sub(2) as f32
}

#[derive(Debug, Clone)]
pub struct Interpolator<T> {
    snapshots: VecDeque<Snapshot<T>>,
    max: usize,
}

impl<T: Clone> Interpolator<T> {
    pub fn new(max: usize) -> Result<Self, InterpolationError> {
        if max < 2 {
            return Err(InterpolationError::CapacityTooSmall(max));
        }
        Ok(Self {
            snapshots: VecDeque::with_capacity(max),
            max,
        })
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot<T>> {
        self.snapshots.iter()
    }

    pub fn last_dist(&self) -> Option<f32> {
        self.snapshots.back().map(|s| s.dist)
    }

    /// Appends a sample taken `dist_to_prev` ms after the previous one.
    ///
    /// A full buffer drops its oldest sample first. Returns how far the
    /// time origin moved so callers can re-base their playback clock.
    pub fn push(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        aim: Vec2,
        dist_to_prev: f32,
        other: T,
    ) -> f32 {
        let mut shifted = 0.0;
        if self.snapshots.len() >= self.max {
            log::warn!("interpolation buffer full, discarding oldest snapshot");
            shifted = self.shift(1);
        }
        let dist = self
            .snapshots
            .back()
            .map_or(0.0, |last| last.dist + dist_to_prev);
        self.snapshots.push_back(Snapshot {
            position,
            velocity,
            aim,
            dist,
            dist_to_prev,
            other,
        });
        shifted
    }

    /// Drops samples already played back at time `t`, keeping the pair that
    /// brackets it. Returns `t` re-based to the new oldest sample.
    pub fn prune(&mut self, t: f32) -> f32 {
        let Some(last) = self.last_dist() else {
            return t;
        };
        // Playback can never run ahead of the newest sample.
        let t = t.min(last);
        let next = self.next_index(t);
        if next >= 2 {
            t - self.shift(next - 1)
        } else {
            t
        }
    }

    pub fn interpolate(&self, t: f32) -> Result<InterpolatedSnapshot<T>, InterpolationError> {
        if t < 0.0 {
            return Err(InterpolationError::NegativeTime(t));
        }
        let last = self.snapshots.back().ok_or(InterpolationError::Empty)?;
        if self.snapshots.len() == 1 || t >= last.dist {
            return Ok(InterpolatedSnapshot {
                position: last.position,
                aim: last.aim,
                other: last.other.clone(),
            });
        }

        let i = self.next_index(t);
        let a = &self.snapshots[i - 1];
        let b = &self.snapshots[i];
        // `next_index` guarantees a.dist <= t < b.dist, so dist_to_prev > 0.
        let fraction = (t - a.dist) / b.dist_to_prev;
        Ok(InterpolatedSnapshot {
            position: hermite(a.position, b.position, a.velocity, b.velocity, fraction),
            aim: slerp(a.aim, b.aim, fraction),
            other: a.other.clone(),
        })
    }

    // First sample strictly after `t`, or the last one.
    fn next_index(&self, t: f32) -> usize {
        (1..self.snapshots.len())
            .find(|&i| t < self.snapshots[i].dist)
            .unwrap_or(self.snapshots.len().saturating_sub(1))
    }

    // Drops `count` from the front and re-zeroes `dist` on the rest.
    fn shift(&mut self, count: usize) -> f32 {
        self.snapshots.drain(..count.min(self.snapshots.len()));
        let Some(origin) = self.snapshots.front().map(|s| s.dist) else {
            return 0.0;
        };
        for snapshot in &mut self.snapshots {
            snapshot.dist -= origin;
        }
        origin
    }
}
