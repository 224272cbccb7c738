use std::collections::VecDeque;

use crate::net::ControlInput;
use crate::spatial::EntityId;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingInput {
    pub entity_id: EntityId,
    pub input: ControlInput,
}

/// Control input received between ticks, applied at the start of the next.
#[derive(Debug, Clone)]
pub struct InputBuffer {
    inputs: VecDeque<PendingInput>,
    max_size: usize,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(256)
    }
}

impl InputBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            inputs: VecDeque::with_capacity(max_size),
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, entity_id: EntityId, input: ControlInput) {
        if self.inputs.len() >= self.max_size {
            log::warn!("input buffer full, dropping oldest input");
            self.inputs.pop_front();
        }
        self.inputs.push_back(PendingInput { entity_id, input });
    }

    pub fn drain(&mut self) -> Vec<PendingInput> {
        self.inputs.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_arrival_order() {
        let mut buffer = InputBuffer::new(4);
        for i in 0..3 {
            let input = ControlInput {
                weapon_index: i,
                ..Default::default()
            };
            buffer.push(EntityId(1), input);
        }
        let drained: Vec<u8> = buffer.drain().iter().map(|p| p.input.weapon_index).collect();
        assert_eq!(drained, vec![0, 1, 2]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buffer = InputBuffer::new(2);
        for i in 0..3 {
            let input = ControlInput {
                weapon_index: i,
                ..Default::default()
            };
            buffer.push(EntityId(1), input);
        }
        let drained: Vec<u8> = buffer.drain().iter().map(|p| p.input.weapon_index).collect();
        assert_eq!(drained, vec![1, 2]);
    }
}
