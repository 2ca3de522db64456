use super::ExplorationStrategy;
use crate::operation::OperationId;
use bitvec::vec::BitVec;

/// One decision point recorded during an iteration: which operations were
/// enabled, which index into that list we picked, and a bitset of which
/// indices have been tried across all iterations that reached this frame.
#[derive(Clone, Debug)]
struct DfsFrame {
    options: Vec<OperationId>,
    chosen_index: usize,
    tried: BitVec,
}

impl DfsFrame {
    fn fully_explored(&self) -> bool {
        self.tried.count_ones() >= self.options.len()
    }

    fn next_untried(&self) -> Option<usize> {
        (0..self.options.len()).find(|&i| !self.tried[i])
    }
}

/// Exhaustive-within-a-depth-bound exploration with backtracking: each
/// iteration replays the prefix of the previous schedule up to the deepest
/// frame with an untried alternative, then picks that alternative and lets
/// later decisions go to the first enabled operation. Deterministic given
/// the same test body (no PRNG involved) — the generation of schedules,
/// not their data, is what advances between iterations.
#[derive(Clone)]
pub struct DfsStrategy {
    max_depth: usize,
    frames: Vec<DfsFrame>,
    replay_len: usize,
    cursor: usize,
    exhausted: bool,
}

impl DfsStrategy {
    pub fn new(max_depth: usize) -> Self {
        DfsStrategy {
            max_depth,
            frames: Vec::new(),
            replay_len: 0,
            cursor: 0,
            exhausted: false,
        }
    }

    /// Pop fully-explored trailing frames, then bump the last partially
    /// explored frame to its next untried alternative. If no frame has an
    /// untried alternative left, the whole search space has been covered.
    fn advance_to_next_schedule(&mut self) {
        while let Some(frame) = self.frames.last() {
            if frame.fully_explored() {
                self.frames.pop();
            } else {
                break;
            }
        }
        match self.frames.last_mut() {
            Some(frame) => {
                let next = frame
                    .next_untried()
                    .expect("fully-explored frames were already popped");
                frame.tried.set(next, true);
                frame.chosen_index = next;
                self.replay_len = self.frames.len();
            }
            None => self.exhausted = true,
        }
    }
}

impl ExplorationStrategy for DfsStrategy {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        if iteration_index == 0 {
            self.frames.clear();
            self.replay_len = 0;
            self.exhausted = false;
        } else {
            self.advance_to_next_schedule();
        }
        self.cursor = 0;
        !self.exhausted
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        _is_yielding: bool,
    ) -> Option<OperationId> {
        if enabled.is_empty() {
            return None;
        }
        if self.cursor >= self.max_depth {
            return None;
        }

        let depth = self.cursor;
        self.cursor += 1;

        if depth < self.replay_len {
            // Replaying a previously recorded prefix: options must match
            // (the same operations enabled at the same point) or the test
            // body is nondeterministic in a way DFS cannot explore.
            let frame = &self.frames[depth];
            let idx = frame.chosen_index.min(enabled.len() - 1);
            return Some(enabled[idx]);
        }

        // Past the replayed prefix: record a fresh frame, always choosing
        // the first (lowest-id) enabled operation as the default path —
        // subsequent iterations will advance this frame's chosen_index via
        // `advance_to_next_schedule`.
        let mut tried = BitVec::repeat(false, enabled.len());
        tried.set(0, true);
        self.frames.push(DfsFrame {
            options: enabled.to_vec(),
            chosen_index: 0,
            tried,
        });
        self.replay_len = self.frames.len();
        Some(enabled[0])
    }

    fn get_next_boolean_choice(&mut self, _current: OperationId, _max_value: u32) -> Option<bool> {
        self.cursor += 1;
        Some(false)
    }

    fn get_next_integer_choice(&mut self, _current: OperationId, max_value: i32) -> Option<i32> {
        if max_value <= 0 {
            return None;
        }
        self.cursor += 1;
        Some(0)
    }

    fn scheduled_steps(&self) -> usize {
        self.cursor
    }

    fn max_steps_reached(&self) -> bool {
        self.cursor >= self.max_depth
    }

    fn is_fair(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
