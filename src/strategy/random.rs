use super::ExplorationStrategy;
use crate::operation::OperationId;
use rand::Rng;
use rand_pcg::Pcg64;

/// Uniform random choice among enabled operations; independent uniform
/// draws for booleans and bounded integers. The baseline strategy: cheap,
/// unbiased, and a useful lower bound to compare PCT/DFS coverage against.
#[derive(Clone)]
pub struct RandomStrategy {
    seed: u64,
    rng: Pcg64,
    steps: usize,
    max_steps: Option<usize>,
}

impl RandomStrategy {
    pub fn new(seed: u64) -> Self {
        RandomStrategy {
            seed,
            rng: seeded_rng(seed, 0),
            steps: 0,
            max_steps: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

fn seeded_rng(seed: u64, iteration: u64) -> Pcg64 {
    // Derive a distinct stream per iteration from one configured seed so
    // that iteration `n` is reproducible in isolation (needed for replay of
    // a single captured trace without re-running iterations 0..n).
    let state = (seed.wrapping_add(iteration)) as u128;
    Pcg64::new(state, 0xa02bdbf7bb3c0a7_u128)
}

impl ExplorationStrategy for RandomStrategy {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        self.rng = seeded_rng(self.seed, iteration_index as u64);
        self.steps = 0;
        true
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
        if let Some(max) = self.max_steps {
            if self.steps >= max {
                return None;
            }
        }
        self.steps += 1;
        let idx = self.rng.random_range(0..enabled.len());
        Some(enabled[idx])
    }

    fn get_next_boolean_choice(&mut self, _current: OperationId, _max_value: u32) -> Option<bool> {
        self.steps += 1;
        Some(self.rng.random_bool(0.5))
    }

    fn get_next_integer_choice(&mut self, _current: OperationId, max_value: i32) -> Option<i32> {
        if max_value <= 0 {
            return None;
        }
        self.steps += 1;
        Some(self.rng.random_range(0..max_value))
    }

    fn scheduled_steps(&self) -> usize {
        self.steps
    }

    fn max_steps_reached(&self) -> bool {
        self.max_steps.is_some_and(|max| self.steps >= max)
    }

    fn is_fair(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.steps = 0;
    }
}
