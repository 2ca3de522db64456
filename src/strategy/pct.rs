use super::ExplorationStrategy;
use crate::operation::OperationId;
use indexmap::IndexMap;
use rand::seq::index::sample;
use rand::Rng;
use rand_pcg::Pcg64;
use std::collections::BTreeSet;

/// Probabilistic Concurrency Testing (PCT): every operation has a priority;
/// between "priority change points" the highest-priority enabled operation
/// always runs. `k` change points are placed at randomized step positions
/// each iteration; whichever operation is running at a change point is
/// demoted to the lowest priority from then on. `k` is the knob PCT's
/// theory uses to trade search breadth for the depth of interleaving bug
/// it is likely to find — low `k` finds shallow bugs fast, higher `k`
/// reaches bugs that need more priority inversions to trigger.
#[derive(Clone)]
pub struct PctStrategy {
    seed: u64,
    k: usize,
    bound: usize,
    rng: Pcg64,
    /// Lower value == higher priority. Assigned the first time an operation
    /// is observed in an enabled set this iteration.
    priority: IndexMap<OperationId, u64>,
    next_rank: u64,
    demotion_floor: u64,
    change_points: BTreeSet<usize>,
    steps: usize,
}

impl PctStrategy {
    pub fn new(seed: u64, k: usize, bound: usize) -> Self {
        let mut s = PctStrategy {
            seed,
            k,
            bound,
            rng: Pcg64::new(seed as u128, 0xf1325bc5fc8e257_u128),
            priority: IndexMap::new(),
            next_rank: 0,
            demotion_floor: 1 << 32,
            change_points: BTreeSet::new(),
            steps: 0,
        };
        s.reroll_change_points(0);
        s
    }

    fn reroll_change_points(&mut self, iteration: u64) {
        self.rng = Pcg64::new(
            (self.seed.wrapping_add(iteration)) as u128,
            0xf1325bc5fc8e257_u128,
        );
        self.change_points.clear();
        let count = self.k.min(self.bound.saturating_sub(1).max(1));
        if self.bound > 1 && count > 0 {
            for pos in sample(&mut self.rng, self.bound - 1, count).into_iter() {
                self.change_points.insert(pos + 1);
            }
        }
    }

    fn priority_of(&mut self, op: OperationId) -> u64 {
        *self.priority.entry(op).or_insert_with(|| {
            let rank = self.next_rank;
            self.next_rank += 1;
            rank
        })
    }

    fn demote(&mut self, op: OperationId) {
        self.demotion_floor += 1;
        self.priority.insert(op, self.demotion_floor);
    }
}

impl ExplorationStrategy for PctStrategy {
    fn initialize_iteration(&mut self, iteration_index: usize) -> bool {
        self.priority.clear();
        self.next_rank = 0;
        self.demotion_floor = 1 << 32;
        self.steps = 0;
        self.reroll_change_points(iteration_index as u64);
        true
    }

    fn get_next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        _is_yielding: bool,
    ) -> Option<OperationId> {
        if enabled.is_empty() {
            return None;
        }

        if let Some(cur) = current {
            if self.change_points.contains(&self.steps) {
                self.demote(cur);
            }
        }

        for &op in enabled {
            self.priority_of(op);
        }

        self.steps += 1;

        enabled
            .iter()
            .copied()
            .min_by_key(|op| *self.priority.get(op).unwrap_or(&u64::MAX))
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
        self.steps >= self.bound
    }

    fn is_fair(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.steps = 0;
    }
}
