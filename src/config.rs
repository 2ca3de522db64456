//! `Config` enumerates the options `run_test`/`verify` recognize
//! (spec.md §6), built through a fluent builder the same way the teacher's
//! own `Config::builder()....build()` is used across its test suite.

use crate::runtime::continuation::DEFAULT_STACK_SIZE;
use log::LevelFilter;
use std::path::PathBuf;

/// Which built-in `ExplorationStrategy` to use. `Pct`'s `k` is the number of
/// priority-change points PCT inserts per iteration; `Dfs`'s `max_depth`
/// bounds how many scheduling decisions one DFS iteration explores.
#[derive(Debug, Clone)]
pub enum StrategyKind {
    Random,
    Pct { k: usize },
    Dfs { max_depth: usize },
    Portfolio(Vec<StrategyKind>),
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::Random
    }
}

/// Soft/hard caps on scheduling decisions per iteration (spec.md §4.1).
/// Crossing `soft` only marks the strategy as "max steps reached" (bound
/// accounting); crossing `hard` forces `schedule_next_operation` to return
/// `BoundReached` even if the strategy itself has not noticed.
#[derive(Debug, Clone, Copy)]
pub struct StepBound {
    pub soft: usize,
    pub hard: usize,
}

impl Default for StepBound {
    fn default() -> Self {
        StepBound {
            soft: 10_000,
            hard: 20_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub iterations: usize,
    pub strategy: StrategyKind,
    pub seed: u64,
    pub max_steps: StepBound,
    pub fairness: bool,
    pub liveness_temperature: usize,
    pub replay_trace: Option<PathBuf>,
    pub verbosity: LevelFilter,
    pub keep_going_after_error: bool,
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            iterations: 1,
            strategy: StrategyKind::default(),
            seed: 0,
            max_steps: StepBound::default(),
            fairness: false,
            liveness_temperature: 64,
            replay_trace: None,
            verbosity: LevelFilter::Off,
            keep_going_after_error: true,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_max_steps(mut self, soft: usize, hard: usize) -> Self {
        self.config.max_steps = StepBound { soft, hard };
        self
    }

    pub fn with_fairness(mut self, fairness: bool) -> Self {
        self.config.fairness = fairness;
        self
    }

    pub fn with_liveness_temperature(mut self, window: usize) -> Self {
        self.config.liveness_temperature = window;
        self
    }

    pub fn with_replay_trace(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.replay_trace = Some(path.into());
        self
    }

    /// `level` follows the teacher's own `with_verbose(n)` convention: 0 is
    /// silent, higher numbers map onto increasingly chatty `log::LevelFilter`
    /// values, capped at `Trace`.
    pub fn with_verbose(mut self, level: u8) -> Self {
        self.config.verbosity = match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        self
    }

    pub fn with_keep_going_after_error(mut self, keep_going: bool) -> Self {
        self.config.keep_going_after_error = keep_going;
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
