//! The specification-monitor contract (spec.md §6). Monitor *authoring* —
//! turning a user-written automaton into something that implements this
//! trait — is out of scope (spec.md §1); this module only defines the
//! minimal hook the liveness wrapper invokes.

/// A specification monitor: a small automaton that observes events emitted
/// by the test body and reports whether it currently represents an
/// outstanding ("hot") obligation.
pub trait Monitor: Send {
    /// Human-readable name used in `LivenessViolation` reports.
    fn name(&self) -> &str;

    /// Feed the monitor one event. What counts as an event, and how it
    /// drives the monitor's internal automaton, is entirely up to the
    /// implementation — the engine only ever calls `is_hot` afterwards.
    fn on_event(&mut self, event: &str);

    /// `true` if the monitor's current state represents an obligation that
    /// has not yet been discharged (a "cold" visit).
    fn is_hot(&self) -> bool;
}

/// A monitor that is hot whenever the number of `"start"` events it has
/// seen exceeds the number of `"finish"` events — the common shape for "a
/// request was started but never completed" liveness properties. Provided
/// as a ready-to-use monitor for tests and simple specifications; richer
/// automata should implement `Monitor` directly.
pub struct StartFinishMonitor {
    name: String,
    outstanding: i64,
}

impl StartFinishMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        StartFinishMonitor {
            name: name.into(),
            outstanding: 0,
        }
    }
}

impl Monitor for StartFinishMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&mut self, event: &str) {
        match event {
            "start" => self.outstanding += 1,
            "finish" => self.outstanding -= 1,
            _ => {}
        }
    }

    fn is_hot(&self) -> bool {
        self.outstanding > 0
    }
}
