//! Recovered-error accounting.
//!
//! Every normalizer, selector strategy, and differ absorbs its own failures
//! and substitutes a fallback value; this module is where those recoveries
//! get counted so they are not silently invisible. Messages are
//! deduplicated so a malformed value repeated across thousands of elements
//! surfaces once.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Callback invoked the first time each unique recovery message is seen.
pub type DiagnosticSink = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Shared recovered-error counter.
///
/// Cloneable via `Arc`; all mutation goes through an internal mutex so the
/// selector generator's worker threads can report safely.
#[derive(Default)]
pub struct Diagnostics {
    state: Mutex<State>,
    sink: Option<DiagnosticSink>,
}

#[derive(Default)]
struct State {
    seen: HashSet<String>,
    counts: BTreeMap<String, u64>,
}

impl Diagnostics {
    /// Create a silent diagnostics collector (counting only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector that forwards each first-seen message to `sink`.
    pub fn with_sink(sink: DiagnosticSink) -> Self {
        Self { state: Mutex::new(State::default()), sink: Some(sink) }
    }

    /// Record a recovered error in `component`.
    ///
    /// The per-component counter always increments; the sink fires only the
    /// first time this exact `(component, message)` pair is seen.
    pub fn recovered(&self, component: &str, message: &str) {
        let first = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            *state.counts.entry(component.to_owned()).or_insert(0) += 1;
            state.seen.insert(format!("[{component}] {message}"))
        };
        if first {
            if let Some(sink) = &self.sink {
                sink(component, message);
            }
        }
    }

    /// Number of recoveries recorded for one component.
    pub fn count(&self, component: &str) -> u64 {
        self.state.lock().map_or(0, |state| state.counts.get(component).copied().unwrap_or(0))
    }

    /// Total recoveries across all components.
    pub fn total(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.counts.values().sum())
    }

    /// Snapshot of per-component counts, for end-of-run reporting.
    pub fn counts(&self) -> BTreeMap<String, u64> {
        self.state.lock().map_or_else(|_| BTreeMap::new(), |state| state.counts.clone())
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics").field("counts", &self.counts()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn counts_every_recovery() {
        let diagnostics = Diagnostics::new();
        diagnostics.recovered("color", "bad hex '#zz'");
        diagnostics.recovered("color", "bad hex '#zz'");
        diagnostics.recovered("units", "bad length 'wide'");
        assert_eq!(diagnostics.count("color"), 2);
        assert_eq!(diagnostics.count("units"), 1);
        assert_eq!(diagnostics.total(), 3);
    }

    #[test]
    fn sink_fires_once_per_unique_message() {
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        let diagnostics = Diagnostics::with_sink(Box::new(move |_, _| {
            observed.fetch_add(1, Ordering::SeqCst);
        }));
        diagnostics.recovered("color", "bad hex");
        diagnostics.recovered("color", "bad hex");
        diagnostics.recovered("color", "bad rgb");
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(diagnostics.count("color"), 3);
    }
}
