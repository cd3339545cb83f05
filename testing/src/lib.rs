//! # Modular Rust Testing
//!
//! Testing utilities for the Modular Rust component framework.
//!
//! This crate provides:
//! - Probe behaviors that record or count hook invocations
//! - A recording sandbox that captures service calls made from hooks
//! - Helpers for building throwaway context nodes
//!
//! ## Example
//!
//! ```ignore
//! use modular_rust_testing::{EventLog, ProbeBehavior, test_context};
//!
//! #[tokio::test]
//! async fn modules_synchronize() {
//!     let log = EventLog::new();
//!     let module = Arc::new(Module::new(
//!         test_context(),
//!         Arc::new(()),
//!         ModuleId::new("probe-1"),
//!         ProbeBehavior::immediate(log.clone()),
//!     ));
//!
//!     let handle = module.start().await;
//!     handle.invoke();
//!     assert_eq!(log.snapshot(), vec!["on:probe-1", "after:probe-1"]);
//! }
//! ```

use modular_rust_core::{Behavior, Completion, ContextNode, Scope};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Mock implementations and probe behaviors for tests.
pub mod mocks {
    use super::{
        Arc, AtomicBool, AtomicUsize, Behavior, Completion, Duration, Mutex, Ordering, PoisonError,
        Scope,
    };

    /// Shared, appendable log of string events.
    ///
    /// Cloning produces another handle to the same log, so a test can hand
    /// clones to several behaviors and read back one interleaved record.
    #[derive(Debug, Clone, Default)]
    pub struct EventLog {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl EventLog {
        /// Create an empty log.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Append an event.
        pub fn push(&self, event: impl Into<String>) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.into());
        }

        /// Copy out everything logged so far.
        #[must_use]
        pub fn snapshot(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of events logged so far.
        #[must_use]
        pub fn len(&self) -> usize {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether nothing has been logged yet.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    /// Sandbox double that records every service call made against it.
    ///
    /// Stands in for the application's shared coordinator: behaviors call
    /// [`record`](RecordingSandbox::record) from their hooks, tests read the
    /// calls back with [`notes`](RecordingSandbox::notes).
    #[derive(Debug, Default)]
    pub struct RecordingSandbox {
        notes: EventLog,
    }

    impl RecordingSandbox {
        /// Create an empty recording sandbox.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Record a service call.
        pub fn record(&self, note: impl Into<String>) {
            self.notes.push(note);
        }

        /// Copy out everything recorded so far.
        #[must_use]
        pub fn notes(&self) -> Vec<String> {
            self.notes.snapshot()
        }
    }

    /// Behavior that writes `on:<id>`, `after:<id>`, `stop:<id>` markers to
    /// an [`EventLog`] as its hooks run.
    ///
    /// The `on` marker is written when the main logic *completes* — for a
    /// deferred probe that is after the timer fires, immediately before the
    /// completion signal. Interleaving the markers of several probes in one
    /// log is how barrier ordering is asserted.
    ///
    /// Deferred probes spawn a timer task and therefore must be driven
    /// inside a tokio runtime.
    #[derive(Debug, Clone)]
    pub struct ProbeBehavior {
        log: EventLog,
        defer: Option<Duration>,
    }

    impl ProbeBehavior {
        /// Probe whose main logic completes synchronously.
        #[must_use]
        pub const fn immediate(log: EventLog) -> Self {
            Self { log, defer: None }
        }

        /// Probe whose main logic completes after the given delay.
        #[must_use]
        pub const fn deferred(log: EventLog, delay: Duration) -> Self {
            Self {
                log,
                defer: Some(delay),
            }
        }
    }

    impl<S: Send + Sync + 'static> Behavior<S> for ProbeBehavior {
        fn on(&self, scope: Scope<'_, S>, completion: Completion) {
            let id = scope.id().clone();
            if let Some(delay) = self.defer {
                let log = self.log.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    log.push(format!("on:{id}"));
                    completion.signal();
                });
            } else {
                self.log.push(format!("on:{id}"));
                completion.signal();
            }
        }

        fn after(&self, scope: Scope<'_, S>) {
            self.log.push(format!("after:{}", scope.id()));
        }

        fn stop(&self, scope: Scope<'_, S>) {
            self.log.push(format!("stop:{}", scope.id()));
        }
    }

    /// Shared invocation counters for a [`CountingBehavior`].
    #[derive(Debug, Clone, Default)]
    pub struct HookCounts {
        on: Arc<AtomicUsize>,
        after: Arc<AtomicUsize>,
        stop: Arc<AtomicUsize>,
    }

    impl HookCounts {
        /// Times `on` has run.
        #[must_use]
        pub fn on(&self) -> usize {
            self.on.load(Ordering::SeqCst)
        }

        /// Times `after` has run.
        #[must_use]
        pub fn after(&self) -> usize {
            self.after.load(Ordering::SeqCst)
        }

        /// Times `stop` has run.
        #[must_use]
        pub fn stop(&self) -> usize {
            self.stop.load(Ordering::SeqCst)
        }
    }

    /// Behavior that counts hook invocations and otherwise uses the
    /// defaults (synchronous completion, no-op follow-up).
    #[derive(Debug, Default)]
    pub struct CountingBehavior {
        counts: HookCounts,
    }

    impl CountingBehavior {
        /// Create a counting behavior.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Handle to the counters, usable after the behavior is consumed by
        /// `Module::new`.
        #[must_use]
        pub fn counts(&self) -> HookCounts {
            self.counts.clone()
        }
    }

    impl<S: Send + Sync + 'static> Behavior<S> for CountingBehavior {
        fn on(&self, _scope: Scope<'_, S>, completion: Completion) {
            self.counts.on.fetch_add(1, Ordering::SeqCst);
            completion.signal();
        }

        fn after(&self, _scope: Scope<'_, S>) {
            self.counts.after.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self, _scope: Scope<'_, S>) {
            self.counts.stop.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Behavior that signals its completion twice — a deliberate contract
    /// violation, for exercising first-signal-wins resolution.
    #[derive(Debug, Default)]
    pub struct DoubleSignalBehavior;

    impl<S: Send + Sync + 'static> Behavior<S> for DoubleSignalBehavior {
        fn on(&self, _scope: Scope<'_, S>, completion: Completion) {
            completion.clone().signal();
            completion.signal();
        }
    }

    /// Behavior for the classic timer scenario: main logic completes after a
    /// delay, the follow-up raises a flag.
    #[derive(Debug)]
    pub struct FlagBehavior {
        delay: Duration,
        flag: Arc<AtomicBool>,
    }

    impl FlagBehavior {
        /// Create a flag behavior completing after `delay`.
        #[must_use]
        pub fn new(delay: Duration) -> Self {
            Self {
                delay,
                flag: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Handle to the flag the follow-up raises.
        #[must_use]
        pub fn flag(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.flag)
        }
    }

    impl<S: Send + Sync + 'static> Behavior<S> for FlagBehavior {
        fn on(&self, _scope: Scope<'_, S>, completion: Completion) {
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                completion.signal();
            });
        }

        fn after(&self, _scope: Scope<'_, S>) {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Test helpers and builders.
pub mod helpers {
    use super::{Arc, ContextNode};

    /// A throwaway context node for tests.
    #[must_use]
    pub fn test_context() -> Arc<ContextNode> {
        Arc::new(ContextNode::new("section").with_attribute("data-module", "test"))
    }
}

// Re-export commonly used items
pub use helpers::test_context;
pub use mocks::{
    CountingBehavior, DoubleSignalBehavior, EventLog, FlagBehavior, HookCounts, ProbeBehavior,
    RecordingSandbox,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use modular_rust_core::{Module, ModuleId};

    #[test]
    fn event_log_shares_events_across_clones() {
        let log = EventLog::new();
        let other = log.clone();
        log.push("one");
        other.push("two");

        assert_eq!(log.snapshot(), vec!["one", "two"]);
        assert_eq!(other.len(), 2);
    }

    #[test]
    fn counting_behavior_counts_direct_hook_runs() {
        let behavior = CountingBehavior::new();
        let counts = behavior.counts();
        let module = Arc::new(Module::new(
            test_context(),
            Arc::new(()),
            ModuleId::new("count-1"),
            behavior,
        ));

        let handle = module.start().now_or_never().unwrap();
        assert_eq!(counts.on(), 1);
        assert_eq!(counts.after(), 0);

        handle.invoke();
        assert_eq!(counts.after(), 1);
        assert_eq!(counts.stop(), 0);
    }

    #[test]
    fn behaviors_reach_the_sandbox_through_their_scope() {
        struct Greeter;

        impl Behavior<RecordingSandbox> for Greeter {
            fn on(&self, scope: Scope<'_, RecordingSandbox>, completion: Completion) {
                scope.sandbox().record(format!("hello from {}", scope.id()));
                completion.signal();
            }
        }

        let sandbox = Arc::new(RecordingSandbox::new());
        let module = Arc::new(Module::new(
            test_context(),
            Arc::clone(&sandbox),
            ModuleId::new("greeter-1"),
            Greeter,
        ));

        let handle = module.start().now_or_never().unwrap();
        handle.invoke();

        assert_eq!(sandbox.notes(), vec!["hello from greeter-1"]);
    }

    #[tokio::test]
    async fn probe_behavior_orders_markers() {
        let log = EventLog::new();
        let module = Arc::new(Module::new(
            test_context(),
            Arc::new(()),
            ModuleId::new("probe-1"),
            ProbeBehavior::immediate(log.clone()),
        ));

        let handle = Arc::clone(&module).start().await;
        handle.invoke();
        module.stop();

        assert_eq!(
            log.snapshot(),
            vec!["on:probe-1", "after:probe-1", "stop:probe-1"]
        );
    }
}
