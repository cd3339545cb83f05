//! The module lifecycle contract.
//!
//! A [`Module`] binds a [`Behavior`] to a [`ContextNode`] and a shared
//! sandbox, and drives the two-phase start protocol:
//!
//! 1. **Main logic** — [`Behavior::on`] runs the module's (possibly
//!    asynchronous) initialization and signals a [`Completion`] exactly once
//!    when done.
//! 2. **Synchronized follow-up** — the future returned by [`Module::start`]
//!    resolves to an [`AfterHandle`]; invoking the handle runs
//!    [`Behavior::after`] exactly once.
//!
//! The split exists so an external orchestrator can start many modules
//! concurrently, await all their start futures, and only then trigger every
//! follow-up in a controlled second pass — no module's `after` runs before
//! every sibling's `on` has completed.
//!
//! # Example
//!
//! ```
//! use modular_rust_core::{Behavior, Completion, ContextNode, Module, ModuleId, Scope};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! struct Ticker {
//!     synced: Arc<AtomicBool>,
//! }
//!
//! impl Behavior<()> for Ticker {
//!     fn on(&self, _scope: Scope<'_, ()>, completion: Completion) {
//!         // Real modules kick off async setup here and signal later.
//!         completion.signal();
//!     }
//!
//!     fn after(&self, _scope: Scope<'_, ()>) {
//!         self.synced.store(true, Ordering::SeqCst);
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let synced = Arc::new(AtomicBool::new(false));
//! let module = Arc::new(Module::new(
//!     Arc::new(ContextNode::new("section")),
//!     Arc::new(()),
//!     ModuleId::new("ticker-1"),
//!     Ticker { synced: Arc::clone(&synced) },
//! ));
//!
//! let handle = module.start().await;
//! assert!(!synced.load(Ordering::SeqCst));
//! handle.invoke();
//! assert!(synced.load(Ordering::SeqCst));
//! # }
//! ```

use crate::context::ContextNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Identifier of a module instance.
///
/// Unique among concurrently active modules by convention — the caller
/// constructing modules is responsible for uniqueness; nothing here
/// validates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a new module id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Borrow view of a module's fixed state, handed to every [`Behavior`] hook.
///
/// A behavior reaches its module's context node, sandbox, and id through the
/// scope — the three values stored at construction and immutable for the
/// module's lifetime.
pub struct Scope<'a, S> {
    context: &'a ContextNode,
    sandbox: &'a S,
    id: &'a ModuleId,
}

impl<'a, S> Scope<'a, S> {
    /// The context node the module is bound to.
    #[must_use]
    pub const fn context(&self) -> &'a ContextNode {
        self.context
    }

    /// The shared sandbox granting access to cross-cutting services.
    #[must_use]
    pub const fn sandbox(&self) -> &'a S {
        self.sandbox
    }

    /// The module's id.
    #[must_use]
    pub const fn id(&self) -> &'a ModuleId {
        self.id
    }
}

impl<S> Clone for Scope<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Scope<'_, S> {}

impl<S> fmt::Debug for Scope<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("context", &self.context.name())
            .finish_non_exhaustive()
    }
}

/// Exactly-once signal that a module's main logic has finished.
///
/// Handed to [`Behavior::on`]. The behavior must call [`signal`] exactly once
/// on every exit path of its initialization — possibly from a spawned task,
/// possibly synchronously. Signalling more than once is silently ignored:
/// only the first call has effect.
///
/// Dropping every clone without signalling leaves the corresponding start
/// future pending forever. That hang is a contract violation by the behavior,
/// not an error the framework reports.
///
/// [`signal`]: Completion::signal
#[derive(Clone)]
pub struct Completion {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl Completion {
    /// Create a completion together with the receiver its signal resolves.
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Signal that the main logic is done.
    ///
    /// First call wins; subsequent calls (from this or any clone) are no-ops.
    pub fn signal(&self) {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            // The receiver lives inside the start future; it is only gone if
            // that future was dropped, in which case nobody is waiting.
            let _ = tx.send(());
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("Completion").field("pending", &pending).finish()
    }
}

/// Handle to a module's synchronized follow-up.
///
/// The value a start future resolves to. Invoking the handle runs the
/// module's [`Behavior::after`] hook; consuming `self` makes "exactly once"
/// a property of the type rather than a convention.
#[must_use = "the synchronized follow-up runs only when the handle is invoked"]
pub struct AfterHandle {
    hook: Box<dyn FnOnce() + Send>,
}

impl AfterHandle {
    /// Wrap a follow-up hook.
    ///
    /// Normally created by [`Module::start`]; exposed for custom
    /// [`Lifecycle`] implementations.
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            hook: Box::new(hook),
        }
    }

    /// Run the follow-up.
    pub fn invoke(self) {
        (self.hook)();
    }
}

impl fmt::Debug for AfterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AfterHandle(<hook>)")
    }
}

/// The overridable hooks of a module.
///
/// A concrete module is produced by implementing this trait and wrapping the
/// implementation in [`Module::new`]. All three hooks have defaults, so the
/// minimal module overrides nothing.
///
/// # Contract
///
/// An `on` override must signal its [`Completion`] exactly once, eventually,
/// regardless of internal branching — never more than once. `after` runs only
/// through the resolved [`AfterHandle`], after the orchestrator's barrier.
/// `stop` releases whatever the behavior acquired; the base enforces no
/// idempotence, so behaviors tolerate repeated calls themselves if that
/// matters to them.
pub trait Behavior<S>: Send + Sync + 'static {
    /// Main logic. Default: signal completion synchronously.
    fn on(&self, _scope: Scope<'_, S>, completion: Completion) {
        completion.signal();
    }

    /// Synchronized logic, run only after all sibling modules' main logic
    /// has completed. Default: no-op.
    fn after(&self, _scope: Scope<'_, S>) {}

    /// Deactivation. Default: no-op.
    fn stop(&self, _scope: Scope<'_, S>) {}
}

/// A module: a behavior bound to a context node, owned by a sandbox-granting
/// coordinator.
///
/// Stores `(context, sandbox, id, behavior)` verbatim at construction; all
/// four are fixed for the module's lifetime and no setters exist. The
/// context node is owned externally, the sandbox is shared by many modules.
///
/// # Type Parameters
///
/// - `B`: The behavior implementation (the module's hooks)
/// - `S`: The application-defined sandbox type
pub struct Module<B, S> {
    context: Arc<ContextNode>,
    sandbox: Arc<S>,
    id: ModuleId,
    behavior: B,
}

impl<B, S> Module<B, S>
where
    B: Behavior<S>,
    S: Send + Sync + 'static,
{
    /// Create a module.
    ///
    /// Stores the given values as-is: no validation (id uniqueness is the
    /// caller's responsibility) and no side effects beyond storage.
    #[must_use]
    pub fn new(context: Arc<ContextNode>, sandbox: Arc<S>, id: ModuleId, behavior: B) -> Self {
        Self {
            context,
            sandbox,
            id,
            behavior,
        }
    }

    /// The context node this module operates on.
    #[must_use]
    pub fn context(&self) -> &ContextNode {
        &self.context
    }

    /// The shared sandbox.
    #[must_use]
    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    /// The module id.
    #[must_use]
    pub const fn id(&self) -> &ModuleId {
        &self.id
    }

    fn scope(&self) -> Scope<'_, S> {
        Scope {
            context: &self.context,
            sandbox: &self.sandbox,
            id: &self.id,
        }
    }

    /// Start the module.
    ///
    /// Invokes [`Behavior::on`] with a fresh [`Completion`] and resolves —
    /// exactly once — after the completion has been signalled. The resolved
    /// [`AfterHandle`] runs [`Behavior::after`] when invoked.
    ///
    /// With the default `on`, the returned future resolves on its first poll,
    /// without yielding. If the behavior never signals (including dropping
    /// the completion), the future never resolves; there is no timeout or
    /// cancellation in this contract.
    pub async fn start(self: Arc<Self>) -> AfterHandle {
        let (completion, signalled) = Completion::new();
        self.behavior.on(self.scope(), completion);

        if signalled.await.is_err() {
            // Completion dropped without a signal: the contract is a hang,
            // not an error.
            std::future::pending::<()>().await;
        }

        AfterHandle::new(move || self.behavior.after(self.scope()))
    }

    /// Stop the module. Delegates to [`Behavior::stop`]; with no override
    /// this has no effect.
    pub fn stop(&self) {
        self.behavior.stop(self.scope());
    }
}

impl<B, S> fmt::Debug for Module<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("context", &self.context.name())
            .finish_non_exhaustive()
    }
}

/// Object-safe view of a startable, stoppable module.
///
/// Lets an orchestrator collect heterogeneous `Module<B, S>` instances (all
/// sharing the sandbox type `S` but differing in behavior) behind one trait
/// object.
pub trait Lifecycle: Send + Sync {
    /// The module's id.
    fn id(&self) -> &ModuleId;

    /// Start the module; see [`Module::start`].
    fn start(self: Arc<Self>) -> Pin<Box<dyn Future<Output = AfterHandle> + Send>>;

    /// Stop the module; see [`Module::stop`].
    fn stop(&self);
}

impl<B, S> Lifecycle for Module<B, S>
where
    B: Behavior<S>,
    S: Send + Sync + 'static,
{
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn start(self: Arc<Self>) -> Pin<Box<dyn Future<Output = AfterHandle> + Send>> {
        Box::pin(Module::start(self))
    }

    fn stop(&self) {
        Module::stop(self);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_pending, assert_ready, task};

    // Test fixtures

    struct Passive;

    impl<S> Behavior<S> for Passive {}

    struct CountingAfter {
        after_calls: Arc<AtomicUsize>,
    }

    impl Behavior<()> for CountingAfter {
        fn after(&self, _scope: Scope<'_, ()>) {
            self.after_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Stashes its completion instead of signalling, so tests control the
    /// signal timing by hand.
    struct HeldCompletion {
        slot: Arc<Mutex<Option<Completion>>>,
        after_calls: Arc<AtomicUsize>,
    }

    impl Behavior<()> for HeldCompletion {
        fn on(&self, _scope: Scope<'_, ()>, completion: Completion) {
            *self.slot.lock().unwrap() = Some(completion);
        }

        fn after(&self, _scope: Scope<'_, ()>) {
            self.after_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SignalsTwice {
        after_calls: Arc<AtomicUsize>,
    }

    impl Behavior<()> for SignalsTwice {
        fn on(&self, _scope: Scope<'_, ()>, completion: Completion) {
            completion.clone().signal();
            completion.signal();
        }

        fn after(&self, _scope: Scope<'_, ()>) {
            self.after_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct DropsCompletion;

    impl Behavior<()> for DropsCompletion {
        fn on(&self, _scope: Scope<'_, ()>, completion: Completion) {
            drop(completion);
        }
    }

    fn node() -> Arc<ContextNode> {
        Arc::new(ContextNode::new("section").with_attribute("data-widget", "probe"))
    }

    fn counting_module(after_calls: &Arc<AtomicUsize>) -> Arc<Module<CountingAfter, ()>> {
        Arc::new(Module::new(
            node(),
            Arc::new(()),
            ModuleId::new("m-1"),
            CountingAfter {
                after_calls: Arc::clone(after_calls),
            },
        ))
    }

    #[test]
    fn constructed_fields_read_back() {
        let context = node();
        let sandbox = Arc::new(42_u32);
        let module = Module::new(
            Arc::clone(&context),
            Arc::clone(&sandbox),
            ModuleId::new("ticker-1"),
            Passive,
        );

        assert_eq!(module.context(), context.as_ref());
        assert_eq!(*module.sandbox(), 42);
        assert_eq!(module.id().as_str(), "ticker-1");
    }

    proptest! {
        #[test]
        fn stored_fields_survive_any_inputs(
            name in "[a-z]{1,12}",
            id in "[a-z0-9-]{1,24}",
            key in "[a-z]{1,8}",
            value in "[a-z0-9]{0,8}",
        ) {
            let context = Arc::new(
                ContextNode::new(name.clone()).with_attribute(key.clone(), value.clone()),
            );
            let module = Module::new(
                Arc::clone(&context),
                Arc::new(()),
                ModuleId::new(id.clone()),
                Passive,
            );

            prop_assert_eq!(module.context().name(), name.as_str());
            prop_assert_eq!(module.context().attribute(&key), Some(value.as_str()));
            prop_assert_eq!(module.id().as_str(), id.as_str());
        }
    }

    #[test]
    fn default_on_resolves_without_yielding() {
        let after_calls = Arc::new(AtomicUsize::new(0));
        let module = counting_module(&after_calls);

        let handle = module
            .start()
            .now_or_never()
            .expect("default on signals synchronously");

        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
        handle.invoke();
        assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_pends_until_completion_signalled() {
        let slot = Arc::new(Mutex::new(None));
        let after_calls = Arc::new(AtomicUsize::new(0));
        let module = Arc::new(Module::new(
            node(),
            Arc::new(()),
            ModuleId::new("m-2"),
            HeldCompletion {
                slot: Arc::clone(&slot),
                after_calls: Arc::clone(&after_calls),
            },
        ));

        let mut start = task::spawn(module.start());
        assert_pending!(start.poll());

        let completion = slot.lock().unwrap().take().expect("on stored its completion");
        completion.signal();

        assert!(start.is_woken());
        let handle = assert_ready!(start.poll());
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
        handle.invoke();
        assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_signal_resolves_once_and_after_runs_once() {
        let after_calls = Arc::new(AtomicUsize::new(0));
        let module = Arc::new(Module::new(
            node(),
            Arc::new(()),
            ModuleId::new("m-3"),
            SignalsTwice {
                after_calls: Arc::clone(&after_calls),
            },
        ));

        let handle = module
            .start()
            .now_or_never()
            .expect("first signal resolves the future");
        handle.invoke();
        assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_completion_leaves_start_pending() {
        let module = Arc::new(Module::new(
            node(),
            Arc::new(()),
            ModuleId::new("m-4"),
            DropsCompletion,
        ));

        let mut start = task::spawn(module.start());
        assert_pending!(start.poll());
        // Still pending: the contract is a hang, never an error.
        assert_pending!(start.poll());
    }

    #[test]
    fn stop_without_override_is_a_noop() {
        let module = Module::new(node(), Arc::new(()), ModuleId::new("m-5"), Passive);
        module.stop();
        module.stop();
    }

    #[test]
    fn module_id_displays_and_converts() {
        let id = ModuleId::from("nav-3");
        assert_eq!(id.to_string(), "nav-3");
        assert_eq!(ModuleId::from(String::from("nav-3")), id);
    }
}
