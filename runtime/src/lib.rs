//! # Modular Rust Runtime
//!
//! Orchestrator implementation for the Modular Rust component framework.
//!
//! The [`Orchestrator`] owns a set of registered modules and drives their
//! lifecycle against the conventions of the core contract:
//!
//! 1. **Register** modules (ids must be unique within one orchestrator).
//! 2. **Start** all of them concurrently; collect every start future and
//!    await them together. This is the barrier: no module's synchronized
//!    follow-up runs before every module's main logic has completed.
//! 3. **Invoke** every resolved [`AfterHandle`] in a second pass.
//! 4. **Stop** all modules later, in reverse registration order.
//!
//! There is no timeout, retry, or cancellation anywhere in the start path: a
//! module whose main logic never signals completion blocks the barrier
//! indefinitely, by contract.
//!
//! ## Example
//!
//! ```ignore
//! use modular_rust_runtime::Orchestrator;
//!
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.register(news_ticker)?;
//! orchestrator.register(weather_widget)?;
//!
//! // Phase one + barrier + phase two, in one call.
//! orchestrator.start_all().await?;
//!
//! // Later, on teardown:
//! orchestrator.stop_all()?;
//! ```

use chrono::{DateTime, Utc};
use modular_rust_core::{AfterHandle, Lifecycle, ModuleId};
use std::sync::Arc;

/// Error types for the orchestrator
pub mod error {
    use modular_rust_core::ModuleId;
    use thiserror::Error;

    /// Errors that can occur while managing a module set.
    ///
    /// These are registry errors — misuse of the orchestrator itself. The
    /// module lifecycle contract has no error path of its own: a behavior
    /// that never signals completion hangs the barrier, it does not fail.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum OrchestratorError {
        /// A module with this id is already registered
        ///
        /// Module construction never validates id uniqueness; the registry
        /// does, so one orchestrator never starts two modules under the
        /// same id.
        #[error("module '{id}' is already registered")]
        DuplicateModule {
            /// The id that collided
            id: ModuleId,
        },

        /// The module set has already been started
        ///
        /// Modules are started at most once; registration is also closed
        /// once the set is running.
        #[error("modules have already been started")]
        AlreadyStarted,

        /// The module set has not been started yet
        #[error("modules have not been started")]
        NotStarted,

        /// The module set has already been stopped
        #[error("modules have already been stopped")]
        AlreadyStopped,
    }
}

pub use error::OrchestratorError;

/// Lifecycle phase of a registered module, as tracked by the orchestrator.
///
/// The module base itself enforces nothing; this bookkeeping exists for
/// reporting and registry validation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModulePhase {
    /// Registered but not yet started
    Registered,

    /// Main logic and synchronized follow-up have both run
    Started,

    /// Stopped after having been started
    Stopped,
}

impl ModulePhase {
    /// Check if the module is still waiting to be started
    #[must_use]
    pub const fn is_registered(self) -> bool {
        matches!(self, Self::Registered)
    }

    /// Check if the module is currently started
    #[must_use]
    pub const fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }

    /// Check if the module has been stopped
    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl std::fmt::Display for ModulePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Phase snapshot for a single module
#[derive(Debug, Clone)]
pub struct ModuleStatus {
    /// Id of the module
    pub id: ModuleId,

    /// Phase at the time the report was taken
    pub phase: ModulePhase,
}

/// Snapshot of every registered module's phase
#[derive(Debug, Clone)]
pub struct OrchestratorReport {
    /// Individual module statuses, in registration order
    pub modules: Vec<ModuleStatus>,

    /// Timestamp when the report was taken
    pub timestamp: DateTime<Utc>,
}

impl OrchestratorReport {
    /// Number of modules currently in the given phase
    #[must_use]
    pub fn count_in(&self, phase: ModulePhase) -> usize {
        self.modules.iter().filter(|m| m.phase == phase).count()
    }

    /// Whether every registered module is currently started
    #[must_use]
    pub fn all_started(&self) -> bool {
        self.modules.iter().all(|m| m.phase.is_started())
    }
}

/// Internal: a registered module and its tracked phase
struct Entry {
    module: Arc<dyn Lifecycle>,
    phase: ModulePhase,
}

/// The orchestrator — owner of a module set.
///
/// Constructs nothing itself: modules are built externally (with their
/// context node, sandbox, and id) and handed over as [`Lifecycle`] trait
/// objects. The orchestrator guarantees the cross-module ordering the core
/// contract leaves to it: every `after` runs only once every `on` has
/// completed.
///
/// # Example
///
/// ```ignore
/// let mut orchestrator = Orchestrator::new();
/// orchestrator.register(Arc::new(module))?;
/// let started = orchestrator.start_all().await?;
/// assert_eq!(started, 1);
/// ```
pub struct Orchestrator {
    entries: Vec<Entry>,
    started: bool,
    stopped: bool,
}

impl Orchestrator {
    /// Create an empty orchestrator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            started: false,
            stopped: false,
        }
    }

    /// Register a module.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::DuplicateModule`] if a module with the same id
    ///   is already registered
    /// - [`OrchestratorError::AlreadyStarted`] if the set is already running
    pub fn register(&mut self, module: Arc<dyn Lifecycle>) -> Result<(), OrchestratorError> {
        if self.started {
            return Err(OrchestratorError::AlreadyStarted);
        }
        if self.entries.iter().any(|e| e.module.id() == module.id()) {
            return Err(OrchestratorError::DuplicateModule {
                id: module.id().clone(),
            });
        }

        tracing::debug!(id = %module.id(), "module registered");
        metrics::counter!("orchestrator.modules_registered").increment(1);

        self.entries.push(Entry {
            module,
            phase: ModulePhase::Registered,
        });

        // Intentional cast for metrics - registry sizes are far below 2^53
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("orchestrator.modules").set(self.entries.len() as f64);

        Ok(())
    }

    /// Number of registered modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no modules are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Phase of the module with the given id, if registered
    #[must_use]
    pub fn phase(&self, id: &ModuleId) -> Option<ModulePhase> {
        self.entries
            .iter()
            .find(|e| e.module.id() == id)
            .map(|e| e.phase)
    }

    /// Start every registered module.
    ///
    /// Phase one starts all modules concurrently and awaits every start
    /// future at the barrier. Phase two invokes every resolved
    /// [`AfterHandle`], in registration order. Returns the number of modules
    /// started.
    ///
    /// A module that never signals completion keeps this call pending
    /// forever; there is no timeout by contract.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::AlreadyStarted`] if called more than once.
    pub async fn start_all(&mut self) -> Result<usize, OrchestratorError> {
        if self.started {
            return Err(OrchestratorError::AlreadyStarted);
        }
        self.started = true;

        let count = self.entries.len();
        tracing::info!(modules = count, "starting modules");

        let starts = self
            .entries
            .iter()
            .map(|entry| Arc::clone(&entry.module).start());
        let handles: Vec<AfterHandle> = futures::future::join_all(starts).await;

        for entry in &mut self.entries {
            entry.phase = ModulePhase::Started;
        }
        metrics::counter!("orchestrator.modules_started").increment(count as u64);

        // Barrier passed: every module's main logic is done, so the
        // synchronized follow-ups may run.
        for (entry, handle) in self.entries.iter().zip(handles) {
            tracing::debug!(id = %entry.module.id(), "running synchronized follow-up");
            handle.invoke();
        }

        tracing::info!(modules = count, "modules started");
        Ok(count)
    }

    /// Stop every started module, in reverse registration order.
    ///
    /// Returns the number of modules stopped.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::NotStarted`] if the set was never started
    /// - [`OrchestratorError::AlreadyStopped`] if called more than once
    pub fn stop_all(&mut self) -> Result<usize, OrchestratorError> {
        if !self.started {
            return Err(OrchestratorError::NotStarted);
        }
        if self.stopped {
            return Err(OrchestratorError::AlreadyStopped);
        }
        self.stopped = true;

        for entry in self.entries.iter_mut().rev() {
            tracing::debug!(id = %entry.module.id(), "stopping module");
            entry.module.stop();
            entry.phase = ModulePhase::Stopped;
        }

        let count = self.entries.len();
        metrics::counter!("orchestrator.modules_stopped").increment(count as u64);
        tracing::info!(modules = count, "modules stopped");
        Ok(count)
    }

    /// Take a phase snapshot of every registered module.
    #[must_use]
    pub fn report(&self) -> OrchestratorReport {
        OrchestratorReport {
            modules: self
                .entries
                .iter()
                .map(|e| ModuleStatus {
                    id: e.module.id().clone(),
                    phase: e.phase,
                })
                .collect(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("modules", &self.entries.len())
            .field("started", &self.started)
            .field("stopped", &self.stopped)
            .finish()
    }
}
