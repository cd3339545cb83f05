//! # Modular Rust Core
//!
//! Core traits and types for the Modular Rust component framework.
//!
//! This crate defines the lifecycle contract a UI module must satisfy: a
//! module binds a [`Behavior`] to a context element and is owned by a central
//! coordinator (the sandbox) that grants it access to shared services.
//!
//! ## Core Concepts
//!
//! - **`ContextNode`**: the DOM-like node a module operates on, owned
//!   externally
//! - **Sandbox**: an application-defined shared service type, injected as a
//!   generic parameter and never mutated by the framework
//! - **`Behavior`**: the overridable hooks (`on`, `after`, `stop`) a concrete
//!   module supplies
//! - **`Module`**: the base that stores `(context, sandbox, id, behavior)`
//!   and drives the two-phase start protocol
//! - **`AfterHandle`**: the start future's resolved value; invoking it runs
//!   the synchronized follow-up exactly once
//!
//! ## The two-phase start protocol
//!
//! `start()` decouples "do potentially asynchronous work" (`on`) from
//! "finalize after all sibling modules have reached the same point"
//! (`after`). An orchestrator starts many modules concurrently, awaits all
//! their futures, and only then invokes every resolved handle — so no
//! module's follow-up runs before another module's asynchronous setup has
//! completed. The orchestrator itself lives in `modular-rust-runtime`.
//!
//! ## Example
//!
//! ```
//! use modular_rust_core::{Behavior, ContextNode, Module, ModuleId};
//! use std::sync::Arc;
//!
//! struct Shell; // application-defined sandbox
//!
//! struct Banner;
//!
//! impl Behavior<Shell> for Banner {}
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let module = Arc::new(Module::new(
//!     Arc::new(ContextNode::new("header")),
//!     Arc::new(Shell),
//!     ModuleId::new("banner-1"),
//!     Banner,
//! ));
//!
//! // Default hooks: resolves immediately, follow-up is a no-op.
//! let handle = module.start().await;
//! handle.invoke();
//! # }
//! ```

pub mod context;
pub mod module;

pub use context::ContextNode;
pub use module::{AfterHandle, Behavior, Completion, Lifecycle, Module, ModuleId, Scope};

// Re-export so downstream crates derive against the same serde version.
pub use serde::{Deserialize, Serialize};
