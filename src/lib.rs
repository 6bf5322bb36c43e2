//! # weft
//!
//! Incremental UI-tree reconciliation engine.
//!
//! Given a description of a desired tree (an [`Element`] tree) and the
//! previously committed tree, weft computes the minimal set of host
//! mutations to bring them in line - without ever blocking its host for
//! more than a bounded time slice.
//!
//! ## Architecture
//!
//! Rendering is split into two phases over a double-buffered fiber tree:
//!
//! ```text
//! Element tree → fiber work tree (diff vs. alternate, effect-tagged)
//!              → commit (deletions, placements, property deltas) → host tree
//! ```
//!
//! The render phase is a restartable pre-order walk processed one work unit
//! at a time; the scheduler yields between units whenever the time budget
//! runs low and resumes on the next slice. The commit phase is atomic and
//! never interrupted. Component fibers carry positional hook state
//! ([`HookContext::use_state`]) that survives passes through shared cells.
//!
//! The engine is single-threaded and cooperative: correctness rests on
//! phase separation, not locks. Host-tree mutation primitives come from a
//! [`HostRenderer`] collaborator and idle time from a [`SchedulerHost`] (or
//! direct [`Engine::run_slice`] calls).
//!
//! ## Modules
//!
//! - [`element`] - immutable element model (types, props, listeners)
//! - [`fiber`] - the arena-backed mutable work tree
//! - [`hooks`] - positional component state
//! - [`engine`] - the state-owning engine object
//! - [`scheduler`] - cooperative work loop and scheduling contract
//! - [`host`] - Host Renderer interface and property diffing
//!
//! ## Example
//!
//! ```ignore
//! let mut engine = Engine::new(my_host);
//! engine.render(
//!     Element::host("div", Props::new().with("id", "app"), ["hello".into()]),
//!     container,
//! );
//! engine.run_until_idle(Duration::from_millis(4))?;
//! ```

pub mod element;
pub mod engine;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod scheduler;

mod committer;
mod reconciler;

pub use element::{
    Child, ComponentFn, Element, ElementKind, Listener, NODE_VALUE, PropValue, Props,
};
pub use engine::Engine;
pub use error::EngineError;
pub use fiber::{EffectTag, Fiber, FiberId, FiberKind};
pub use hooks::{HookContext, StateSetter};
pub use host::{HostError, HostNodeSpec, HostRenderer, HostResult, PropDelta};
pub use scheduler::{
    Deadline, SchedulerHost, SliceOutcome, TimeBudget, YIELD_THRESHOLD, drive,
};
