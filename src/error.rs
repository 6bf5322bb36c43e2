//! Engine error taxonomy.
//!
//! A component invocation returning anything but exactly one element is
//! unrepresentable here - the component signature returns [`crate::Element`]
//! by construction - so the runtime failures left are hook violations and
//! host renderer failures. Either one abandons the in-flight pass; the
//! committed tree is never touched by a failed pass. There is no automatic
//! retry: the recovery path is a fresh render or update request.

use thiserror::Error;

use crate::host::HostError;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// A component's hook call count differs from its previous pass.
    /// Conditional hook calls are unsupported; hooks are addressed by
    /// position only.
    #[error("hook order changed between renders: expected {expected} hook call(s), found {found}")]
    HookOrder { expected: usize, found: usize },

    /// The hook at `index` held state of a different type than the current
    /// call asked for, which also indicates a shifted call order.
    #[error("hook state type changed between renders at hook {index}")]
    HookType { index: usize },

    /// A Host Renderer primitive failed. Mutations already applied in the
    /// same commit are not rolled back.
    #[error(transparent)]
    Host(#[from] HostError),
}
