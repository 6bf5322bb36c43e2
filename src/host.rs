//! Host Renderer interface - the external collaborator that owns the real
//! mutable tree.
//!
//! The engine mirrors the committed fiber tree into a host tree it never
//! inspects: it only creates nodes, attaches and detaches them, and applies
//! property deltas. Handles are opaque and cheap to clone (an id, an `Rc`, a
//! generational key - whatever the host uses).
//!
//! [`PropDelta`] is the one place property semantics live: a key following
//! the `on*` convention is an event listener, everything else is a plain
//! property, and `children` never appears because child elements are
//! structural, not properties.

use thiserror::Error;

use crate::element::{Listener, PropValue, Props};

/// Failure reported by a Host Renderer primitive.
#[derive(Debug, Error, PartialEq)]
#[error("host renderer: {message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// What kind of host node to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostNodeSpec<'a> {
    /// A primitive node for a host tag.
    Tag(&'a str),
    /// A text node; content arrives through the `nodeValue` property.
    Text,
}

/// The mutation primitives the engine needs from a host tree.
pub trait HostRenderer {
    /// Opaque handle to one host node.
    type Node: Clone;

    /// Create a detached node. Properties are applied separately and the
    /// node only becomes visible once attached during commit.
    fn create_node(&mut self, spec: HostNodeSpec<'_>) -> HostResult<Self::Node>;

    /// Apply a property/listener delta to a node.
    fn apply_props(&mut self, node: &Self::Node, delta: &PropDelta) -> HostResult<()>;

    /// Append `child` under `parent`.
    fn attach_child(&mut self, parent: &Self::Node, child: &Self::Node) -> HostResult<()>;

    /// Remove `child` from `parent`.
    fn detach_child(&mut self, parent: &Self::Node, child: &Self::Node) -> HostResult<()>;
}

// =============================================================================
// Property diffing
// =============================================================================

/// A property key signals an event binding iff it uses the `on*` convention.
pub fn is_event_key(key: &str) -> bool {
    key.starts_with("on")
}

/// Host event name for a listener key: lowercased, `on` prefix stripped
/// (`onClick` -> `click`). Keys shorter than the prefix yield an empty name.
pub fn event_name(key: &str) -> String {
    key.get(2..).unwrap_or_default().to_lowercase()
}

/// The exact host mutations needed to move a node from one property bag to
/// another.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropDelta {
    /// Plain properties absent from the new bag; the host resets them.
    pub removed: Vec<String>,
    /// Plain properties that are new or whose value changed.
    pub set: Vec<(String, PropValue)>,
    /// Listeners (event name, handler) gone or replaced; removed before any
    /// additions so a changed handler is never registered twice.
    pub removed_listeners: Vec<(String, Listener)>,
    /// Listeners new or replaced.
    pub added_listeners: Vec<(String, Listener)>,
}

impl PropDelta {
    /// Diff two property bags. An empty delta means the commit can skip the
    /// host call entirely.
    pub fn between(prev: &Props, next: &Props) -> Self {
        let mut delta = Self::default();

        for (key, value) in prev.iter() {
            if let (true, PropValue::Handler(handler)) = (is_event_key(key), value) {
                let kept = matches!(
                    next.get(key),
                    Some(PropValue::Handler(new)) if new.same(handler)
                );
                if !kept {
                    delta
                        .removed_listeners
                        .push((event_name(key), handler.clone()));
                }
            } else if !next.contains(key) {
                delta.removed.push(key.to_string());
            }
        }

        for (key, value) in next.iter() {
            if let (true, PropValue::Handler(handler)) = (is_event_key(key), value) {
                let unchanged = matches!(
                    prev.get(key),
                    Some(PropValue::Handler(old)) if old.same(handler)
                );
                if !unchanged {
                    delta
                        .added_listeners
                        .push((event_name(key), handler.clone()));
                }
            } else if prev.get(key) != Some(value) {
                delta.set.push((key.to_string(), value.clone()));
            }
        }

        delta
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.set.is_empty()
            && self.removed_listeners.is_empty()
            && self.added_listeners.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
