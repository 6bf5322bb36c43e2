//! Fiber tree - the mutable work tree built during a reconciliation pass.
//!
//! Fibers live in a [`slotmap`] arena and reference each other by key, so the
//! n-ary tree is encoded left-child/right-sibling with back-references and no
//! cyclic ownership. `parent`/`child`/`sibling` together let the depth-first
//! walk advance one unit at a time without an explicit stack, which is what
//! makes the work loop restartable between units.
//!
//! Two trees share the arena at once: the committed tree from the previous
//! pass and the work-in-progress tree diffing against it through `alternate`
//! links. Commit swaps the root keys and frees the old tree.

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::element::{Element, ElementKind, Props};
use crate::hooks::Hook;

new_key_type! {
    /// Arena key identifying one fiber.
    pub struct FiberId;
}

/// The fiber arena, generic over the host node handle type.
pub type FiberArena<N> = SlotMap<FiberId, Fiber<N>>;

/// Fiber type: like [`ElementKind`] plus the synthetic root that anchors a
/// pass at the host container.
#[derive(Clone, Debug)]
pub enum FiberKind {
    Root,
    Host(String),
    Text,
    Component(crate::element::ComponentFn),
}

impl FiberKind {
    pub fn from_element(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Host(tag) => Self::Host(tag.clone()),
            ElementKind::Text => Self::Text,
            ElementKind::Component(f) => Self::Component(f.clone()),
        }
    }

    /// Does this fiber have the same type as the element at its position?
    pub fn matches(&self, kind: &ElementKind) -> bool {
        match (self, kind) {
            (Self::Host(a), ElementKind::Host(b)) => a == b,
            (Self::Text, ElementKind::Text) => true,
            (Self::Component(a), ElementKind::Component(b)) => a.same(b),
            _ => false,
        }
    }
}

/// What the committer must do for a fiber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectTag {
    #[default]
    None,
    Placement,
    Update,
    Deletion,
}

/// One mutable work node; one per element per pass.
///
/// Every fiber except the root has exactly one parent. `child` points only
/// to the first child; the rest are reachable along the `sibling` chain.
#[derive(Debug)]
pub struct Fiber<N> {
    pub kind: FiberKind,
    pub props: Props,
    /// Desired child elements, reconciled against the alternate's child chain.
    pub children: Vec<Element>,
    /// Host node handle, once created or reused from the alternate.
    pub node: Option<N>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Fiber at the same position in the previously committed tree.
    pub alternate: Option<FiberId>,
    pub effect: EffectTag,
    pub hooks: SmallVec<[Hook; 4]>,
}

impl<N> Fiber<N> {
    /// The synthetic root fiber anchoring a pass at the host container.
    pub fn root(node: N, props: Props, children: Vec<Element>, alternate: Option<FiberId>) -> Self {
        Self {
            kind: FiberKind::Root,
            props,
            children,
            node: Some(node),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: EffectTag::None,
            hooks: SmallVec::new(),
        }
    }

    /// A fresh fiber for an element with no reusable counterpart.
    pub fn placement(element: &Element, parent: FiberId) -> Self {
        Self {
            kind: FiberKind::from_element(&element.kind),
            props: element.props.clone(),
            children: element.children.clone(),
            node: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: EffectTag::Placement,
            hooks: SmallVec::new(),
        }
    }

    /// A fiber reusing the old host node because the type matched.
    pub fn update(
        element: &Element,
        kind: FiberKind,
        node: Option<N>,
        parent: FiberId,
        alternate: FiberId,
    ) -> Self {
        Self {
            kind,
            props: element.props.clone(),
            children: element.children.clone(),
            node,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(alternate),
            effect: EffectTag::Update,
            hooks: SmallVec::new(),
        }
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Advance a pre-order walk by one step: own child first, otherwise the
/// nearest ancestor sibling, stopping at `stop` (the walk's root).
pub fn next_preorder<N>(fibers: &FiberArena<N>, id: FiberId, stop: FiberId) -> Option<FiberId> {
    if let Some(child) = fibers[id].child {
        return Some(child);
    }
    let mut current = id;
    loop {
        if current == stop {
            return None;
        }
        if let Some(sibling) = fibers[current].sibling {
            return Some(sibling);
        }
        current = fibers[current].parent?;
    }
}

/// Collect a subtree's fiber ids (the root included, its siblings excluded).
pub fn collect_subtree<N>(fibers: &FiberArena<N>, root: FiberId) -> Vec<FiberId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        out.push(id);
        let mut child = fibers.get(id).and_then(|f| f.child);
        while let Some(c) = child {
            stack.push(c);
            child = fibers.get(c).and_then(|f| f.sibling);
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
