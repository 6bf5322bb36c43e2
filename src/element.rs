//! Element model - immutable descriptions of the desired tree.
//!
//! An [`Element`] is what a render pass asks for: a type, a property bag and
//! an ordered list of child elements. Elements are plain values; the mutable
//! counterpart built during reconciliation is the fiber tree (see
//! [`crate::fiber`]).
//!
//! Text content is normalized into a synthetic element of kind
//! [`ElementKind::Text`] carrying a single `nodeValue` property, so the rest
//! of the engine never special-cases bare strings.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::hooks::HookContext;

/// Property key under which text elements carry their content.
pub const NODE_VALUE: &str = "nodeValue";

// =============================================================================
// Listeners
// =============================================================================

/// An event handler attached to a host node.
///
/// Listeners compare by identity, not by behavior: two separately constructed
/// closures are never equal, while clones of the same listener always are.
/// The property diff relies on this to decide when a handler must be
/// re-registered on the host.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn()>);

impl Listener {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the handler.
    pub fn invoke(&self) {
        (self.0)();
    }

    /// Identity comparison.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

// =============================================================================
// Property values
// =============================================================================

/// A single property value.
///
/// Handlers are carried inline with the other values; the committer
/// classifies a property as a listener by its `on*` key (see
/// [`crate::host::is_event_key`]).
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Handler(Listener),
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Listener> for PropValue {
    fn from(value: Listener) -> Self {
        Self::Handler(value)
    }
}

/// An element's property bag.
///
/// Keys iterate in sorted order so host calls derived from a diff are
/// deterministic. `children` is never stored here; child elements live on
/// [`Element::children`] directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: BTreeMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Component functions
// =============================================================================

/// Signature shared by all component functions.
pub type ComponentBody = dyn Fn(&Props, &mut HookContext<'_>) -> Element;

/// A component: a function from properties (plus hook access) to exactly one
/// child element.
///
/// Reconciliation reuses a fiber only when the new element has the *same*
/// component, so equality is identity-based: plain `fn` items compare by
/// function address, shared closures by allocation.
#[derive(Clone)]
pub enum ComponentFn {
    Ptr(fn(&Props, &mut HookContext<'_>) -> Element),
    Shared(Rc<ComponentBody>),
}

impl ComponentFn {
    /// Wrap a capturing closure. Keep the returned value around and clone it
    /// into every render that should reuse the same component instance type.
    pub fn shared(f: impl Fn(&Props, &mut HookContext<'_>) -> Element + 'static) -> Self {
        Self::Shared(Rc::new(f))
    }

    /// Invoke the component's render function.
    pub fn call(&self, props: &Props, cx: &mut HookContext<'_>) -> Element {
        match self {
            Self::Ptr(f) => f(props, cx),
            Self::Shared(f) => f(props, cx),
        }
    }

    /// Identity comparison used as the fiber reuse criterion.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ptr(a), Self::Ptr(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Self::Shared(a), Self::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<fn(&Props, &mut HookContext<'_>) -> Element> for ComponentFn {
    fn from(f: fn(&Props, &mut HookContext<'_>) -> Element) -> Self {
        Self::Ptr(f)
    }
}

impl fmt::Debug for ComponentFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ptr(_) => f.write_str("ComponentFn::Ptr(..)"),
            Self::Shared(_) => f.write_str("ComponentFn::Shared(..)"),
        }
    }
}

// =============================================================================
// Elements
// =============================================================================

/// The type of an element: a host tag, synthetic text, or a component.
#[derive(Clone, Debug)]
pub enum ElementKind {
    Host(String),
    Text,
    Component(ComponentFn),
}

impl ElementKind {
    /// Type equality, the sole criterion for fiber reuse. Position is not
    /// enough and property values are irrelevant here.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Text, Self::Text) => true,
            (Self::Component(a), Self::Component(b)) => a.same(b),
            _ => false,
        }
    }
}

impl PartialEq for ElementKind {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

/// Immutable description of one desired tree node.
#[derive(Clone, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub props: Props,
    pub children: Vec<Element>,
}

impl Element {
    /// Construct an element, coercing and filtering children.
    pub fn new(kind: ElementKind, props: Props, children: impl IntoIterator<Item = Child>) -> Self {
        let children = children
            .into_iter()
            .filter_map(|child| match child {
                Child::Node(element) => Some(element),
                Child::Nothing => None,
            })
            .collect();
        Self {
            kind,
            props,
            children,
        }
    }

    /// A host-tag element.
    pub fn host(
        tag: impl Into<String>,
        props: Props,
        children: impl IntoIterator<Item = Child>,
    ) -> Self {
        Self::new(ElementKind::Host(tag.into()), props, children)
    }

    /// A synthetic text element with a single `nodeValue` property.
    pub fn text(value: impl fmt::Display) -> Self {
        Self {
            kind: ElementKind::Text,
            props: Props::new().with(NODE_VALUE, value.to_string()),
            children: Vec::new(),
        }
    }

    /// A component element.
    pub fn component(f: impl Into<ComponentFn>, props: Props) -> Self {
        Self {
            kind: ElementKind::Component(f.into()),
            props,
            children: Vec::new(),
        }
    }
}

/// A candidate child accepted by [`Element::new`].
///
/// Strings and numbers coerce to text elements. Booleans and `None` coerce
/// to [`Child::Nothing`] and are dropped entirely - they never show up as
/// literal "false"/"None" text nodes.
#[derive(Clone, Debug)]
pub enum Child {
    Node(Element),
    Nothing,
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Node(element)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Self::Node(Element::text(value))
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Self::Node(Element::text(value))
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Self::Node(Element::text(value))
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Self::Node(Element::text(value))
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Self::Node(Element::text(value))
    }
}

impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Self::Nothing
    }
}

impl<C: Into<Child>> From<Option<C>> for Child {
    fn from(value: Option<C>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Self::Nothing,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_normalization() {
        let el = Element::host("div", Props::new(), ["hello".into(), 42.into()]);

        assert_eq!(el.children.len(), 2);
        assert_eq!(el.children[0].kind, ElementKind::Text);
        assert_eq!(
            el.children[0].props.get(NODE_VALUE),
            Some(&PropValue::Text("hello".into()))
        );
        assert_eq!(
            el.children[1].props.get(NODE_VALUE),
            Some(&PropValue::Text("42".into()))
        );
    }

    #[test]
    fn test_falsy_children_render_nothing() {
        let maybe: Option<Element> = None;
        let el = Element::host(
            "div",
            Props::new(),
            [false.into(), true.into(), maybe.into(), "kept".into()],
        );

        assert_eq!(el.children.len(), 1);
        assert_eq!(
            el.children[0].props.get(NODE_VALUE),
            Some(&PropValue::Text("kept".into()))
        );
    }

    #[test]
    fn test_host_kind_equality() {
        assert_eq!(
            ElementKind::Host("div".into()),
            ElementKind::Host("div".into())
        );
        assert_ne!(
            ElementKind::Host("div".into()),
            ElementKind::Host("span".into())
        );
        assert_ne!(ElementKind::Host("div".into()), ElementKind::Text);
    }

    #[test]
    fn test_component_identity() {
        fn a(_: &Props, _: &mut HookContext<'_>) -> Element {
            Element::text("a")
        }
        fn b(_: &Props, _: &mut HookContext<'_>) -> Element {
            Element::text("b")
        }

        let ka = ElementKind::Component(ComponentFn::Ptr(a));
        let ka2 = ElementKind::Component(ComponentFn::Ptr(a));
        let kb = ElementKind::Component(ComponentFn::Ptr(b));
        assert_eq!(ka, ka2);
        assert_ne!(ka, kb);

        let shared = ComponentFn::shared(|_, _| Element::text("c"));
        let k1 = ElementKind::Component(shared.clone());
        let k2 = ElementKind::Component(shared);
        let k3 = ElementKind::Component(ComponentFn::shared(|_, _| Element::text("c")));
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_listener_identity() {
        let l1 = Listener::new(|| {});
        let l2 = l1.clone();
        let l3 = Listener::new(|| {});

        assert_eq!(l1, l2);
        assert_ne!(l1, l3);
        assert_eq!(PropValue::from(l1.clone()), PropValue::Handler(l2));
        assert_ne!(PropValue::from(l1), PropValue::Handler(l3));
    }
}
