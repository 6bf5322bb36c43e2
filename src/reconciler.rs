//! Reconciler - the per-unit diff step.
//!
//! One work unit enters a fiber, produces or refreshes its host node or
//! invokes its component, diffs its desired children against the alternate's
//! child chain, links the resulting fibers, and returns the next unit in
//! pre-order. A unit is never interrupted mid-way; the scheduler only yields
//! between units.
//!
//! The diff is positional. Walking the new element list and the old sibling
//! chain in lockstep, each position resolves to exactly one of:
//! same type -> UPDATE (reuse node, link alternate); new element with a
//! differing or missing counterpart -> PLACEMENT; old fiber with a differing
//! or missing counterpart -> DELETION (queued, absent from the new tree).
//! Type equality is the only reuse criterion - property differences are the
//! update delta's business, not the effect tag's.

use tracing::trace;

use crate::element::{Element, Props};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::fiber::{EffectTag, Fiber, FiberId, FiberKind, next_preorder};
use crate::hooks::HookContext;
use crate::host::{HostNodeSpec, HostRenderer, PropDelta};

impl<H: HostRenderer> Engine<H> {
    /// Process one work unit and return the next, or `None` when the tree is
    /// exhausted.
    pub(crate) fn perform_unit(
        &mut self,
        unit: FiberId,
        pass_root: FiberId,
    ) -> Result<Option<FiberId>, EngineError> {
        trace!("perform unit");
        match self.fibers[unit].kind.clone() {
            FiberKind::Component(component) => {
                let rendered = self.invoke_component(unit, &component)?;
                self.reconcile_children(unit, &[rendered]);
            }
            FiberKind::Root | FiberKind::Host(_) | FiberKind::Text => {
                self.prepare_host_node(unit)?;
                let elements = self.fibers[unit].children.clone();
                self.reconcile_children(unit, &elements);
            }
        }
        Ok(next_preorder(&self.fibers, unit, pass_root))
    }

    /// Invoke a component with its properties, re-binding its hooks to the
    /// alternate's positional cells, and return its single rendered child.
    fn invoke_component(
        &mut self,
        unit: FiberId,
        component: &crate::element::ComponentFn,
    ) -> Result<Element, EngineError> {
        let props = self.fibers[unit].props.clone();
        let prev_hooks = self.fibers[unit]
            .alternate
            .map(|alt| self.fibers[alt].hooks.clone());

        let mut cx = HookContext::new(prev_hooks.as_deref(), self.signal.clone());
        let rendered = component.call(&props, &mut cx);
        self.fibers[unit].hooks = cx.finish()?;
        Ok(rendered)
    }

    /// Create the host node for a host or text fiber that does not have one
    /// yet. The node stays detached until commit; initial properties go
    /// through the same delta path as updates.
    fn prepare_host_node(&mut self, unit: FiberId) -> Result<(), EngineError> {
        if self.fibers[unit].node.is_some() {
            return Ok(());
        }
        let spec = match &self.fibers[unit].kind {
            FiberKind::Host(tag) => HostNodeSpec::Tag(tag),
            FiberKind::Text => HostNodeSpec::Text,
            // The root always carries the container it was created with.
            FiberKind::Root | FiberKind::Component(_) => return Ok(()),
        };
        let node = self.host.create_node(spec)?;

        let initial = PropDelta::between(&Props::default(), &self.fibers[unit].props);
        if !initial.is_empty() {
            self.host.apply_props(&node, &initial)?;
        }
        self.fibers[unit].node = Some(node);
        Ok(())
    }

    /// Diff `elements` against the alternate's child chain positionally and
    /// link the produced fibers under `wip`.
    fn reconcile_children(&mut self, wip: FiberId, elements: &[Element]) {
        let mut index = 0usize;
        let mut old = self.fibers[wip]
            .alternate
            .and_then(|alt| self.fibers[alt].child);
        let mut prev_sibling: Option<FiberId> = None;

        while index < elements.len() || old.is_some() {
            let element = elements.get(index);
            let mut new_fiber = None;

            match (old, element) {
                // Same type at this position: keep the node, diff the props
                // at commit time.
                (Some(old_id), Some(element)) if self.fibers[old_id].kind.matches(&element.kind) => {
                    let kind = self.fibers[old_id].kind.clone();
                    let node = self.fibers[old_id].node.clone();
                    new_fiber = Some(
                        self.fibers
                            .insert(Fiber::update(element, kind, node, wip, old_id)),
                    );
                }
                // New element without a reusable counterpart.
                (_, Some(element)) => {
                    new_fiber = Some(self.fibers.insert(Fiber::placement(element, wip)));
                    if let Some(old_id) = old {
                        self.mark_deletion(old_id);
                    }
                }
                // Old fiber with no counterpart: it simply has no entry in
                // the new tree.
                (Some(old_id), None) => self.mark_deletion(old_id),
                (None, None) => {}
            }

            if let Some(old_id) = old {
                old = self.fibers[old_id].sibling;
            }

            if index == 0 {
                self.fibers[wip].child = new_fiber;
            } else if let (Some(prev), Some(new)) = (prev_sibling, new_fiber) {
                self.fibers[prev].sibling = Some(new);
            }
            if new_fiber.is_some() {
                prev_sibling = new_fiber;
            }
            index += 1;
        }
    }

    fn mark_deletion(&mut self, old_id: FiberId) {
        self.fibers[old_id].effect = EffectTag::Deletion;
        self.deletions.push(old_id);
    }
}

// =============================================================================
// Tests
// =============================================================================
