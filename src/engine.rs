//! Engine - the single owner of all reconciliation state.
//!
//! All scheduler state (next work unit, work-in-progress root, committed
//! root, deletion queue) lives here as plain fields, passed by `&mut` to the
//! reconciler, scheduler and committer. One logical thread drives the engine
//! cooperatively; there is no locking and the type is deliberately `!Send`.
//!
//! Render requests are queued FIFO and state-update requests raise a
//! coalesced signal; neither ever replaces an in-flight work-in-progress
//! tree. A new pass only begins once the engine is idle, so a pass that has
//! started always reaches commit or is abandoned by an error - it is never
//! silently dropped by a newer request.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId, collect_subtree};
use crate::hooks::UpdateSignal;
use crate::host::HostRenderer;

pub(crate) struct RenderRequest<N> {
    pub element: Element,
    pub container: N,
}

/// The reconciliation engine.
///
/// Owns the fiber arena holding both the committed tree and, during a pass,
/// the work-in-progress tree; owns the Host Renderer it mirrors into.
pub struct Engine<H: HostRenderer> {
    pub(crate) host: H,
    pub(crate) fibers: FiberArena<H::Node>,
    /// Root of the last fully committed pass; diff baseline for the next.
    pub(crate) current_root: Option<FiberId>,
    /// Root of the in-flight pass, if any.
    pub(crate) wip_root: Option<FiberId>,
    /// Pointer to the next work unit of the in-flight pass.
    pub(crate) next_unit: Option<FiberId>,
    /// Old fibers queued for detachment, in discovery order. Reset when a
    /// pass begins, cleared by the committer.
    pub(crate) deletions: Vec<FiberId>,
    /// FIFO queue of pending render requests.
    pub(crate) pending: VecDeque<RenderRequest<H::Node>>,
    /// Raised by setters; coalesces any number of state updates into one
    /// re-render of the committed tree.
    pub(crate) signal: UpdateSignal,
}

impl<H: HostRenderer> Engine<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            fibers: FiberArena::with_key(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            pending: VecDeque::new(),
            signal: UpdateSignal::default(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Request a render of `element` into `container`.
    ///
    /// Only queues the request; the work happens across subsequent
    /// [`run_slice`](Engine::run_slice) calls.
    pub fn render(&mut self, element: Element, container: H::Node) {
        debug!(queued = self.pending.len() + 1, "render requested");
        self.pending.push_back(RenderRequest { element, container });
    }

    /// Is there anything left to do: an in-flight pass, a queued render, or
    /// a raised update signal?
    pub fn has_pending_work(&self) -> bool {
        self.wip_root.is_some() || !self.pending.is_empty() || self.signal.is_raised()
    }

    /// Root fiber of the committed tree, if a pass has committed yet.
    pub fn committed_root(&self) -> Option<FiberId> {
        self.current_root
    }

    /// Inspect a fiber in either tree.
    pub fn fiber(&self, id: FiberId) -> Option<&Fiber<H::Node>> {
        self.fibers.get(id)
    }

    // =========================================================================
    // Pass lifecycle
    // =========================================================================

    /// Start the next pass if one is due: queued renders first, then the
    /// update signal. Returns whether a pass was started.
    ///
    /// Caller guarantees no pass is in flight.
    pub(crate) fn begin_next_pass(&mut self) -> bool {
        debug_assert!(self.wip_root.is_none());

        if let Some(request) = self.pending.pop_front() {
            let root = self.fibers.insert(Fiber::root(
                request.container,
                Default::default(),
                vec![request.element],
                self.current_root,
            ));
            self.start_pass(root);
            return true;
        }

        // A state update re-renders the committed tree in place: the new
        // root copies the committed root's container and children.
        if let Some(current) = self.current_root
            && self.signal.take()
        {
            let (node, props, children) = {
                let fiber = &self.fibers[current];
                (fiber.node.clone(), fiber.props.clone(), fiber.children.clone())
            };
            let Some(node) = node else {
                warn!("committed root has no container node; dropping update");
                return false;
            };
            let root = self
                .fibers
                .insert(Fiber::root(node, props, children, Some(current)));
            self.start_pass(root);
            return true;
        }

        false
    }

    fn start_pass(&mut self, root: FiberId) {
        self.deletions.clear();
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        debug!("pass started");
    }

    /// Throw away the in-flight pass, leaving the committed tree (and the
    /// host tree, barring an interrupted commit) untouched.
    pub(crate) fn abandon_pass(&mut self) {
        warn!("pass abandoned");
        self.next_unit = None;
        if let Some(root) = self.wip_root.take() {
            self.free_tree(root);
        }
        // Deletion marks were made on committed fibers; undo them so the
        // next pass starts from a clean baseline.
        for id in std::mem::take(&mut self.deletions) {
            if let Some(fiber) = self.fibers.get_mut(id) {
                fiber.effect = EffectTag::None;
            }
        }
    }

    /// Remove a whole subtree from the arena.
    pub(crate) fn free_tree(&mut self, root: FiberId) {
        for id in collect_subtree(&self.fibers, root) {
            self.fibers.remove(id);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Props;
    use crate::host::{HostNodeSpec, HostResult, PropDelta};

    /// Host that hands out numbered handles and ignores every mutation.
    struct NullHost {
        next: u32,
    }

    impl NullHost {
        fn new() -> Self {
            Self { next: 0 }
        }
    }

    impl HostRenderer for NullHost {
        type Node = u32;

        fn create_node(&mut self, _spec: HostNodeSpec<'_>) -> HostResult<u32> {
            self.next += 1;
            Ok(self.next)
        }

        fn apply_props(&mut self, _node: &u32, _delta: &PropDelta) -> HostResult<()> {
            Ok(())
        }

        fn attach_child(&mut self, _parent: &u32, _child: &u32) -> HostResult<()> {
            Ok(())
        }

        fn detach_child(&mut self, _parent: &u32, _child: &u32) -> HostResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_render_queues_fifo() {
        let mut engine = Engine::new(NullHost::new());
        assert!(!engine.has_pending_work());

        engine.render(Element::text("first"), 0);
        engine.render(Element::text("second"), 0);
        assert!(engine.has_pending_work());
        assert_eq!(engine.pending.len(), 2);

        assert!(engine.begin_next_pass());
        let root = engine.wip_root.unwrap();
        assert_eq!(
            engine.fibers[root].children[0].props.get(crate::NODE_VALUE),
            Some(&crate::PropValue::Text("first".into()))
        );
        assert_eq!(engine.pending.len(), 1);
    }

    #[test]
    fn test_update_signal_needs_committed_tree() {
        let mut engine = Engine::new(NullHost::new());
        engine.signal.request();

        // Nothing committed yet: the signal must stay raised, not be lost.
        assert!(!engine.begin_next_pass());
        assert!(engine.signal.is_raised());
    }

    #[test]
    fn test_abandon_pass_frees_wip_and_resets_marks() {
        let mut engine = Engine::new(NullHost::new());
        let committed = engine
            .fibers
            .insert(Fiber::root(7, Props::new(), Vec::new(), None));
        engine.current_root = Some(committed);
        engine.fibers[committed].effect = EffectTag::Deletion;
        engine.deletions.push(committed);

        let wip = engine
            .fibers
            .insert(Fiber::root(7, Props::new(), Vec::new(), Some(committed)));
        engine.wip_root = Some(wip);
        engine.next_unit = Some(wip);

        engine.abandon_pass();
        assert!(engine.wip_root.is_none());
        assert!(engine.next_unit.is_none());
        assert!(engine.fibers.get(wip).is_none());
        assert_eq!(engine.fibers[committed].effect, EffectTag::None);
        assert!(engine.deletions.is_empty());
    }
}
