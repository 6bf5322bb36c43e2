//! Committer - the uninterrupted second phase.
//!
//! Once the unit queue drains, the finished work tree is mirrored into the
//! host tree in one pass that never yields. Deletions always go first:
//! removing stale nodes must not be reordered with respect to inserting
//! nodes that might reuse the same slot. Then a pre-order walk applies
//! PLACEMENT attachments and UPDATE deltas; component fibers have no node of
//! their own but are still walked for their descendants.
//!
//! The pass ends with the atomic part: the work-in-progress root becomes the
//! committed root (a pointer swap), the old tree's fibers are freed, and the
//! deletion queue is cleared. A host failure mid-commit propagates to the
//! caller; mutations already applied are not rolled back - the only recovery
//! is a fresh render request.

use tracing::debug;

use crate::engine::Engine;
use crate::fiber::{EffectTag, FiberId, next_preorder};
use crate::host::{HostResult, HostRenderer, PropDelta};

impl<H: HostRenderer> Engine<H> {
    /// Apply the finished pass to the host tree and swap the committed root.
    pub(crate) fn commit_root(&mut self, pass_root: FiberId) -> HostResult<()> {
        let deletions = std::mem::take(&mut self.deletions);
        debug!(deletions = deletions.len(), "commit started");
        for deleted in deletions {
            self.commit_deletion(deleted)?;
        }

        let mut cursor = self.fibers[pass_root].child;
        while let Some(id) = cursor {
            self.commit_fiber(id)?;
            cursor = next_preorder(&self.fibers, id, pass_root);
        }

        let old_root = self.current_root.replace(pass_root);
        // The old tree is freed below; the new root must not keep a key
        // into it.
        self.fibers[pass_root].alternate = None;
        self.wip_root = None;
        self.next_unit = None;
        if let Some(old_root) = old_root {
            self.free_tree(old_root);
        }
        debug!("commit finished");
        Ok(())
    }

    fn commit_fiber(&mut self, id: FiberId) -> HostResult<()> {
        match self.fibers[id].effect {
            EffectTag::Placement => {
                if let Some(node) = self.fibers[id].node.clone()
                    && let Some(parent) = self.nearest_host_ancestor(id)
                {
                    self.host.attach_child(&parent, &node)?;
                }
            }
            EffectTag::Update => {
                if let Some(node) = self.fibers[id].node.clone() {
                    let prev = self.fibers[id]
                        .alternate
                        .map(|alt| self.fibers[alt].props.clone())
                        .unwrap_or_default();
                    let delta = PropDelta::between(&prev, &self.fibers[id].props);
                    if !delta.is_empty() {
                        self.host.apply_props(&node, &delta)?;
                    }
                }
            }
            EffectTag::None | EffectTag::Deletion => {}
        }

        // The alternate was only needed as the diff baseline; the old tree
        // is freed at the end of this commit.
        let fiber = &mut self.fibers[id];
        fiber.effect = EffectTag::None;
        fiber.alternate = None;
        Ok(())
    }

    /// Detach a deleted fiber's host node from its nearest host ancestor.
    /// Component fibers own no node, so descend the child chain to the first
    /// fiber that does.
    fn commit_deletion(&mut self, id: FiberId) -> HostResult<()> {
        let Some(parent) = self.nearest_host_ancestor(id) else {
            return Ok(());
        };
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if let Some(node) = self.fibers[current].node.clone() {
                self.host.detach_child(&parent, &node)?;
                return Ok(());
            }
            cursor = self.fibers[current].child;
        }
        Ok(())
    }

    /// Host node of the nearest ancestor fiber that owns one. The synthetic
    /// root always does (the container), so this only misses for detached
    /// fibers.
    fn nearest_host_ancestor(&self, id: FiberId) -> Option<H::Node> {
        let mut cursor = self.fibers[id].parent;
        while let Some(parent) = cursor {
            if let Some(node) = &self.fibers[parent].node {
                return Some(node.clone());
            }
            cursor = self.fibers[parent].parent;
        }
        None
    }
}
