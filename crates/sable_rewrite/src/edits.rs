//! Deferred AST edits.
//!
//! The rewriter never restructures the tree while visiting it. Edits are
//! recorded here and applied at the end of each template, which also lets
//! the pass throw the whole batch away when an error was reported.

use indexmap::{IndexMap, IndexSet};
use sable_ast::{Arena, NodeId};

/// A batch of recorded tree edits.
///
/// `apply` runs removes (with their replacements) before added children, so
/// a node may appear in its own replacement list: a no-op replace unlinks
/// it and puts it back at the same index.
#[derive(Debug, Default)]
pub struct AstEdits {
    /// Nodes to unlink, in recording order.
    to_remove: IndexSet<NodeId>,
    /// Nodes to insert at a removed node's old position.
    replacements: IndexMap<NodeId, Vec<NodeId>>,
    /// Children to append per parent, in recording order.
    new_children: IndexMap<NodeId, Vec<NodeId>>,
}

impl AstEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a node for unlink. Nodes that are not in the tree (yet) are
    /// skipped, so freshly created nodes can be passed without ceremony.
    pub fn remove(&mut self, arena: &Arena, node: NodeId) {
        if arena.parent(node).is_some() {
            self.to_remove.insert(node);
        }
    }

    /// Unlinks `old` and records `new_nodes` for insertion at its position.
    pub fn replace(&mut self, arena: &Arena, old: NodeId, new_nodes: &[NodeId]) {
        debug_assert!(
            arena.parent(old).is_some(),
            "node must be in the tree to be replaced"
        );
        self.remove(arena, old);
        self.replacements.entry(old).or_default().extend_from_slice(new_nodes);
    }

    /// Records a child to append to `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.new_children.entry(parent).or_default().push(child);
    }

    /// Records children to append to `parent`.
    pub fn add_children(&mut self, parent: NodeId, children: &[NodeId]) {
        self.new_children
            .entry(parent)
            .or_default()
            .extend_from_slice(children);
    }

    /// Applies all recorded edits and clears the buffer.
    pub fn apply(&mut self, arena: &mut Arena) {
        for node in std::mem::take(&mut self.to_remove) {
            let parent = arena
                .parent(node)
                .expect("node marked for removal is not in the tree");
            let index = arena
                .child_index(parent, node)
                .expect("parent does not contain its child");
            // remove before inserting so a no-op replace (or a replacement
            // list containing the removed node) lands at the right index
            arena.remove_child(parent, index);
            if let Some(replacement) = self.replacements.get(&node) {
                arena.insert_children(parent, index, replacement);
            }
        }
        for (parent, children) in std::mem::take(&mut self.new_children) {
            arena.add_children(parent, &children);
        }
        self.replacements.clear();
    }

    /// Drops all recorded edits.
    pub fn clear(&mut self) {
        self.to_remove.clear();
        self.replacements.clear();
        self.new_children.clear();
    }
}
