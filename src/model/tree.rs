use std::ops::{Deref, DerefMut, Index, IndexMut};

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Strict binary tree: every node has at most a left and a right child.
#[derive(Serialize, Deserialize, Default)]
pub struct Tree {
    pub map: NodeMap,
}

impl Tree {
    pub fn new() -> Self { Tree { map: NodeMap::new() } }

    /// Allocates a fresh node. The node starts out unattached; link it
    /// with [`NodeId::attach`] or keep it as a root via [`OwnedNode`].
    pub fn mk_node(&mut self) -> NodeId { self.map.map.insert(Node::default()) }
}

/// Map that holds the structure of the tree.
///
/// Multiple roots can live in one map; this is what lets a subtree be
/// detached and re-linked elsewhere without copying.
#[derive(Serialize, Deserialize, Default)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

/// Which child slot of a parent a node occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    pub fn opposite(self) -> Slot {
        match self {
            Slot::Left => Slot::Right,
            Slot::Right => Slot::Left,
        }
    }
}

#[derive(Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct Node {
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl NodeId {
    #[track_caller]
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    #[track_caller]
    pub fn left(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.left)
    }

    #[track_caller]
    pub fn right(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.right)
    }

    #[track_caller]
    pub fn child(self, map: &NodeMap, slot: Slot) -> Option<NodeId> {
        match slot {
            Slot::Left => self.left(map),
            Slot::Right => self.right(map),
        }
    }

    /// The slot this node occupies in its parent, or `None` for roots.
    #[track_caller]
    pub fn slot_in_parent(self, map: &NodeMap) -> Option<Slot> {
        let parent = self.parent(map)?;
        if parent.left(map) == Some(self) {
            Some(Slot::Left)
        } else if parent.right(map) == Some(self) {
            Some(Slot::Right)
        } else {
            None
        }
    }

    /// The other child of this node's parent.
    #[track_caller]
    pub fn sibling(self, map: &NodeMap) -> Option<NodeId> {
        let slot = self.slot_in_parent(map)?;
        self.parent(map)?.child(map, slot.opposite())
    }

    #[track_caller]
    pub fn is_leaf(self, map: &NodeMap) -> bool {
        map.map
            .get(self)
            .map(|n| n.left.is_none() && n.right.is_none())
            .unwrap_or(true)
    }

    #[track_caller]
    pub fn is_root(self, map: &NodeMap) -> bool { self.parent(map).is_none() }

    /// Returns an iterator over all ancestors of the current node,
    /// including itself.
    #[track_caller]
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| map.map.get(n).and_then(|nd| nd.parent));
            node
        })
    }

    #[track_caller]
    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal::new(map, self)
    }

    #[track_caller]
    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PostorderTraversal::new(map, self)
    }

    /// Links this node under `parent` at the given slot. No-op if the
    /// slot is occupied or the node is already linked somewhere.
    #[track_caller]
    pub fn attach(self, map: &mut NodeMap, parent: NodeId, slot: Slot) {
        if self == parent {
            return;
        }
        if !map.contains(self) || !map.contains(parent) {
            return;
        }
        debug_assert!(
            map[self].parent.is_none(),
            "attach called on a node that already has a parent"
        );
        if map[self].parent.is_some() {
            return;
        }

        let target = match slot {
            Slot::Left => &mut map.map[parent].left,
            Slot::Right => &mut map.map[parent].right,
        };
        debug_assert!(target.is_none(), "attach into an occupied child slot");
        if target.is_some() {
            return;
        }
        *target = Some(self);
        map.map[self].parent = Some(parent);
    }

    /// Unlinks this node from its parent, leaving it as a detached root.
    #[track_caller]
    pub fn detach(self, map: &mut NodeMap) {
        let Some(parent) = self.parent(map) else {
            return;
        };
        if let Some(parent_node) = map.map.get_mut(parent) {
            if parent_node.left == Some(self) {
                parent_node.left = None;
            }
            if parent_node.right == Some(self) {
                parent_node.right = None;
            }
        }
        if let Some(node) = map.map.get_mut(self) {
            node.parent = None;
        }
    }

    /// Frees this node and every descendant, children first. The node is
    /// detached from its parent beforehand, so the rest of the tree is
    /// untouched.
    #[track_caller]
    pub fn remove_subtree(self, tree: &mut Tree) {
        self.detach(&mut tree.map);
        if let Some(node) = tree.map.map.remove(self) {
            node.delete_recursive(tree);
        }
    }

    #[track_caller]
    pub fn remove_root(self, tree: &mut Tree) {
        assert!(
            self.parent(&tree.map).is_none(),
            "remove_root called on non-root node"
        );
        if let Some(node) = tree.map.map.remove(self) {
            node.delete_recursive(tree);
        }
    }
}

impl Node {
    fn delete_recursive(&self, tree: &mut Tree) {
        for child in [self.left, self.right].into_iter().flatten() {
            if let Some(node) = tree.map.map.remove(child) {
                node.delete_recursive(tree);
            }
        }
    }
}

/// Represents ownership of a root node in a tree.
///
/// Roots must be removed manually, because removal requires a reference
/// to the [`Tree`]. If a value of this type is dropped without
/// [`OwnedNode::remove`] being called, it will panic in debug builds.
///
/// Every `OwnedNode` has a name which will be used in the panic message.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnedNode(Option<NodeId>, String);

impl OwnedNode {
    /// Creates a new root node.
    pub fn new_root_in(tree: &mut Tree, name: &'static str) -> Self {
        let node = tree.mk_node();
        Self::own(node, name)
    }

    /// Marks an existing detached node as an owned root.
    pub fn own(node: NodeId, name: &'static str) -> Self { OwnedNode(Some(node), name.to_owned()) }

    pub fn id(&self) -> NodeId { self.0.expect("OwnedNode::id called on removed OwnedNode") }

    /// Swaps in a different root, returning the previous one. Used when
    /// the head of a degenerate tree is spliced out.
    #[track_caller]
    pub fn replace(&mut self, new: NodeId) -> NodeId {
        self.0.replace(new).expect("can't replace removed node")
    }

    #[track_caller]
    pub fn remove(&mut self, tree: &mut Tree) {
        if let Some(id) = self.0.take() {
            id.remove_subtree(tree);
        }
    }
}

impl Deref for OwnedNode {
    type Target = NodeId;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref().expect("OwnedNode deref on removed OwnedNode")
    }
}

impl DerefMut for OwnedNode {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut().expect("OwnedNode deref_mut on removed OwnedNode")
    }
}

impl Drop for OwnedNode {
    fn drop(&mut self) {
        if cfg!(debug_assertions) {
            if let Some(node) = self.0 {
                panic!(
                    "OwnedNode {name:?} dropped without OwnedNode::remove being called: {node:?}",
                    name = self.1,
                );
            }
        }
    }
}

struct PreorderTraversal<'a> {
    stack: Vec<NodeId>,
    map: &'a NodeMap,
}

impl<'a> PreorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        Self { stack: vec![root], map }
    }
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Right first so the left subtree is yielded before it.
        if let Some(right) = node.right(self.map) {
            self.stack.push(right);
        }
        if let Some(left) = node.left(self.map) {
            self.stack.push(left);
        }
        Some(node)
    }
}

struct PostorderTraversal<'a> {
    cur: Option<NodeId>,
    top: NodeId,
    map: &'a NodeMap,
}

impl<'a> PostorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        Self {
            top: root,
            cur: Some(Self::descend(root, map)),
            map,
        }
    }

    fn descend(mut node: NodeId, map: &'a NodeMap) -> NodeId {
        loop {
            if let Some(left) = node.left(map) {
                node = left;
            } else if let Some(right) = node.right(map) {
                node = right;
            } else {
                return node;
            }
        }
    }
}

impl<'a> Iterator for PostorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        self.cur = None;
        if node != self.top {
            if let Some(parent) = node.parent(self.map) {
                match (node.slot_in_parent(self.map), parent.right(self.map)) {
                    (Some(Slot::Left), Some(right)) => {
                        self.cur = Some(Self::descend(right, self.map));
                    }
                    _ => self.cur = Some(parent),
                }
            }
        }
        Some(node)
    }
}
