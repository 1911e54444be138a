//! The window tree: window payloads and containers layered over the
//! structural arena, plus every mutation the engine performs on them.

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::{debug, error, warn};

use crate::common::collections::{HashMap, VecDeque};
use crate::common::config::{InnerGaps, LayoutSettings, SplitPreference};
use crate::layout_engine::container::{Container, ContainerKind, SplitMode, optimal_split_mode};
use crate::layout_engine::geometry::{Point, Rect, SameAs};
use crate::layout_engine::window::WindowId;
use crate::model::tree::{NodeId, OwnedNode, Slot, Tree};

/// Shape discipline of a tree. A monocle tree is the same arena kept
/// degenerate: a chain of right links where every node holds a window
/// and covers the whole boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    Bsp,
    Monocle,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    NotFound,
    Removed,
    /// The last window left the tree; the caller should drop it.
    TreeEmptied,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct NodeData {
    window: Option<WindowId>,
    container: Container,
    fills_parent: bool,
    fills_root: bool,
}

#[derive(Serialize, Deserialize)]
pub struct BspTree {
    tree: Tree,
    root: OwnedNode,
    data: SecondaryMap<NodeId, NodeData>,
    window_to_node: HashMap<WindowId, NodeId>,
    kind: TreeKind,
}

impl Drop for BspTree {
    fn drop(&mut self) { self.root.remove(&mut self.tree); }
}

fn split_kinds(split: SplitMode) -> (ContainerKind, ContainerKind) {
    match split {
        SplitMode::Horizontal => (ContainerKind::Upper, ContainerKind::Lower),
        // Unset is repaired before this is reached.
        SplitMode::Vertical | SplitMode::Unset => (ContainerKind::Left, ContainerKind::Right),
    }
}

impl BspTree {
    pub fn new(kind: TreeKind, boundary: Rect, settings: &LayoutSettings) -> BspTree {
        let mut tree = Tree::new();
        let root = OwnedNode::new_root_in(&mut tree, "layout");
        let mut data = SecondaryMap::new();
        data.insert(
            root.id(),
            NodeData {
                window: None,
                container: Container::root(boundary, settings.split_ratio),
                fills_parent: false,
                fills_root: false,
            },
        );
        BspTree {
            tree,
            root,
            data,
            window_to_node: HashMap::default(),
            kind,
        }
    }

    /// Builds a tree for an existing window list, inserting one window
    /// at a time the same way incremental updates do.
    pub fn build(
        kind: TreeKind,
        boundary: Rect,
        settings: &LayoutSettings,
        windows: &[WindowId],
    ) -> BspTree {
        let mut tree = BspTree::new(kind, boundary, settings);
        for &window in windows {
            tree.insert_window(window, None, settings);
        }
        tree.apply_container(boundary, &settings.gaps.inner, settings.split_ratio);
        tree
    }

    pub fn kind(&self) -> TreeKind { self.kind }

    pub fn root_id(&self) -> NodeId { self.root.id() }

    pub fn boundary(&self) -> Rect { self.data[self.root.id()].container.rect }

    pub fn is_empty(&self) -> bool { self.window_to_node.is_empty() }

    pub fn window_count(&self) -> usize { self.window_to_node.len() }

    /// All windows in left-to-right leaf order.
    pub fn windows(&self) -> Vec<WindowId> {
        self.root
            .id()
            .traverse_preorder(&self.tree.map)
            .filter_map(|node| self.data.get(node).and_then(|d| d.window))
            .collect()
    }

    pub fn contains_window(&self, window: WindowId) -> bool {
        self.window_to_node.contains_key(&window)
    }

    pub fn node_for_window(&self, window: WindowId) -> Option<NodeId> {
        self.window_to_node.get(&window).copied()
    }

    pub fn window_at(&self, node: NodeId) -> Option<WindowId> {
        self.data.get(node).and_then(|d| d.window)
    }

    pub fn container_of(&self, node: NodeId) -> Option<Container> {
        self.data.get(node).map(|d| d.container)
    }

    /// Leaf nodes in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.root
            .id()
            .traverse_preorder(&self.tree.map)
            .filter(|node| node.is_leaf(&self.tree.map))
            .collect()
    }

    /// The on-screen rectangle a node's window should occupy, honoring
    /// the fill toggles.
    pub fn effective_rect(&self, node: NodeId) -> Option<Rect> {
        let d = self.data.get(node)?;
        if d.fills_root {
            return Some(self.data[self.root.id()].container.rect);
        }
        if d.fills_parent {
            if let Some(parent) = node.parent(&self.tree.map) {
                return Some(self.data[parent].container.rect);
            }
        }
        Some(d.container.rect)
    }

    /// Every window paired with the rectangle it should be resized to,
    /// in left-to-right leaf order.
    pub fn placements(&self) -> Vec<(WindowId, Rect)> {
        self.root
            .id()
            .traverse_preorder(&self.tree.map)
            .filter_map(|node| {
                let window = self.data.get(node)?.window?;
                Some((window, self.effective_rect(node)?))
            })
            .collect()
    }

    /// First window whose container covers the point.
    pub fn window_at_point(&self, point: Point) -> Option<WindowId> {
        self.root.id().traverse_preorder(&self.tree.map).find_map(|node| {
            let d = self.data.get(node)?;
            let window = d.window?;
            d.container.contains_point(point).then_some(window)
        })
    }

    // ---- leaf traversal ----

    pub fn first_leaf(&self, from: NodeId) -> NodeId {
        match self.kind {
            // The chain head is the first entry.
            TreeKind::Monocle => from,
            TreeKind::Bsp => {
                let mut node = from;
                loop {
                    if let Some(left) = node.left(&self.tree.map) {
                        node = left;
                    } else if let Some(right) = node.right(&self.tree.map) {
                        node = right;
                    } else {
                        return node;
                    }
                }
            }
        }
    }

    pub fn last_leaf(&self, from: NodeId) -> NodeId {
        let mut node = from;
        loop {
            if let Some(right) = node.right(&self.tree.map) {
                node = right;
            } else if self.kind == TreeKind::Bsp {
                if let Some(left) = node.left(&self.tree.map) {
                    node = left;
                    continue;
                }
                return node;
            } else {
                return node;
            }
        }
    }

    /// In-order successor among leaves; `None` when `node` is already
    /// the rightmost.
    pub fn next_leaf(&self, node: NodeId) -> Option<NodeId> {
        match self.kind {
            TreeKind::Monocle => node.right(&self.tree.map),
            TreeKind::Bsp => {
                let mut current = node;
                loop {
                    let parent = current.parent(&self.tree.map)?;
                    if current.slot_in_parent(&self.tree.map) == Some(Slot::Left) {
                        let sibling = parent.right(&self.tree.map)?;
                        return Some(self.first_leaf(sibling));
                    }
                    current = parent;
                }
            }
        }
    }

    /// In-order predecessor among leaves; `None` when `node` is already
    /// the leftmost.
    pub fn prev_leaf(&self, node: NodeId) -> Option<NodeId> {
        match self.kind {
            TreeKind::Monocle => node.parent(&self.tree.map),
            TreeKind::Bsp => {
                let mut current = node;
                loop {
                    let parent = current.parent(&self.tree.map)?;
                    if current.slot_in_parent(&self.tree.map) == Some(Slot::Right) {
                        let sibling = parent.left(&self.tree.map)?;
                        return Some(self.last_leaf(sibling));
                    }
                    current = parent;
                }
            }
        }
    }

    /// Level-order search for the first leaf the predicate accepts.
    pub fn first_leaf_where(
        &self,
        pred: impl Fn(NodeId, Option<WindowId>) -> bool,
    ) -> Option<NodeId> {
        let mut queue = VecDeque::new();
        queue.push_back(self.root.id());
        while let Some(node) = queue.pop_front() {
            if node.is_leaf(&self.tree.map) {
                let window = self.data.get(node).and_then(|d| d.window);
                if pred(node, window) {
                    return Some(node);
                }
            } else {
                queue.extend(node.left(&self.tree.map));
                queue.extend(node.right(&self.tree.map));
            }
        }
        None
    }

    /// First leaf whose window was removed but whose slot has not been
    /// reclaimed yet.
    pub fn first_pseudo_leaf(&self) -> Option<NodeId> {
        self.first_leaf_where(|_, window| window.is_none())
    }

    /// Shallowest leaf, the balanced insertion fallback.
    pub fn first_open_leaf(&self) -> Option<NodeId> { self.first_leaf_where(|_, _| true) }

    // ---- structural mutation ----

    /// Inserts a window, pairing it into `target` when given, otherwise
    /// into the first pseudo-leaf, otherwise into the shallowest leaf.
    /// Returns the node now holding the window.
    pub fn insert_window(
        &mut self,
        window: WindowId,
        target: Option<NodeId>,
        settings: &LayoutSettings,
    ) -> Option<NodeId> {
        if let Some(existing) = self.node_for_window(window) {
            warn!(%window, "insert of a window already in the tree");
            return Some(existing);
        }
        match self.kind {
            TreeKind::Monocle => Some(self.append_monocle(window)),
            TreeKind::Bsp => {
                let root = self.root.id();
                if self.window_to_node.is_empty() && root.is_leaf(&self.tree.map) {
                    self.set_window_at(root, Some(window));
                    return Some(root);
                }
                let target = target
                    .filter(|t| self.tree.map.contains(*t) && t.is_leaf(&self.tree.map))
                    .or_else(|| self.first_pseudo_leaf())
                    .or_else(|| self.first_open_leaf())?;
                if self.data[target].window.is_none() {
                    self.set_window_at(target, Some(window));
                    return Some(target);
                }
                let split = self.pairing_split_mode(target, settings);
                self.pair_at(target, window, split, settings)
            }
        }
    }

    fn pairing_split_mode(&self, target: NodeId, settings: &LayoutSettings) -> SplitMode {
        match settings.split_preference {
            SplitPreference::Vertical => SplitMode::Vertical,
            SplitPreference::Horizontal => SplitMode::Horizontal,
            SplitPreference::Optimal => optimal_split_mode(&self.data[target].container.rect),
        }
    }

    /// Converts the `target` leaf into an internal node whose children
    /// are the previous occupant and `window`. The `spawn_left` setting
    /// decides which of the two becomes the left/upper child.
    pub fn pair_at(
        &mut self,
        target: NodeId,
        window: WindowId,
        split: SplitMode,
        settings: &LayoutSettings,
    ) -> Option<NodeId> {
        if split == SplitMode::Unset {
            debug_assert!(false, "pairing requires a vertical or horizontal split");
            error!("cannot pair a leaf with an unset split mode");
            return None;
        }
        if !target.is_leaf(&self.tree.map) {
            debug_assert!(false, "pairing target must be a leaf");
            error!("cannot pair into an internal node");
            return None;
        }

        let existing = self.data[target].window;
        if let Some(w) = existing {
            self.window_to_node.remove(&w);
        }
        {
            // The leaf becomes an internal node; fill state does not
            // survive restructuring.
            let d = &mut self.data[target];
            d.window = None;
            d.fills_parent = false;
            d.fills_root = false;
            d.container.split_mode = split;
            d.container.ratio = settings.split_ratio;
        }

        let mut parent_c = self.data[target].container;
        let (left_kind, right_kind) = split_kinds(split);
        let left_c =
            Container::split(&settings.gaps.inner, &mut parent_c, left_kind, settings.split_ratio);
        let right_c =
            Container::split(&settings.gaps.inner, &mut parent_c, right_kind, settings.split_ratio);
        self.data[target].container = parent_c;

        let (left_window, right_window) = if settings.spawn_left {
            (Some(window), existing)
        } else {
            (existing, Some(window))
        };

        let left = self.make_node(left_window, left_c);
        let right = self.make_node(right_window, right_c);
        left.attach(&mut self.tree.map, target, Slot::Left);
        right.attach(&mut self.tree.map, target, Slot::Right);

        Some(if settings.spawn_left { left } else { right })
    }

    fn append_monocle(&mut self, window: WindowId) -> NodeId {
        let root = self.root.id();
        if self.window_to_node.is_empty() && self.data[root].window.is_none() {
            self.set_window_at(root, Some(window));
            return root;
        }
        let tail = self.last_leaf(root);
        let container = Container {
            rect: self.boundary(),
            ..self.data[root].container
        };
        let node = self.make_node(Some(window), container);
        node.attach(&mut self.tree.map, tail, Slot::Right);
        node
    }

    pub fn remove_window(&mut self, window: WindowId) -> RemoveOutcome {
        let Some(node) = self.window_to_node.get(&window).copied() else {
            return RemoveOutcome::NotFound;
        };
        self.window_to_node.remove(&window);
        match self.kind {
            TreeKind::Monocle => self.remove_monocle(node),
            TreeKind::Bsp => self.remove_bsp(node),
        }
    }

    fn remove_bsp(&mut self, node: NodeId) -> RemoveOutcome {
        let root = self.root.id();
        if node == root {
            self.data[root].window = None;
            return RemoveOutcome::TreeEmptied;
        }

        let (Some(parent), Some(sibling)) =
            (node.parent(&self.tree.map), node.sibling(&self.tree.map))
        else {
            debug_assert!(false, "non-root leaf without parent and sibling");
            return RemoveOutcome::Removed;
        };

        // The sibling subtree takes over the parent's position: the
        // parent adopts the sibling's payload and children, keeping its
        // own rectangle and kind.
        let sib_data = self.data[sibling].clone();
        {
            let parent_d = &mut self.data[parent];
            parent_d.window = sib_data.window;
            parent_d.fills_parent = sib_data.fills_parent;
            parent_d.fills_root = sib_data.fills_root;
            parent_d.container.split_mode = sib_data.container.split_mode;
            parent_d.container.ratio = sib_data.container.ratio;
        }
        if let Some(w) = sib_data.window {
            self.window_to_node.insert(w, parent);
        }

        let sib_left = sibling.left(&self.tree.map);
        let sib_right = sibling.right(&self.tree.map);

        node.remove_subtree(&mut self.tree);
        self.data.remove(node);
        if let Some(l) = sib_left {
            l.detach(&mut self.tree.map);
        }
        if let Some(r) = sib_right {
            r.detach(&mut self.tree.map);
        }
        sibling.remove_subtree(&mut self.tree);
        self.data.remove(sibling);
        if let Some(l) = sib_left {
            l.attach(&mut self.tree.map, parent, Slot::Left);
        }
        if let Some(r) = sib_right {
            r.attach(&mut self.tree.map, parent, Slot::Right);
        }

        RemoveOutcome::Removed
    }

    fn remove_monocle(&mut self, node: NodeId) -> RemoveOutcome {
        let next = node.right(&self.tree.map);
        let root = self.root.id();
        if node == root {
            match next {
                Some(next) => {
                    next.detach(&mut self.tree.map);
                    let old = self.root.replace(next);
                    old.remove_subtree(&mut self.tree);
                    self.data.remove(old);
                    RemoveOutcome::Removed
                }
                None => {
                    self.data[root].window = None;
                    RemoveOutcome::TreeEmptied
                }
            }
        } else {
            let prev = node.parent(&self.tree.map);
            if let Some(next) = next {
                next.detach(&mut self.tree.map);
            }
            node.remove_subtree(&mut self.tree);
            self.data.remove(node);
            if let (Some(prev), Some(next)) = (prev, next) {
                next.attach(&mut self.tree.map, prev, Slot::Right);
            }
            RemoveOutcome::Removed
        }
    }

    /// Exchanges the window payloads of two leaves in place; containers
    /// are untouched.
    pub fn swap_windows(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(node_a), Some(node_b)) = (self.node_for_window(a), self.node_for_window(b))
        else {
            return false;
        };
        if node_a == node_b {
            return false;
        }
        self.data[node_a].window = Some(b);
        self.data[node_b].window = Some(a);
        self.window_to_node.insert(a, node_b);
        self.window_to_node.insert(b, node_a);
        true
    }

    /// Toggles "fill the parent's rectangle" for a window's leaf.
    /// Returns whether the on-screen rectangle changed, i.e. whether a
    /// border redraw is warranted; `None` when the window is unknown.
    pub fn toggle_fills_parent(&mut self, window: WindowId) -> Option<bool> {
        let node = self.node_for_window(window)?;
        let before = self.effective_rect(node)?;
        let d = self.data.get_mut(node)?;
        d.fills_parent = !d.fills_parent;
        let after = self.effective_rect(node)?;
        Some(!before.same_as(after))
    }

    /// Toggles "fill the root's rectangle" for a window's leaf.
    pub fn toggle_fills_root(&mut self, window: WindowId) -> Option<bool> {
        let node = self.node_for_window(window)?;
        let before = self.effective_rect(node)?;
        let d = self.data.get_mut(node)?;
        d.fills_root = !d.fills_root;
        let after = self.effective_rect(node)?;
        Some(!before.same_as(after))
    }

    // ---- ratio and split-axis changes ----

    pub fn set_ratio_for(
        &mut self,
        window: WindowId,
        ratio: f64,
        gaps: &InnerGaps,
        default_ratio: f64,
    ) -> bool {
        self.change_split_of_parent(window, gaps, default_ratio, |c| c.set_ratio(ratio))
    }

    pub fn adjust_ratio_for(
        &mut self,
        window: WindowId,
        delta: f64,
        gaps: &InnerGaps,
        default_ratio: f64,
    ) -> bool {
        self.change_split_of_parent(window, gaps, default_ratio, |c| c.adjust_ratio(delta))
    }

    pub fn toggle_split_for(
        &mut self,
        window: WindowId,
        gaps: &InnerGaps,
        default_ratio: f64,
    ) -> bool {
        self.change_split_of_parent(window, gaps, default_ratio, |c| c.toggle_split_mode())
    }

    /// Applies `change` to the container of the nearest ancestor split
    /// of `window`'s leaf, then re-derives that subtree's geometry.
    /// Reports whether anything changed.
    fn change_split_of_parent(
        &mut self,
        window: WindowId,
        gaps: &InnerGaps,
        default_ratio: f64,
        change: impl FnOnce(&mut Container),
    ) -> bool {
        if self.kind == TreeKind::Monocle {
            debug!("monocle layouts have no split to modify");
            return false;
        }
        let Some(node) = self.node_for_window(window) else {
            return false;
        };
        let Some(parent) = node.parent(&self.tree.map) else {
            return false;
        };
        let before = self.data[parent].container;
        change(&mut self.data[parent].container);
        if self.data[parent].container == before {
            return false;
        }
        self.resize_subtree(parent, gaps, default_ratio);
        true
    }

    // ---- geometry propagation ----

    /// Recomputes every container from the root boundary down. The tree
    /// structure plus the stored ratios and the boundary fully determine
    /// the result.
    pub fn apply_container(&mut self, boundary: Rect, gaps: &InnerGaps, default_ratio: f64) {
        let root = self.root.id();
        self.data[root].container.rect = boundary;
        match self.kind {
            TreeKind::Monocle => {
                let nodes: Vec<NodeId> = root.traverse_preorder(&self.tree.map).collect();
                for node in nodes {
                    if let Some(d) = self.data.get_mut(node) {
                        d.container.rect = boundary;
                    }
                }
            }
            TreeKind::Bsp => self.resize_subtree(root, gaps, default_ratio),
        }
    }

    fn resize_subtree(&mut self, node: NodeId, gaps: &InnerGaps, default_ratio: f64) {
        let (Some(left), Some(right)) = (node.left(&self.tree.map), node.right(&self.tree.map))
        else {
            return;
        };

        let mut parent_c = self.data[node].container;
        if parent_c.split_mode == SplitMode::Unset {
            debug_assert!(false, "internal node without a split axis");
            parent_c.split_mode = optimal_split_mode(&parent_c.rect);
        }
        let (left_kind, right_kind) = split_kinds(parent_c.split_mode);
        let left_c = Container::split(gaps, &mut parent_c, left_kind, default_ratio);
        let right_c = Container::split(gaps, &mut parent_c, right_kind, default_ratio);
        self.data[node].container = parent_c;

        for (child, fresh) in [(left, left_c), (right, right_c)] {
            let is_internal = !child.is_leaf(&self.tree.map);
            if let Some(d) = self.data.get_mut(child) {
                d.container.rect = fresh.rect;
                d.container.kind = fresh.kind;
                if !is_internal {
                    // A leaf's split mode is only the preferred axis for
                    // a future pairing; track the new aspect ratio.
                    d.container.split_mode = fresh.split_mode;
                }
            }
        }

        self.resize_subtree(left, gaps, default_ratio);
        self.resize_subtree(right, gaps, default_ratio);
    }

    // ---- diagnostics ----

    pub fn draw_tree(&self) -> String {
        fn build(t: &BspTree, node: NodeId) -> ascii_tree::Tree {
            let d = &t.data[node];
            let children: Vec<ascii_tree::Tree> = [node.left(&t.tree.map), node.right(&t.tree.map)]
                .into_iter()
                .flatten()
                .map(|child| build(t, child))
                .collect();
            let label = match d.window {
                Some(window) => format!("{window}"),
                None if children.is_empty() => "empty".to_string(),
                None => format!("{} {:.2}", d.container.split_mode, d.container.ratio),
            };
            if children.is_empty() {
                ascii_tree::Tree::Leaf(vec![label])
            } else {
                ascii_tree::Tree::Node(label, children)
            }
        }
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &build(self, self.root.id()));
        out
    }

    // ---- plumbing shared with the loader ----

    pub(crate) fn set_window_at(&mut self, node: NodeId, window: Option<WindowId>) {
        if let Some(d) = self.data.get_mut(node) {
            if let Some(old) = d.window.take() {
                self.window_to_node.remove(&old);
            }
            d.window = window;
            if let Some(w) = window {
                self.window_to_node.insert(w, node);
            }
        }
    }

    /// Splits an empty leaf into two pseudo-leaves, used when a saved
    /// shape is rebuilt before windows are assigned.
    pub(crate) fn split_leaf_bare(
        &mut self,
        target: NodeId,
        split: SplitMode,
        ratio: f64,
        gaps: &InnerGaps,
        default_ratio: f64,
    ) -> Option<(NodeId, NodeId)> {
        if split == SplitMode::Unset || !target.is_leaf(&self.tree.map) {
            debug_assert!(false, "bare split needs an axis and a leaf target");
            return None;
        }
        {
            let d = &mut self.data[target];
            d.container.split_mode = split;
            d.container.ratio = if crate::layout_engine::container::is_valid_ratio(ratio) {
                ratio
            } else {
                warn!(ratio, "saved split ratio outside (0, 1), using default");
                default_ratio
            };
        }
        let mut parent_c = self.data[target].container;
        let (left_kind, right_kind) = split_kinds(split);
        let left_c = Container::split(gaps, &mut parent_c, left_kind, default_ratio);
        let right_c = Container::split(gaps, &mut parent_c, right_kind, default_ratio);
        self.data[target].container = parent_c;

        let left = self.make_node(None, left_c);
        let right = self.make_node(None, right_c);
        left.attach(&mut self.tree.map, target, Slot::Left);
        right.attach(&mut self.tree.map, target, Slot::Right);
        Some((left, right))
    }

    pub(crate) fn split_params(&self, node: NodeId) -> Option<(SplitMode, f64)> {
        if node.is_leaf(&self.tree.map) {
            return None;
        }
        let d = self.data.get(node)?;
        Some((d.container.split_mode, d.container.ratio))
    }

    pub(crate) fn children(&self, node: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        (node.left(&self.tree.map), node.right(&self.tree.map))
    }

    fn make_node(&mut self, window: Option<WindowId>, container: Container) -> NodeId {
        let id = self.tree.mk_node();
        self.data.insert(
            id,
            NodeData {
                window,
                container,
                fills_parent: false,
                fills_root: false,
            },
        );
        if let Some(w) = window {
            self.window_to_node.insert(w, id);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn w(idx: u32) -> WindowId { WindowId::new(idx) }

    fn settings() -> LayoutSettings { LayoutSettings::default() }

    fn boundary() -> Rect { Rect::new(0.0, 0.0, 1920.0, 1080.0) }

    fn bsp(windows: &[u32]) -> BspTree {
        let windows: Vec<WindowId> = windows.iter().copied().map(w).collect();
        BspTree::build(TreeKind::Bsp, boundary(), &settings(), &windows)
    }

    fn monocle(windows: &[u32]) -> BspTree {
        let windows: Vec<WindowId> = windows.iter().copied().map(w).collect();
        BspTree::build(TreeKind::Monocle, boundary(), &settings(), &windows)
    }

    fn apply(tree: &mut BspTree) {
        let s = settings();
        tree.apply_container(boundary(), &s.gaps.inner, s.split_ratio);
    }

    #[test]
    fn single_window_occupies_the_root() {
        let tree = bsp(&[1]);
        assert_eq!(tree.windows(), vec![w(1)]);
        assert_eq!(tree.placements(), vec![(w(1), boundary())]);
    }

    #[test]
    fn second_window_splits_the_root_vertically() {
        // 1920x1080 is wide, so the optimal split is side-by-side.
        let tree = bsp(&[1, 2]);
        assert_eq!(
            tree.placements(),
            vec![
                (w(1), Rect::new(0.0, 0.0, 960.0, 1080.0)),
                (w(2), Rect::new(960.0, 0.0, 960.0, 1080.0)),
            ]
        );
    }

    #[test]
    fn spawn_left_swaps_the_children() {
        let mut s = settings();
        s.spawn_left = true;
        let tree = BspTree::build(TreeKind::Bsp, boundary(), &s, &[w(1), w(2)]);
        assert_eq!(tree.windows(), vec![w(2), w(1)]);
    }

    #[test]
    fn pairing_with_unset_split_is_refused() {
        let mut tree = bsp(&[1]);
        let target = tree.node_for_window(w(1)).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.pair_at(target, w(2), SplitMode::Unset, &settings())
        }));
        if cfg!(debug_assertions) {
            assert!(result.is_err());
        } else {
            assert_eq!(result.unwrap(), None);
        }
        assert!(tree.contains_window(w(1)));
        assert!(!tree.contains_window(w(2)));
    }

    #[test]
    fn remove_collapses_to_a_single_leaf() {
        let mut tree = bsp(&[1, 2]);
        assert_eq!(tree.remove_window(w(1)), RemoveOutcome::Removed);
        apply(&mut tree);
        assert_eq!(tree.placements(), vec![(w(2), boundary())]);
    }

    #[test]
    fn remove_last_window_empties_the_tree() {
        let mut tree = bsp(&[1]);
        assert_eq!(tree.remove_window(w(1)), RemoveOutcome::TreeEmptied);
        assert!(tree.is_empty());
        assert_eq!(tree.remove_window(w(1)), RemoveOutcome::NotFound);
    }

    #[test]
    fn remove_splices_an_internal_sibling_up() {
        let mut tree = bsp(&[1, 2, 3]);
        // 3 paired into the shallowest leaf holding 1, stacking below it.
        assert_eq!(tree.windows(), vec![w(1), w(3), w(2)]);

        assert_eq!(tree.remove_window(w(3)), RemoveOutcome::Removed);
        apply(&mut tree);
        assert_eq!(
            tree.placements(),
            vec![
                (w(1), Rect::new(0.0, 0.0, 960.0, 1080.0)),
                (w(2), Rect::new(960.0, 0.0, 960.0, 1080.0)),
            ]
        );
    }

    #[test]
    fn insert_then_remove_is_an_inverse() {
        let mut tree = bsp(&[1, 2, 3]);
        let before: Vec<(WindowId, Rect)> = tree.placements();

        tree.insert_window(w(9), None, &settings());
        apply(&mut tree);
        assert_eq!(tree.window_count(), 4);

        tree.remove_window(w(9));
        apply(&mut tree);
        assert_eq!(tree.placements(), before);
    }

    #[test]
    fn swap_exchanges_payloads_only() {
        let mut tree = bsp(&[1, 2]);
        let rect_of = |t: &BspTree, wid| {
            t.placements().into_iter().find(|(pw, _)| *pw == wid).unwrap().1
        };
        let left_rect = rect_of(&tree, w(1));

        assert!(tree.swap_windows(w(1), w(2)));
        assert_eq!(rect_of(&tree, w(2)), left_rect);

        assert!(tree.swap_windows(w(1), w(2)));
        assert_eq!(rect_of(&tree, w(1)), left_rect);

        assert!(!tree.swap_windows(w(1), w(7)));
    }

    #[test]
    fn neighbor_search_is_symmetric() {
        let tree = bsp(&[1, 2, 3, 4]);
        for &wid in &[1u32, 2, 3, 4] {
            let node = tree.node_for_window(w(wid)).unwrap();
            if let Some(right) = tree.next_leaf(node) {
                assert_eq!(tree.prev_leaf(right), Some(node));
            }
            if let Some(left) = tree.prev_leaf(node) {
                assert_eq!(tree.next_leaf(left), Some(node));
            }
        }

        let order = tree.windows();
        let first = tree.node_for_window(order[0]).unwrap();
        let last = tree.node_for_window(*order.last().unwrap()).unwrap();
        assert_eq!(tree.prev_leaf(first), None);
        assert_eq!(tree.next_leaf(last), None);
    }

    #[test]
    fn next_leaf_walks_left_to_right() {
        let tree = bsp(&[1, 2, 3]);
        let order = tree.windows();
        let mut node = tree.node_for_window(order[0]).unwrap();
        let mut seen = vec![tree.window_at(node).unwrap()];
        while let Some(next) = tree.next_leaf(node) {
            seen.push(tree.window_at(next).unwrap());
            node = next;
        }
        assert_eq!(seen, order);
    }

    #[test]
    fn partition_covers_the_boundary_without_overlap() {
        let mut tree = bsp(&[1, 2, 3, 4, 5]);
        apply(&mut tree);

        let placements = tree.placements();
        let total: f64 = placements.iter().map(|(_, r)| r.area()).sum();
        assert!((total - boundary().area()).abs() < 1e-6);

        for (i, (_, a)) in placements.iter().enumerate() {
            assert!(boundary().intersection(a).area() >= a.area() - 1e-6);
            for (_, b) in placements.iter().skip(i + 1) {
                assert_eq!(a.intersection(b).area(), 0.0);
            }
        }
    }

    #[test]
    fn gaps_leave_space_between_containers() {
        let mut s = settings();
        s.gaps.inner = InnerGaps { horizontal: 10.0, vertical: 10.0 };
        let mut tree = BspTree::build(TreeKind::Bsp, boundary(), &s, &[w(1), w(2)]);
        tree.apply_container(boundary(), &s.gaps.inner, s.split_ratio);

        assert_eq!(
            tree.placements(),
            vec![
                (w(1), Rect::new(0.0, 0.0, 955.0, 1080.0)),
                (w(2), Rect::new(965.0, 0.0, 955.0, 1080.0)),
            ]
        );
    }

    #[test]
    fn adjust_ratio_moves_the_split() {
        let mut tree = bsp(&[1, 2]);
        let s = settings();
        assert!(tree.adjust_ratio_for(w(1), 0.25, &s.gaps.inner, s.split_ratio));
        assert_eq!(
            tree.placements(),
            vec![
                (w(1), Rect::new(0.0, 0.0, 1440.0, 1080.0)),
                (w(2), Rect::new(1440.0, 0.0, 480.0, 1080.0)),
            ]
        );

        // Pushing past the open interval keeps the stored ratio.
        assert!(!tree.adjust_ratio_for(w(1), 0.5, &s.gaps.inner, s.split_ratio));
        assert_eq!(tree.placements()[0].1.size.width, 1440.0);
    }

    #[test]
    fn set_ratio_rejects_invalid_values() {
        let mut tree = bsp(&[1, 2]);
        let s = settings();
        assert!(!tree.set_ratio_for(w(1), 1.2, &s.gaps.inner, s.split_ratio));
        assert!(tree.set_ratio_for(w(1), 0.25, &s.gaps.inner, s.split_ratio));
        assert_eq!(tree.placements()[0].1.size.width, 480.0);
    }

    #[test]
    fn toggle_split_swaps_the_axis() {
        let mut tree = bsp(&[1, 2]);
        let s = settings();
        assert!(tree.toggle_split_for(w(1), &s.gaps.inner, s.split_ratio));
        assert_eq!(
            tree.placements(),
            vec![
                (w(1), Rect::new(0.0, 0.0, 1920.0, 540.0)),
                (w(2), Rect::new(0.0, 540.0, 1920.0, 540.0)),
            ]
        );
    }

    #[test]
    fn root_leaf_has_no_split_to_modify() {
        let mut tree = bsp(&[1]);
        let s = settings();
        assert!(!tree.adjust_ratio_for(w(1), 0.1, &s.gaps.inner, s.split_ratio));
        assert!(!tree.toggle_split_for(w(1), &s.gaps.inner, s.split_ratio));
    }

    #[test]
    fn fills_parent_round_trip() {
        let mut tree = bsp(&[1, 2, 3]);
        apply(&mut tree);
        let node = tree.node_for_window(w(2)).unwrap();
        let original = tree.effective_rect(node).unwrap();
        let parent_rect =
            tree.container_of(node.parent(&tree.tree.map).unwrap()).unwrap().rect;

        assert_eq!(tree.toggle_fills_parent(w(2)), Some(true));
        assert_eq!(tree.effective_rect(node), Some(parent_rect));

        assert_eq!(tree.toggle_fills_parent(w(2)), Some(true));
        assert_eq!(tree.effective_rect(node), Some(original));

        assert_eq!(tree.toggle_fills_parent(w(9)), None);
    }

    #[test]
    fn fills_root_covers_the_boundary() {
        let mut tree = bsp(&[1, 2, 3]);
        apply(&mut tree);
        let node = tree.node_for_window(w(3)).unwrap();

        assert_eq!(tree.toggle_fills_root(w(3)), Some(true));
        assert_eq!(tree.effective_rect(node), Some(boundary()));

        // The container derived from the structure is untouched.
        assert_ne!(tree.container_of(node).unwrap().rect, boundary());

        assert_eq!(tree.toggle_fills_root(w(3)), Some(true));
        assert_ne!(tree.effective_rect(node), Some(boundary()));
    }

    #[test]
    fn fills_root_on_the_root_leaf_needs_no_redraw() {
        let mut tree = bsp(&[1]);
        assert_eq!(tree.toggle_fills_root(w(1)), Some(false));
    }

    #[test]
    fn window_at_point_hits_the_covering_leaf() {
        let mut tree = bsp(&[1, 2]);
        apply(&mut tree);
        assert_eq!(tree.window_at_point(Point::new(100.0, 100.0)), Some(w(1)));
        assert_eq!(tree.window_at_point(Point::new(1800.0, 100.0)), Some(w(2)));
        assert_eq!(tree.window_at_point(Point::new(5000.0, 100.0)), None);
    }

    #[test]
    fn monocle_is_a_chain_of_fullscreen_windows() {
        let tree = monocle(&[1, 2, 3]);
        assert_eq!(tree.windows(), vec![w(1), w(2), w(3)]);
        for (_, rect) in tree.placements() {
            assert_eq!(rect, boundary());
        }
    }

    #[test]
    fn monocle_neighbors_follow_the_chain() {
        let tree = monocle(&[1, 2, 3]);
        let n2 = tree.node_for_window(w(2)).unwrap();
        assert_eq!(tree.next_leaf(n2).and_then(|n| tree.window_at(n)), Some(w(3)));
        assert_eq!(tree.prev_leaf(n2).and_then(|n| tree.window_at(n)), Some(w(1)));

        let n1 = tree.node_for_window(w(1)).unwrap();
        let n3 = tree.node_for_window(w(3)).unwrap();
        assert_eq!(tree.prev_leaf(n1), None);
        assert_eq!(tree.next_leaf(n3), None);
    }

    #[test]
    fn monocle_removal_splices_the_chain() {
        let mut tree = monocle(&[1, 2, 3]);

        // middle
        assert_eq!(tree.remove_window(w(2)), RemoveOutcome::Removed);
        assert_eq!(tree.windows(), vec![w(1), w(3)]);

        // head: the chain is re-rooted
        assert_eq!(tree.remove_window(w(1)), RemoveOutcome::Removed);
        assert_eq!(tree.windows(), vec![w(3)]);
        assert_eq!(tree.window_at(tree.root_id()), Some(w(3)));

        assert_eq!(tree.remove_window(w(3)), RemoveOutcome::TreeEmptied);
        assert!(tree.is_empty());
    }

    #[test]
    fn monocle_has_no_split_to_modify() {
        let mut tree = monocle(&[1, 2]);
        let s = settings();
        assert!(!tree.adjust_ratio_for(w(1), 0.1, &s.gaps.inner, s.split_ratio));
        assert!(!tree.toggle_split_for(w(1), &s.gaps.inner, s.split_ratio));
    }

    #[test]
    fn pseudo_leaf_is_reused_before_pairing() {
        let mut tree = bsp(&[1, 2]);
        let s = settings();
        let node = tree.node_for_window(w(2)).unwrap();
        tree.set_window_at(node, None);

        let placed = tree.insert_window(w(5), None, &s).unwrap();
        assert_eq!(placed, node);
        assert_eq!(tree.window_count(), 2);
        assert_eq!(tree.first_pseudo_leaf(), None);
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut tree = bsp(&[1, 2]);
        let existing = tree.node_for_window(w(1)).unwrap();
        assert_eq!(tree.insert_window(w(1), None, &settings()), Some(existing));
        assert_eq!(tree.window_count(), 2);
    }

    #[test]
    fn draw_tree_names_windows_and_splits() {
        let tree = bsp(&[1, 2]);
        let drawn = tree.draw_tree();
        assert!(drawn.contains("window 1"));
        assert!(drawn.contains("window 2"));
        assert!(drawn.contains("vertical"));
    }
}
