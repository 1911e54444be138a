//! Workspace-level policy: which tree a workspace runs, how the window
//! list is diffed into it, and how geometry is pushed back to the OS.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;
use tracing::{debug, trace, warn};

use crate::common::collections::{BTreeSet, HashMap, HashSet};
use crate::common::config::{LayoutSettings, TilingMode};
use crate::layout_engine::bsp::{BspTree, RemoveOutcome, TreeKind};
use crate::layout_engine::geometry::{Point, Rect, SameAs, tiling_area};
use crate::layout_engine::serialize::{self, LayoutScriptError};
use crate::layout_engine::window::{LayoutContext, WindowId, WindowServer, WorkspaceId};
use crate::model::tree::NodeId;

fn tree_kind(mode: TilingMode) -> Option<TreeKind> {
    match mode {
        TilingMode::Bsp => Some(TreeKind::Bsp),
        TilingMode::Monocle => Some(TreeKind::Monocle),
        TilingMode::Floating => None,
    }
}

/// Windows the engine itself has stopped tiling, either because the OS
/// refused to resize them or because a caller floated them explicitly.
/// The external exclusion lists are consulted separately.
#[derive(Serialize, Deserialize, Default, Debug)]
struct FloatingSet {
    windows: BTreeSet<WindowId>,
}

impl FloatingSet {
    fn contains(&self, window: WindowId) -> bool { self.windows.contains(&window) }

    fn insert(&mut self, window: WindowId) { self.windows.insert(window); }

    fn remove(&mut self, window: WindowId) { self.windows.remove(&window); }
}

#[derive(Serialize, Deserialize)]
struct WorkspaceState {
    mode: TilingMode,
    tree: Option<BspTree>,
}

#[derive(Serialize, Deserialize)]
pub struct LayoutEngine {
    workspaces: HashMap<WorkspaceId, WorkspaceState>,
    floating: FloatingSet,
    #[serde(skip)]
    settings: LayoutSettings,
}

/// Insertion point policy: a pseudo-leaf is reclaimed first, then the
/// focused leaf, then the marked leaf (consuming the mark). `None`
/// falls through to balanced insertion in the tree.
fn insertion_target(
    tree: &BspTree,
    ctx: &mut LayoutContext,
    window: WindowId,
) -> Option<NodeId> {
    if let Some(node) = tree.first_pseudo_leaf() {
        return Some(node);
    }
    if let Some(node) = ctx
        .focused_window
        .filter(|focused| *focused != window)
        .and_then(|focused| tree.node_for_window(focused))
    {
        return Some(node);
    }
    if let Some(node) = ctx
        .marked_window
        .filter(|marked| *marked != window)
        .and_then(|marked| tree.node_for_window(marked))
    {
        ctx.marked_window = None;
        return Some(node);
    }
    None
}

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> LayoutEngine {
        LayoutEngine {
            workspaces: HashMap::default(),
            floating: FloatingSet::default(),
            settings,
        }
    }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    pub fn set_settings(&mut self, settings: &LayoutSettings) {
        self.settings = settings.clone();
    }

    pub fn mode(&self, workspace: WorkspaceId) -> TilingMode {
        self.workspaces.get(&workspace).map(|state| state.mode).unwrap_or(self.settings.mode)
    }

    pub fn is_floating(&self, window: WindowId) -> bool { self.floating.contains(window) }

    fn tiling_boundary(&self, ctx: &LayoutContext, server: &impl WindowServer) -> Rect {
        tiling_area(server.display_frame(ctx.display), &self.settings.gaps.outer)
    }

    fn eligible_windows(&self, ctx: &LayoutContext, server: &impl WindowServer) -> Vec<WindowId> {
        server
            .live_windows(ctx.display)
            .into_iter()
            .filter(|w| !server.is_window_floating(*w))
            .filter(|w| !server.is_application_floating(*w))
            .filter(|w| !self.floating.contains(*w))
            .collect()
    }

    /// Reconciles a workspace's tree with the live window list: missing
    /// windows are spliced out, new ones inserted and focused. Called
    /// on every polling cycle and window-list notification.
    pub fn update_windows(&mut self, ctx: &mut LayoutContext, server: &mut impl WindowServer) {
        let mode = self.mode(ctx.workspace);
        let Some(kind) = tree_kind(mode) else {
            if let Some(state) = self.workspaces.get_mut(&ctx.workspace) {
                state.tree = None;
            }
            return;
        };

        let live = self.eligible_windows(ctx, server);
        let boundary = self.tiling_boundary(ctx, server);

        let state = self
            .workspaces
            .entry(ctx.workspace)
            .or_insert_with(|| WorkspaceState { mode, tree: None });

        let mut focus_lost = false;
        if let Some(tree) = state.tree.as_mut() {
            let live_set: HashSet<WindowId> = live.iter().copied().collect();
            let dead: Vec<WindowId> =
                tree.windows().into_iter().filter(|w| !live_set.contains(w)).collect();
            if !dead.is_empty() {
                focus_lost = ctx.focused_window.is_some_and(|f| dead.contains(&f));
                if dead.len() >= tree.window_count() {
                    // Nothing survives; this also covers the one-leaf
                    // tree, which never goes through the splice path.
                    state.tree = None;
                } else {
                    for window in &dead {
                        if tree.remove_window(*window) == RemoveOutcome::TreeEmptied {
                            state.tree = None;
                            break;
                        }
                    }
                }
            }
        }

        let mut newly_focused = None;
        for &window in &live {
            let tree = state
                .tree
                .get_or_insert_with(|| BspTree::new(kind, boundary, &self.settings));
            if tree.contains_window(window) {
                continue;
            }
            let target = insertion_target(tree, ctx, window);
            tree.insert_window(window, target, &self.settings);
            newly_focused = Some(window);
        }

        self.apply_layout(ctx, server);

        if let Some(window) = newly_focused {
            server.focus_window(window);
            ctx.focused_window = Some(window);
        } else if focus_lost {
            self.recover_focus(ctx, server);
        }
    }

    /// Inserts one window into the workspace tree and focuses it.
    pub fn insert_window(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
    ) {
        if server.is_window_floating(window)
            || server.is_application_floating(window)
            || self.floating.contains(window)
        {
            debug!(%window, "floating windows are not tiled");
            return;
        }
        let mode = self.mode(ctx.workspace);
        let Some(kind) = tree_kind(mode) else {
            return;
        };
        let boundary = self.tiling_boundary(ctx, server);

        let state = self
            .workspaces
            .entry(ctx.workspace)
            .or_insert_with(|| WorkspaceState { mode, tree: None });
        let tree = state
            .tree
            .get_or_insert_with(|| BspTree::new(kind, boundary, &self.settings));
        if !tree.contains_window(window) {
            let target = insertion_target(tree, ctx, window);
            tree.insert_window(window, target, &self.settings);
        }

        self.apply_layout(ctx, server);
        server.focus_window(window);
        ctx.focused_window = Some(window);
    }

    /// Removes one window from the workspace tree, recovering focus if
    /// it was the focused one.
    pub fn remove_window(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
    ) {
        let focus_lost = ctx.focused_window == Some(window);
        self.remove_from_tree(ctx.workspace, window);
        // A closed window must not keep a stale eviction record.
        self.floating.remove(window);
        self.apply_layout(ctx, server);
        if focus_lost {
            self.recover_focus(ctx, server);
        }
    }

    pub fn swap_windows(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        a: WindowId,
        b: WindowId,
    ) -> bool {
        let Some(tree) = self.tree_mut(ctx.workspace) else {
            return false;
        };
        if !tree.swap_windows(a, b) {
            return false;
        }
        self.apply_layout(ctx, server);
        if let Some(focused) = ctx.focused_window.filter(|f| *f == a || *f == b) {
            server.warp_cursor_to_center(focused);
        }
        true
    }

    /// Returns whether a border redraw is warranted.
    pub fn toggle_fills_parent(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
    ) -> bool {
        let Some(redraw) = self.tree_mut(ctx.workspace).and_then(|t| t.toggle_fills_parent(window))
        else {
            return false;
        };
        self.apply_layout(ctx, server);
        redraw
    }

    /// Returns whether a border redraw is warranted.
    pub fn toggle_fills_root(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
    ) -> bool {
        let Some(redraw) = self.tree_mut(ctx.workspace).and_then(|t| t.toggle_fills_root(window))
        else {
            return false;
        };
        self.apply_layout(ctx, server);
        redraw
    }

    pub fn set_split_ratio(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
        ratio: f64,
    ) -> bool {
        let (gaps, default_ratio) = (self.settings.gaps.inner, self.settings.split_ratio);
        let Some(tree) = self.tree_mut(ctx.workspace) else {
            return false;
        };
        if !tree.set_ratio_for(window, ratio, &gaps, default_ratio) {
            return false;
        }
        self.apply_layout(ctx, server);
        true
    }

    pub fn adjust_split_ratio(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
        delta: f64,
    ) -> bool {
        let (gaps, default_ratio) = (self.settings.gaps.inner, self.settings.split_ratio);
        let Some(tree) = self.tree_mut(ctx.workspace) else {
            return false;
        };
        if !tree.adjust_ratio_for(window, delta, &gaps, default_ratio) {
            return false;
        }
        self.apply_layout(ctx, server);
        true
    }

    pub fn toggle_split_mode(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        window: WindowId,
    ) -> bool {
        let (gaps, default_ratio) = (self.settings.gaps.inner, self.settings.split_ratio);
        let Some(tree) = self.tree_mut(ctx.workspace) else {
            return false;
        };
        if !tree.toggle_split_for(window, &gaps, default_ratio) {
            return false;
        }
        self.apply_layout(ctx, server);
        true
    }

    /// Switches a workspace's tiling mode, rebuilding the tree from the
    /// surviving window list (or tearing it down for floating).
    pub fn set_mode(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        mode: TilingMode,
    ) {
        let current = self.mode(ctx.workspace);
        let boundary = self.tiling_boundary(ctx, server);
        let state = self
            .workspaces
            .entry(ctx.workspace)
            .or_insert_with(|| WorkspaceState { mode: current, tree: None });
        if state.mode == mode && state.tree.is_some() {
            return;
        }
        state.mode = mode;
        let windows = state.tree.take().map(|t| t.windows()).unwrap_or_default();
        if let Some(kind) = tree_kind(mode) {
            if !windows.is_empty() {
                state.tree = Some(BspTree::build(kind, boundary, &self.settings, &windows));
            }
        }
        self.apply_layout(ctx, server);
    }

    pub fn destroy_workspace(&mut self, workspace: WorkspaceId) {
        if self.workspaces.remove(&workspace).is_some() {
            debug!(?workspace, "workspace torn down");
        }
    }

    pub fn window_at_point(&self, workspace: WorkspaceId, point: Point) -> Option<WindowId> {
        self.workspaces.get(&workspace)?.tree.as_ref()?.window_at_point(point)
    }

    pub fn draw_tree(&self, workspace: WorkspaceId) -> Option<String> {
        self.workspaces.get(&workspace)?.tree.as_ref().map(|t| t.draw_tree())
    }

    /// Serializes a workspace's tree to the layout script format.
    pub fn serialize_workspace(&self, workspace: WorkspaceId) -> Option<String> {
        self.workspaces
            .get(&workspace)?
            .tree
            .as_ref()
            .map(serialize::serialize_tree)
    }

    /// Rebuilds a workspace's tree from a saved layout script, assigning
    /// the current live windows to the restored shape.
    pub fn load_workspace(
        &mut self,
        ctx: &mut LayoutContext,
        server: &mut impl WindowServer,
        script: &str,
    ) -> Result<(), LayoutScriptError> {
        let mode = self.mode(ctx.workspace);
        let Some(kind) = tree_kind(mode) else {
            debug!("floating workspaces have no layout to restore");
            return Ok(());
        };
        let live = self.eligible_windows(ctx, server);
        let boundary = self.tiling_boundary(ctx, server);
        let tree = serialize::deserialize_tree(script, kind, boundary, &self.settings, &live)?;

        let state = self
            .workspaces
            .entry(ctx.workspace)
            .or_insert_with(|| WorkspaceState { mode, tree: None });
        state.tree = Some(tree);
        self.apply_layout(ctx, server);
        Ok(())
    }

    /// Writes the whole engine state to disk.
    pub fn save_state(&self, path: &Path) -> anyhow::Result<()> {
        let serialized = ron::ser::to_string(self).context("failed to serialize engine state")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write state file {}", path.display()))?;
        Ok(())
    }

    /// Restores an engine saved with [`save_state`](Self::save_state).
    /// Settings are not part of the snapshot and are supplied fresh.
    pub fn restore_state(path: &Path, settings: LayoutSettings) -> anyhow::Result<LayoutEngine> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        let mut engine: LayoutEngine =
            ron::de::from_str(&contents).context("failed to parse state file")?;
        engine.settings = settings;
        Ok(engine)
    }

    fn tree_mut(&mut self, workspace: WorkspaceId) -> Option<&mut BspTree> {
        self.workspaces.get_mut(&workspace)?.tree.as_mut()
    }

    fn remove_from_tree(&mut self, workspace: WorkspaceId, window: WindowId) {
        if let Some(state) = self.workspaces.get_mut(&workspace) {
            if let Some(tree) = state.tree.as_mut() {
                if tree.remove_window(window) == RemoveOutcome::TreeEmptied {
                    state.tree = None;
                }
            }
        }
    }

    /// Focus recovery after the focused window left the tree: the leaf
    /// under the cursor wins, then whatever the OS reports as focused.
    fn recover_focus(&self, ctx: &mut LayoutContext, server: &mut impl WindowServer) {
        let recovered = self
            .window_at_point(ctx.workspace, server.cursor_location())
            .or_else(|| server.focused_window());
        match recovered {
            Some(window) => {
                server.focus_window(window);
                ctx.focused_window = Some(window);
            }
            None => ctx.focused_window = None,
        }
    }

    /// Recomputes geometry and pushes it to the OS. A window the OS
    /// refuses to resize is reclassified as floating, spliced out, and
    /// the remaining layout is applied again; the tree is never rolled
    /// back.
    fn apply_layout(&mut self, ctx: &LayoutContext, server: &mut impl WindowServer) {
        let boundary = self.tiling_boundary(ctx, server);
        loop {
            let placements = {
                let Some(state) = self.workspaces.get_mut(&ctx.workspace) else {
                    return;
                };
                let Some(tree) = state.tree.as_mut() else {
                    return;
                };
                tree.apply_container(boundary, &self.settings.gaps.inner, self.settings.split_ratio);
                trace!(tree = %tree.draw_tree(), "applied layout");
                tree.placements()
            };

            let mut evicted = Vec::new();
            for (window, rect) in placements {
                if let Some(current) = server.window_frame(window) {
                    if current.same_as(rect) {
                        continue;
                    }
                }
                if !server.set_window_frame(window, rect) {
                    warn!(%window, "window refused tiling geometry, floating it");
                    evicted.push(window);
                }
            }
            if evicted.is_empty() {
                return;
            }
            for window in evicted {
                self.floating.insert(window);
                self.remove_from_tree(ctx.workspace, window);
            }
        }
    }
}

/// The process-wide serialization point for engine access: every entry
/// point runs under this one lock.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<LayoutEngine>>,
}

impl SharedEngine {
    pub fn new(engine: LayoutEngine) -> SharedEngine {
        SharedEngine { inner: Arc::new(Mutex::new(engine)) }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut LayoutEngine) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }
}

assert_impl_all!(SharedEngine: Send, Sync);
