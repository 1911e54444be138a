//! Scenario tests driving the engine through the collaborator trait.

use pretty_assertions::assert_eq;

use crate::common::collections::{HashMap, HashSet};
use crate::common::config::{LayoutSettings, TilingMode};
use crate::layout_engine::engine::LayoutEngine;
use crate::layout_engine::geometry::{Point, Rect};
use crate::layout_engine::window::{
    DisplayId, LayoutContext, WindowId, WindowServer, WorkspaceId,
};

/// Scripted stand-in for the OS layer: a single display, a live window
/// list the test edits directly, and recorded side effects.
pub(crate) struct FakeServer {
    pub frame: Rect,
    pub windows: Vec<WindowId>,
    pub frames: HashMap<WindowId, Rect>,
    pub floating: HashSet<WindowId>,
    pub app_floating: HashSet<WindowId>,
    pub unresizable: HashSet<WindowId>,
    pub focused: Option<WindowId>,
    pub cursor: Point,
    pub focus_calls: Vec<WindowId>,
    pub warp_calls: Vec<WindowId>,
    pub set_frame_calls: usize,
}

impl FakeServer {
    pub fn new(width: f64, height: f64) -> FakeServer {
        FakeServer {
            frame: Rect::new(0.0, 0.0, width, height),
            windows: Vec::new(),
            frames: HashMap::default(),
            floating: HashSet::default(),
            app_floating: HashSet::default(),
            unresizable: HashSet::default(),
            focused: None,
            cursor: Point::new(-100.0, -100.0),
            focus_calls: Vec::new(),
            warp_calls: Vec::new(),
            set_frame_calls: 0,
        }
    }
}

impl WindowServer for FakeServer {
    fn live_windows(&self, _display: DisplayId) -> Vec<WindowId> { self.windows.clone() }

    fn display_frame(&self, _display: DisplayId) -> Rect { self.frame }

    fn window_frame(&self, window: WindowId) -> Option<Rect> {
        self.frames.get(&window).copied()
    }

    fn set_window_frame(&mut self, window: WindowId, frame: Rect) -> bool {
        self.set_frame_calls += 1;
        if self.unresizable.contains(&window) {
            return false;
        }
        self.frames.insert(window, frame);
        true
    }

    fn focus_window(&mut self, window: WindowId) {
        self.focused = Some(window);
        self.focus_calls.push(window);
    }

    fn warp_cursor_to_center(&mut self, window: WindowId) {
        self.warp_calls.push(window);
        if let Some(frame) = self.frames.get(&window) {
            self.cursor = frame.center();
        }
    }

    fn cursor_location(&self) -> Point { self.cursor }

    fn focused_window(&self) -> Option<WindowId> { self.focused }

    fn is_window_floating(&self, window: WindowId) -> bool { self.floating.contains(&window) }

    fn is_application_floating(&self, window: WindowId) -> bool {
        self.app_floating.contains(&window)
    }
}

fn w(idx: u32) -> WindowId { WindowId::new(idx) }

fn ctx() -> LayoutContext { LayoutContext::new(DisplayId::new(1), WorkspaceId::new(1)) }

#[test_log::test]
fn first_window_covers_the_whole_display() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1)];
    engine.update_windows(&mut ctx, &mut server);

    assert_eq!(server.frames[&w(1)], Rect::new(0.0, 0.0, 1920.0, 1080.0));
}

#[test_log::test]
fn second_window_halves_the_display() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1)];
    engine.update_windows(&mut ctx, &mut server);
    server.windows.push(w(2));
    engine.update_windows(&mut ctx, &mut server);

    assert_eq!(server.frames[&w(1)], Rect::new(0.0, 0.0, 960.0, 1080.0));
    assert_eq!(server.frames[&w(2)], Rect::new(960.0, 0.0, 960.0, 1080.0));
}

#[test_log::test]
fn raising_the_gap_reflows_existing_windows() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2)];
    engine.update_windows(&mut ctx, &mut server);

    let mut settings = LayoutSettings::default();
    settings.gaps.inner.horizontal = 10.0;
    settings.gaps.inner.vertical = 10.0;
    engine.set_settings(&settings);
    engine.update_windows(&mut ctx, &mut server);

    assert_eq!(server.frames[&w(1)], Rect::new(0.0, 0.0, 955.0, 1080.0));
    assert_eq!(server.frames[&w(2)], Rect::new(965.0, 0.0, 955.0, 1080.0));
}

#[test_log::test]
fn removing_a_window_collapses_the_split() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2)];
    engine.update_windows(&mut ctx, &mut server);

    server.windows = vec![w(2)];
    engine.update_windows(&mut ctx, &mut server);

    assert_eq!(server.frames[&w(2)], Rect::new(0.0, 0.0, 1920.0, 1080.0));
}

#[test_log::test]
fn saved_layout_absorbs_a_grown_window_list() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2)];
    engine.update_windows(&mut ctx, &mut server);
    let script = engine.serialize_workspace(ctx.workspace).unwrap();

    // A later session: three live windows against the two saved leaves.
    let mut server = FakeServer::new(1920.0, 1080.0);
    server.windows = vec![w(10), w(11), w(12)];
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = self::ctx();
    engine.load_workspace(&mut ctx, &mut server, &script).unwrap();

    // The first two live windows take the saved leaves in order; the
    // third pairs into one of them.
    assert_eq!(server.frames.len(), 3);
    assert_eq!(server.frames[&w(11)], Rect::new(960.0, 0.0, 960.0, 1080.0));
    assert_eq!(server.frames[&w(10)], Rect::new(0.0, 0.0, 960.0, 540.0));
    assert_eq!(server.frames[&w(12)], Rect::new(0.0, 540.0, 960.0, 540.0));
}

#[test_log::test]
fn fill_parent_toggle_restores_the_exact_frame() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2), w(3)];
    engine.update_windows(&mut ctx, &mut server);

    // 3 sits two levels deep, inside 1's former half.
    let before = server.frames[&w(3)];
    assert_eq!(before, Rect::new(0.0, 540.0, 960.0, 540.0));

    assert!(engine.toggle_fills_parent(&mut ctx, &mut server, w(3)));
    assert_eq!(server.frames[&w(3)], Rect::new(0.0, 0.0, 960.0, 1080.0));

    assert!(engine.toggle_fills_parent(&mut ctx, &mut server, w(3)));
    assert_eq!(server.frames[&w(3)], before);
}

#[test_log::test]
fn fill_root_covers_the_display_and_restores() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2), w(3)];
    engine.update_windows(&mut ctx, &mut server);
    let before = server.frames[&w(3)];

    assert!(engine.toggle_fills_root(&mut ctx, &mut server, w(3)));
    assert_eq!(server.frames[&w(3)], Rect::new(0.0, 0.0, 1920.0, 1080.0));

    assert!(engine.toggle_fills_root(&mut ctx, &mut server, w(3)));
    assert_eq!(server.frames[&w(3)], before);
}

#[test_log::test]
fn frames_partition_the_display() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = (1..=6).map(w).collect();
    engine.update_windows(&mut ctx, &mut server);

    let frames: Vec<Rect> = server.frames.values().copied().collect();
    let total: f64 = frames.iter().map(Rect::area).sum();
    assert!((total - server.frame.area()).abs() < 1e-6);
    for (i, a) in frames.iter().enumerate() {
        for b in frames.iter().skip(i + 1) {
            assert_eq!(a.intersection(b).area(), 0.0);
        }
    }
}

#[test_log::test]
fn monocle_workspace_stacks_fullscreen() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut settings = LayoutSettings::default();
    settings.mode = TilingMode::Monocle;
    let mut engine = LayoutEngine::new(settings);
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2), w(3)];
    engine.update_windows(&mut ctx, &mut server);

    for idx in 1..=3 {
        assert_eq!(server.frames[&w(idx)], Rect::new(0.0, 0.0, 1920.0, 1080.0));
    }

    // Shrinking to one window resets the stack rather than splicing.
    server.windows = vec![w(2)];
    engine.update_windows(&mut ctx, &mut server);
    server.windows = vec![];
    engine.update_windows(&mut ctx, &mut server);
    assert!(engine.draw_tree(ctx.workspace).is_none());
}

#[test_log::test]
fn floating_mode_leaves_windows_alone() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut settings = LayoutSettings::default();
    settings.mode = TilingMode::Floating;
    let mut engine = LayoutEngine::new(settings);
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2)];
    engine.update_windows(&mut ctx, &mut server);

    assert!(server.frames.is_empty());
    assert!(engine.draw_tree(ctx.workspace).is_none());
}

#[test_log::test]
fn hit_testing_follows_the_layout() {
    let mut server = FakeServer::new(1920.0, 1080.0);
    let mut engine = LayoutEngine::new(LayoutSettings::default());
    let mut ctx = ctx();

    server.windows = vec![w(1), w(2)];
    engine.update_windows(&mut ctx, &mut server);

    assert_eq!(
        engine.window_at_point(ctx.workspace, Point::new(100.0, 500.0)),
        Some(w(1))
    );
    assert_eq!(
        engine.window_at_point(ctx.workspace, Point::new(1500.0, 500.0)),
        Some(w(2))
    );
    assert_eq!(
        engine.window_at_point(WorkspaceId::new(9), Point::new(100.0, 500.0)),
        None
    );
}
