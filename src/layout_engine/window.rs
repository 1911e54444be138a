//! Identifiers and the collaborator surface the engine drives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout_engine::geometry::{Point, Rect};

/// Opaque, stable handle for an on-screen window, supplied by the OS
/// layer. The engine never looks inside it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WindowId(pub u32);

impl WindowId {
    pub fn new(raw: u32) -> WindowId { WindowId(raw) }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "window {}", self.0) }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DisplayId(pub u32);

impl DisplayId {
    pub fn new(raw: u32) -> DisplayId { DisplayId(raw) }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorkspaceId(pub u32);

impl WorkspaceId {
    pub fn new(raw: u32) -> WorkspaceId { WorkspaceId(raw) }
}

/// Everything an engine call needs to know about "where we are": the
/// active display and workspace plus the focus and mark state the
/// hotkey layer tracks. Passed into every engine entry point instead of
/// living in globals.
#[derive(Clone, Copy, Debug)]
pub struct LayoutContext {
    pub display: DisplayId,
    pub workspace: WorkspaceId,
    pub focused_window: Option<WindowId>,
    pub marked_window: Option<WindowId>,
}

impl LayoutContext {
    pub fn new(display: DisplayId, workspace: WorkspaceId) -> LayoutContext {
        LayoutContext {
            display,
            workspace,
            focused_window: None,
            marked_window: None,
        }
    }
}

/// The OS side of the window manager. All calls are synchronous; the
/// only error channel is the `bool`/`Option` results. A `false` from
/// [`set_window_frame`](WindowServer::set_window_frame) means the OS
/// refused the geometry (non-resizable window).
pub trait WindowServer {
    /// Current on-screen, tile-eligible windows for a display, already
    /// filtered by application allow-lists.
    fn live_windows(&self, display: DisplayId) -> Vec<WindowId>;

    /// Full frame of a display in global coordinates.
    fn display_frame(&self, display: DisplayId) -> Rect;

    fn window_frame(&self, window: WindowId) -> Option<Rect>;

    fn set_window_frame(&mut self, window: WindowId, frame: Rect) -> bool;

    fn focus_window(&mut self, window: WindowId);

    fn warp_cursor_to_center(&mut self, window: WindowId);

    fn cursor_location(&self) -> Point;

    /// The window the OS currently reports as focused.
    fn focused_window(&self) -> Option<WindowId>;

    fn is_window_floating(&self, window: WindowId) -> bool;

    fn is_application_floating(&self, window: WindowId) -> bool;
}
