pub mod bsp;
pub mod container;
pub mod engine;
pub mod geometry;
pub mod serialize;
pub mod window;

pub use bsp::{BspTree, RemoveOutcome, TreeKind};
pub use container::{Container, ContainerKind, SplitMode};
pub use engine::{LayoutEngine, SharedEngine};
pub use geometry::{Point, Rect, Size};
pub use serialize::LayoutScriptError;
pub use window::{DisplayId, LayoutContext, WindowId, WindowServer, WorkspaceId};

pub use crate::common::config::TilingMode;

#[cfg(test)]
mod tests;
