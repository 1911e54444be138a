//! A binary-space-partition layout engine for a tiling window manager.
//!
//! The engine owns the geometric subdivision of a display into nested
//! containers and keeps it consistent across live structural mutation.
//! OS integration (accessibility polling, hotkeys, IPC, border drawing)
//! lives outside this crate and talks to the engine through the
//! [`layout_engine::WindowServer`] trait.

pub mod common;
pub mod layout_engine;
pub mod model;
