//! Containers: the rectangles the tree subdivides, plus the split
//! arithmetic that derives child rectangles from a parent.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, error, warn};

use crate::common::config::InnerGaps;
use crate::layout_engine::geometry::{Point, Rect};

/// Aspect ratio above which a rectangle is split side-by-side.
const OPTIMAL_RATIO: f64 = 1.618;

/// Where a container sits relative to its parent's split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ContainerKind {
    Root,
    Left,
    Right,
    Upper,
    Lower,
}

/// Axis along which a container divides between its two children.
/// Vertical places the children side by side, Horizontal stacks them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum SplitMode {
    Unset,
    Vertical,
    Horizontal,
}

impl SplitMode {
    pub fn toggled(self) -> SplitMode {
        match self {
            SplitMode::Unset => SplitMode::Unset,
            SplitMode::Vertical => SplitMode::Horizontal,
            SplitMode::Horizontal => SplitMode::Vertical,
        }
    }
}

pub fn is_valid_ratio(ratio: f64) -> bool { ratio > 0.0 && ratio < 1.0 }

/// Picks the split axis from a rectangle's aspect ratio: wide rectangles
/// divide into columns, everything else into rows.
pub fn optimal_split_mode(rect: &Rect) -> SplitMode {
    if rect.size.height > 0.0 && rect.size.width / rect.size.height >= OPTIMAL_RATIO {
        SplitMode::Vertical
    } else {
        SplitMode::Horizontal
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub rect: Rect,
    pub kind: ContainerKind,
    pub split_mode: SplitMode,
    pub ratio: f64,
}

impl Container {
    /// The top-level container of a tree. Its split mode stays unset
    /// until the first pairing decides an axis.
    pub fn root(rect: Rect, default_ratio: f64) -> Container {
        Container {
            rect,
            kind: ContainerKind::Root,
            split_mode: SplitMode::Unset,
            ratio: default_ratio,
        }
    }

    /// Derives a child container from `parent` for the given position.
    ///
    /// A parent ratio outside (0, 1) is repaired to `default_ratio`
    /// before any arithmetic. `kind` must not be `Root`: root containers
    /// are never produced by splitting.
    pub fn split(
        gaps: &InnerGaps,
        parent: &mut Container,
        kind: ContainerKind,
        default_ratio: f64,
    ) -> Container {
        if kind == ContainerKind::Root {
            debug_assert!(false, "cannot split into a root container");
            error!("refusing to split into a root container");
            return Container {
                rect: parent.rect,
                kind: parent.kind,
                split_mode: optimal_split_mode(&parent.rect),
                ratio: default_ratio,
            };
        }

        if !is_valid_ratio(parent.ratio) {
            warn!(
                ratio = parent.ratio,
                "split ratio outside (0, 1), resetting to default"
            );
            parent.ratio = default_ratio;
        }

        let rect = match kind {
            ContainerKind::Left => split_left(gaps, parent),
            ContainerKind::Right => split_right(gaps, parent),
            ContainerKind::Upper => split_upper(gaps, parent),
            ContainerKind::Lower => split_lower(gaps, parent),
            ContainerKind::Root => unreachable!(),
        };

        Container {
            rect,
            kind,
            split_mode: optimal_split_mode(&rect),
            ratio: default_ratio,
        }
    }

    /// Rejects ratios outside the open interval (0, 1); the stored value
    /// is kept in that case.
    pub fn set_ratio(&mut self, ratio: f64) {
        if !is_valid_ratio(ratio) {
            warn!(ratio, "ignoring split ratio outside (0, 1)");
            return;
        }
        self.ratio = ratio;
    }

    pub fn adjust_ratio(&mut self, delta: f64) { self.set_ratio(self.ratio + delta); }

    pub fn toggle_split_mode(&mut self) {
        match self.split_mode {
            SplitMode::Unset => debug!("toggle of an unset split mode is a no-op"),
            mode => self.split_mode = mode.toggled(),
        }
    }

    pub fn contains_point(&self, point: Point) -> bool { self.rect.contains(point) }
}

fn split_left(gaps: &InnerGaps, parent: &Container) -> Rect {
    let r = &parent.rect;
    Rect::new(
        r.origin.x,
        r.origin.y,
        r.size.width * parent.ratio - gaps.horizontal / 2.0,
        r.size.height,
    )
}

fn split_right(gaps: &InnerGaps, parent: &Container) -> Rect {
    let r = &parent.rect;
    Rect::new(
        r.origin.x + r.size.width * parent.ratio + gaps.horizontal / 2.0,
        r.origin.y,
        r.size.width * (1.0 - parent.ratio) - gaps.horizontal / 2.0,
        r.size.height,
    )
}

fn split_upper(gaps: &InnerGaps, parent: &Container) -> Rect {
    let r = &parent.rect;
    Rect::new(
        r.origin.x,
        r.origin.y,
        r.size.width,
        r.size.height * parent.ratio - gaps.vertical / 2.0,
    )
}

fn split_lower(gaps: &InnerGaps, parent: &Container) -> Rect {
    let r = &parent.rect;
    Rect::new(
        r.origin.x,
        r.origin.y + r.size.height * parent.ratio + gaps.vertical / 2.0,
        r.size.width,
        r.size.height * (1.0 - parent.ratio) - gaps.vertical / 2.0,
    )
}
