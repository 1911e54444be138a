//! Saving and restoring a tree's shape as a line-oriented command
//! script. Only structure, split modes, and ratios are written; window
//! ids are assigned from the live window list at load time, which keeps
//! a saved layout portable across sessions.
//!
//! ```text
//! tree root create parent
//! tree split-mode 0
//! tree split-ratio 0.500
//! tree child
//! tree leaf create left
//! tree leaf create right
//! ```
//!
//! Every internal node opens a `tree root create` block (`parent` only
//! for the tree root) followed by its split mode (`0` = vertical,
//! `1` = horizontal), its ratio, and `tree child` introducing exactly
//! two child directives: a `tree leaf create` line or a nested block.

use std::str::FromStr;

use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::debug;

use crate::common::config::LayoutSettings;
use crate::layout_engine::bsp::{BspTree, TreeKind};
use crate::layout_engine::container::SplitMode;
use crate::layout_engine::geometry::Rect;
use crate::layout_engine::window::WindowId;
use crate::model::tree::NodeId;

#[derive(Debug, Error)]
pub enum LayoutScriptError {
    #[error("unexpected end of layout script (expected {expected})")]
    UnexpectedEof { expected: &'static str },
    #[error("line {line}: expected {expected}, found {found:?}")]
    Unexpected {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("line {line}: invalid split mode {found:?}")]
    InvalidSplitMode { line: usize, found: String },
    #[error("line {line}: invalid split ratio {found:?}")]
    InvalidSplitRatio { line: usize, found: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum NodePosition {
    Parent,
    Left,
    Right,
}

fn mode_code(mode: SplitMode) -> u8 {
    match mode {
        SplitMode::Horizontal => 1,
        SplitMode::Vertical | SplitMode::Unset => 0,
    }
}

/// Emits the tree shape depth-first. A single-leaf tree (and a monocle
/// chain, which has no shape worth keeping) serializes to the empty
/// script.
pub fn serialize_tree(tree: &BspTree) -> String {
    let mut out = String::new();
    if tree.kind() == TreeKind::Monocle {
        return out;
    }
    let root = tree.root_id();
    if tree.split_params(root).is_some() {
        emit(tree, root, NodePosition::Parent, &mut out);
    }
    out
}

fn emit(tree: &BspTree, node: NodeId, pos: NodePosition, out: &mut String) {
    let Some((mode, ratio)) = tree.split_params(node) else {
        return;
    };
    out.push_str(&format!("tree root create {pos}\n"));
    out.push_str(&format!("tree split-mode {}\n", mode_code(mode)));
    out.push_str(&format!("tree split-ratio {ratio:.3}\n"));
    out.push_str("tree child\n");
    let (left, right) = tree.children(node);
    for (child, child_pos) in [(left, NodePosition::Left), (right, NodePosition::Right)] {
        let Some(child) = child else { continue };
        if tree.split_params(child).is_some() {
            emit(tree, child, child_pos, out);
        } else {
            out.push_str(&format!("tree leaf create {child_pos}\n"));
        }
    }
}

/// Rebuilds a tree from a saved script. The restored leaves are filled
/// with `windows` in left-to-right order; leaves beyond the window list
/// stay pseudo-leaves, and surplus windows are paired in at the
/// shallowest leaf. Monocle trees ignore the script and rebuild their
/// stack from the window list alone.
pub fn deserialize_tree(
    script: &str,
    kind: TreeKind,
    boundary: Rect,
    settings: &LayoutSettings,
    windows: &[WindowId],
) -> Result<BspTree, LayoutScriptError> {
    if kind == TreeKind::Monocle {
        debug!("monocle layouts carry no saved shape, rebuilding the stack");
        return Ok(BspTree::build(kind, boundary, settings, windows));
    }

    let shape = parse_script(script)?;
    let mut tree = BspTree::new(TreeKind::Bsp, boundary, settings);
    if let Some(shape) = &shape {
        let root = tree.root_id();
        build_shape(&mut tree, root, shape, settings);
    }

    let mut windows = windows.iter().copied();
    for leaf in tree.leaves() {
        let Some(window) = windows.next() else { break };
        tree.set_window_at(leaf, Some(window));
    }
    for window in windows {
        tree.insert_window(window, None, settings);
    }

    tree.apply_container(boundary, &settings.gaps.inner, settings.split_ratio);
    Ok(tree)
}

enum ShapeNode {
    Leaf,
    Split {
        mode: SplitMode,
        ratio: f64,
        left: Box<ShapeNode>,
        right: Box<ShapeNode>,
    },
}

fn build_shape(tree: &mut BspTree, node: NodeId, shape: &ShapeNode, settings: &LayoutSettings) {
    if let ShapeNode::Split { mode, ratio, left, right } = shape {
        if let Some((left_node, right_node)) =
            tree.split_leaf_bare(node, *mode, *ratio, &settings.gaps.inner, settings.split_ratio)
        {
            build_shape(tree, left_node, left, settings);
            build_shape(tree, right_node, right, settings);
        }
    }
}

struct Reader<'a> {
    // (1-based line number, non-empty line)
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(script: &'a str) -> Reader<'a> {
        Reader {
            lines: script
                .lines()
                .enumerate()
                .map(|(idx, line)| (idx + 1, line.trim()))
                .filter(|(_, line)| !line.is_empty())
                .collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<(usize, &'a str)> { self.lines.get(self.pos).copied() }

    fn next(&mut self, expected: &'static str) -> Result<(usize, &'a str), LayoutScriptError> {
        let line = self
            .peek()
            .ok_or(LayoutScriptError::UnexpectedEof { expected })?;
        self.pos += 1;
        Ok(line)
    }
}

fn parse_script(script: &str) -> Result<Option<ShapeNode>, LayoutScriptError> {
    let mut reader = Reader::new(script);
    if reader.peek().is_none() {
        return Ok(None);
    }
    let shape = parse_internal(&mut reader, NodePosition::Parent)?;
    if let Some((line, found)) = reader.peek() {
        return Err(LayoutScriptError::Unexpected {
            line,
            expected: "end of script",
            found: found.to_string(),
        });
    }
    Ok(Some(shape))
}

fn parse_internal(
    reader: &mut Reader<'_>,
    pos: NodePosition,
) -> Result<ShapeNode, LayoutScriptError> {
    expect_directive(reader, "tree root create", pos)?;

    let (line, text) = reader.next("tree split-mode")?;
    let mode = match strip_command(text, "tree split-mode") {
        Some("0") => SplitMode::Vertical,
        Some("1") => SplitMode::Horizontal,
        Some(found) => {
            return Err(LayoutScriptError::InvalidSplitMode { line, found: found.to_string() });
        }
        None => {
            return Err(LayoutScriptError::Unexpected {
                line,
                expected: "tree split-mode",
                found: text.to_string(),
            });
        }
    };

    let (line, text) = reader.next("tree split-ratio")?;
    let ratio = match strip_command(text, "tree split-ratio") {
        Some(raw) => raw.parse::<f64>().map_err(|_| LayoutScriptError::InvalidSplitRatio {
            line,
            found: raw.to_string(),
        })?,
        None => {
            return Err(LayoutScriptError::Unexpected {
                line,
                expected: "tree split-ratio",
                found: text.to_string(),
            });
        }
    };

    let (line, text) = reader.next("tree child")?;
    if text != "tree child" {
        return Err(LayoutScriptError::Unexpected {
            line,
            expected: "tree child",
            found: text.to_string(),
        });
    }

    let left = parse_child(reader, NodePosition::Left)?;
    let right = parse_child(reader, NodePosition::Right)?;

    Ok(ShapeNode::Split {
        mode,
        ratio,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn parse_child(
    reader: &mut Reader<'_>,
    pos: NodePosition,
) -> Result<ShapeNode, LayoutScriptError> {
    let (line, text) = reader
        .peek()
        .ok_or(LayoutScriptError::UnexpectedEof { expected: "tree leaf create or tree root create" })?;
    if let Some(label) = strip_command(text, "tree leaf create") {
        if NodePosition::from_str(label) != Ok(pos) {
            return Err(LayoutScriptError::Unexpected {
                line,
                expected: "matching leaf position",
                found: text.to_string(),
            });
        }
        reader.pos += 1;
        return Ok(ShapeNode::Leaf);
    }
    if strip_command(text, "tree root create").is_some() {
        return parse_internal(reader, pos);
    }
    Err(LayoutScriptError::Unexpected {
        line,
        expected: "tree leaf create or tree root create",
        found: text.to_string(),
    })
}

fn expect_directive(
    reader: &mut Reader<'_>,
    command: &'static str,
    pos: NodePosition,
) -> Result<(), LayoutScriptError> {
    let (line, text) = reader.next(command)?;
    match strip_command(text, command) {
        Some(label) if NodePosition::from_str(label) == Ok(pos) => Ok(()),
        _ => Err(LayoutScriptError::Unexpected {
            line,
            expected: command,
            found: text.to_string(),
        }),
    }
}

fn strip_command<'a>(line: &'a str, command: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(command)?;
    if rest.is_empty() {
        return None;
    }
    let rest = rest.strip_prefix(' ')?;
    Some(rest.trim())
}
