pub mod tree;

pub use tree::{NodeId, NodeMap, OwnedNode, Slot, Tree};
