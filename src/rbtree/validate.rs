use std::{error::Error, fmt};

use crate::comparator::Comparator;

use super::node::{NodeId, Side};
use super::tree::Tree;

/// A broken red-black tree invariant, as reported by [`Tree::validate`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root is red.
    RedRoot(NodeId),
    /// The root claims to have a parent.
    RootHasParent(NodeId),
    /// A child link points at a removed node.
    DanglingLink(NodeId),
    /// A node's `parent` does not name the node that owns it.
    BrokenParentLink {
        node: NodeId,
        expected: Option<NodeId>,
        found: Option<NodeId>,
    },
    /// A left child does not compare less than its parent.
    LeftChildNotSmaller(NodeId),
    /// A right child does not compare greater than its parent.
    RightChildNotBigger(NodeId),
    /// In-order traversal is not strictly increasing at this node.
    OutOfOrder(NodeId),
    /// A red node has a red child.
    DoubleRed { parent: NodeId, child: NodeId },
    /// Two paths below this node see different numbers of black nodes.
    BlackHeightMismatch(NodeId),
    /// The number of reachable nodes does not match the number allocated.
    LenMismatch { reachable: usize, allocated: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InvariantViolation::*;
        match self {
            RedRoot(id) => write!(f, "root {id:?} is red"),
            RootHasParent(id) => write!(f, "root {id:?} has a parent"),
            DanglingLink(id) => write!(f, "link to removed node {id:?}"),
            BrokenParentLink { node, expected, found } => {
                write!(f, "parent of {node:?} should be {expected:?} but is {found:?}")
            }
            LeftChildNotSmaller(id) => write!(f, "left child {id:?} is not smaller than its parent"),
            RightChildNotBigger(id) => write!(f, "right child {id:?} is not bigger than its parent"),
            OutOfOrder(id) => write!(f, "{id:?} is out of order"),
            DoubleRed { parent, child } => write!(f, "red node {parent:?} has red child {child:?}"),
            BlackHeightMismatch(id) => write!(f, "different black path lengths below {id:?}"),
            LenMismatch { reachable, allocated } => {
                write!(f, "{reachable} nodes reachable from the root, but {allocated} allocated")
            }
        }
    }
}

impl Error for InvariantViolation {}

impl<T, C: Comparator<T>> Tree<T, C> {
    /// Checks every structural invariant of the tree.
    ///
    /// On success returns the black height: the number of black nodes on any
    /// path from the root down to an empty child slot. Complexity: O(n)
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        let Some(root) = self.root else {
            return match self.arena.len() {
                0 => Ok(0),
                allocated => Err(InvariantViolation::LenMismatch { reachable: 0, allocated }),
            };
        };

        let node = self.arena.get(root).ok_or(InvariantViolation::DanglingLink(root))?;
        if node.parent.is_some() {
            return Err(InvariantViolation::RootHasParent(root));
        }
        if node.color.is_red() {
            return Err(InvariantViolation::RedRoot(root));
        }

        let mut reachable = 0;
        let black_height = self.validate_subtree(root, &mut reachable)?;
        if reachable != self.arena.len() {
            return Err(InvariantViolation::LenMismatch { reachable, allocated: self.arena.len() });
        }

        // parent/child ordering alone doesn't catch a value that is in the
        // right spot relative to its parent but not to some higher ancestor
        let mut current = self.first();
        while let Some(node) = current {
            let next = node.successor();
            if let Some(next) = next {
                if !self.comparator.less(node.value(), next.value()) {
                    return Err(InvariantViolation::OutOfOrder(next.id()));
                }
            }
            current = next;
        }

        Ok(black_height)
    }

    /// Returns the black height of the subtree at `id`, counting `id` itself.
    fn validate_subtree(&self, id: NodeId, reachable: &mut usize) -> Result<usize, InvariantViolation> {
        let node = self.arena.get(id).ok_or(InvariantViolation::DanglingLink(id))?;
        *reachable += 1;

        let mut heights = [0; 2];
        for (height, side) in heights.iter_mut().zip([Side::Left, Side::Right]) {
            let Some(child_id) = node.child(side) else {
                continue;
            };
            let child = self.arena.get(child_id).ok_or(InvariantViolation::DanglingLink(child_id))?;

            if child.parent != Some(id) {
                return Err(InvariantViolation::BrokenParentLink {
                    node: child_id,
                    expected: Some(id),
                    found: child.parent,
                });
            }
            match side {
                Side::Left if !self.comparator.less(&child.value, &node.value) => {
                    return Err(InvariantViolation::LeftChildNotSmaller(child_id));
                }
                Side::Right if !self.comparator.less(&node.value, &child.value) => {
                    return Err(InvariantViolation::RightChildNotBigger(child_id));
                }
                _ => {}
            }
            if node.color.is_red() && child.color.is_red() {
                return Err(InvariantViolation::DoubleRed { parent: id, child: child_id });
            }

            *height = self.validate_subtree(child_id, reachable)?;
        }

        if heights[0] != heights[1] {
            return Err(InvariantViolation::BlackHeightMismatch(id));
        }
        Ok(heights[0] + usize::from(node.color.is_black()))
    }
}
