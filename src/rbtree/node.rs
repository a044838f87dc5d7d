use std::fmt;

use generational_arena::Index;

use super::arena::Arena;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn is_red(self) -> bool {
        self == Color::Red
    }

    pub fn is_black(self) -> bool {
        self == Color::Black
    }
}

/// Which child slot of a parent a node hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A handle to a node living inside a [`Tree`](super::Tree).
///
/// Handles are arena indices with a generation tag: once the node they name is
/// removed, every lookup through the handle fails instead of hitting whatever
/// node reuses the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(super) Index);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "#{index}v{generation}")
    }
}

/// NOTE: `left`/`right` are the owning edges, `parent` is only a way back up.
/// Both sides of every edge have to be rewritten together.
#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) value: T,
    pub(crate) color: Color,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl<T> Node<T> {
    pub(crate) fn new(value: T, color: Color, parent: Option<NodeId>) -> Self {
        Self {
            value,
            color,
            parent,
            left: None,
            right: None,
        }
    }

    pub(crate) fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) fn set_child(&mut self, side: Side, child: Option<NodeId>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// The only child, if the node has exactly one.
    pub(crate) fn only_child(&self) -> Option<NodeId> {
        match (self.left, self.right) {
            (Some(c), None) | (None, Some(c)) => Some(c),
            _ => None,
        }
    }
}

/// Read-only view of a live node.
///
/// Navigation only follows the node's own links, it never looks at the tree's
/// root or comparator.
pub struct NodeRef<'a, T> {
    arena: &'a Arena<T>,
    id: NodeId,
    node: &'a Node<T>,
}

// manual impls so `T` doesn't need to be `Clone`
impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    pub(crate) fn new(arena: &'a Arena<T>, id: NodeId) -> Option<Self> {
        let node = arena.get(id)?;
        Some(Self { arena, id, node })
    }

    fn at(&self, id: NodeId) -> Self {
        Self::new(self.arena, id).expect("node links always point at live nodes")
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn value(&self) -> &'a T {
        &self.node.value
    }

    pub fn color(&self) -> Color {
        self.node.color
    }

    /// Always `true`: a `NodeRef` can only be obtained for a node that is in
    /// the tree. Lookups that find nothing return `None` instead.
    pub fn is_valid(&self) -> bool {
        true
    }

    pub fn parent(&self) -> Option<Self> {
        self.node.parent.map(|id| self.at(id))
    }

    pub fn left(&self) -> Option<Self> {
        self.node.left.map(|id| self.at(id))
    }

    pub fn right(&self) -> Option<Self> {
        self.node.right.map(|id| self.at(id))
    }

    fn child(&self, side: Side) -> Option<Self> {
        self.node.child(side).map(|id| self.at(id))
    }

    /// The last node reached by following `side` links from here.
    pub(crate) fn extreme(self, side: Side) -> Self {
        let mut current = self;
        while let Some(next) = current.child(side) {
            current = next;
        }
        current
    }

    /// Walks upward until we arrive at a parent through its `side` edge.
    fn ancestor_via(self, side: Side) -> Option<Self> {
        let mut current = self;
        while let Some(parent) = current.parent() {
            if parent.node.child(side) == Some(current.id) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// In-order neighbor on the `side` side (`Left` = predecessor).
    fn neighbor(self, side: Side) -> Option<Self> {
        match self.child(side) {
            Some(child) => Some(child.extreme(side.opposite())),
            None => self.ancestor_via(side.opposite()),
        }
    }

    /// The previous node in in-order traversal, if any.
    pub fn predecessor(&self) -> Option<Self> {
        self.neighbor(Side::Left)
    }

    /// The next node in in-order traversal, if any.
    pub fn successor(&self) -> Option<Self> {
        self.neighbor(Side::Right)
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("value", &self.node.value)
            .field("color", &self.node.color)
            .finish()
    }
}
