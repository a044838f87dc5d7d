use std::ops::{Index, IndexMut};

use generational_arena as ga;

use super::node::{Node, NodeId};

/// Owns the storage of every node in a tree.
///
/// Thin layer over [`generational_arena::Arena`]: handles of removed nodes
/// stop resolving even after their slot is reused, and a tree-internal link
/// to a dead node is logged before it panics.
pub(crate) struct Arena<T> {
    nodes: ga::Arena<Node<T>>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self { nodes: ga::Arena::new() }
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn alloc(&mut self, node: Node<T>) -> NodeId {
        let id = NodeId(self.nodes.insert(node));
        trace!("Allocated node {id:?}");
        id
    }

    /// Releases a node's slot, returning the node. `None` if `id` is stale.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node<T>> {
        let node = self.nodes.remove(id.0)?;
        trace!("Freed node {id:?}");
        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id.0)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    /// Frees every live node one by one, so each removal advances the
    /// arena's generation and no handle from before the clear resolves
    /// afterwards.
    pub(crate) fn clear(&mut self) {
        let live: Vec<_> = self.nodes.iter().map(|(index, _)| index).collect();
        for index in live {
            self.free(NodeId(index));
        }
        debug_assert_eq!(self.len(), 0);
    }
}

/// Indexing is for links the tree itself maintains, which always point at
/// live nodes. Caller-supplied handles go through `get`.
impl<T> Index<NodeId> for Arena<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Node<T> {
        match self.get(id) {
            Some(node) => node,
            None => {
                error!("Dangling node link {id:?}");
                panic!("red-black tree corrupted: link to dead node {id:?}")
            }
        }
    }
}

impl<T> IndexMut<NodeId> for Arena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.get_mut(id) {
            Some(node) => node,
            None => {
                error!("Dangling node link {id:?}");
                panic!("red-black tree corrupted: link to dead node {id:?}")
            }
        }
    }
}
