use std::fmt;
use std::mem;

use crate::comparator::{Comparator, Natural};

use super::arena::Arena;
use super::node::{Color, Node, NodeId, NodeRef, Side};

/// Where a value sits, or would sit, in the tree.
enum Probe {
    Found(NodeId),
    /// Not present; it belongs in the given (empty) child slot of this node.
    Vacant(NodeId, Side),
}

/// An ordered set of `T`, kept balanced as a red-black tree.
///
/// Nodes live in an arena and link to each other through [`NodeId`] handles,
/// so the parent back-links never own anything. Values are ordered by the
/// comparator `C`, which defaults to `T`'s [`Ord`] implementation.
///
/// All operations are O(log n).
pub struct Tree<T, C = Natural> {
    pub(super) arena: Arena<T>,
    pub(super) root: Option<NodeId>,
    pub(super) comparator: C,
}

impl<T: Ord> Tree<T, Natural> {
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<T: Ord> Default for Tree<T, Natural> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Comparator<T>> Tree<T, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            comparator,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Looks up a handle. `None` if the node has since been removed.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, T>> {
        NodeRef::new(&self.arena, id)
    }

    pub fn root(&self) -> Option<NodeRef<'_, T>> {
        self.root.and_then(|id| self.get(id))
    }

    /// The node holding the smallest value.
    pub fn first(&self) -> Option<NodeRef<'_, T>> {
        self.root().map(|root| root.extreme(Side::Left))
    }

    /// The node holding the largest value.
    pub fn last(&self) -> Option<NodeRef<'_, T>> {
        self.root().map(|root| root.extreme(Side::Right))
    }

    /// Iterates over the values in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { next: self.first() }
    }

    /// Walks down from the root the same way `find` and `insert` do.
    /// `None` only when the tree is empty.
    fn probe(&self, value: &T) -> Option<Probe> {
        let mut current = self.root?;
        loop {
            let node = &self.arena[current];
            if self.comparator.equal(&node.value, value) {
                return Some(Probe::Found(current));
            }
            let side = if self.comparator.less(&node.value, value) {
                Side::Right
            } else {
                Side::Left
            };
            match node.child(side) {
                Some(next) => current = next,
                None => return Some(Probe::Vacant(current, side)),
            }
        }
    }

    /// Finds the node holding a value equal to `value`.
    pub fn find(&self, value: &T) -> Option<NodeRef<'_, T>> {
        match self.probe(value)? {
            Probe::Found(id) => self.get(id),
            Probe::Vacant(..) => None,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    /// Inserts `value` and returns its node.
    ///
    /// If an equal value is already present, that node is returned untouched
    /// and `value` is dropped.
    pub fn insert(&mut self, value: T) -> NodeId {
        let (parent, side) = match self.probe(&value) {
            None => {
                let id = self.arena.alloc(Node::new(value, Color::Black, None));
                self.root = Some(id);
                debug!("Inserted {id:?} as the root");
                self.self_check();
                return id;
            }
            Some(Probe::Found(id)) => return id,
            Some(Probe::Vacant(parent, side)) => (parent, side),
        };

        let id = self.arena.alloc(Node::new(value, Color::Red, Some(parent)));
        self.arena[parent].set_child(side, Some(id));
        debug!("Inserted {id:?} under {parent:?} ({side:?})");

        self.fix_after_insert(id);
        self.self_check();
        id
    }

    /// Removes the value equal to `value`, if any, and returns it.
    pub fn remove_by_value(&mut self, value: &T) -> Option<T> {
        match self.probe(value)? {
            Probe::Found(id) => self.remove(id),
            Probe::Vacant(..) => None,
        }
    }

    /// Removes the value held by `id` and returns it. `None` if `id` is stale.
    ///
    /// NOTE: when the node has two children, it stays in the tree and takes
    /// over the value of its in-order successor, whose node is freed instead.
    /// So `id` remains a valid handle (now to the successor's value), and the
    /// successor's handle goes stale.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        if !self.arena.contains(id) {
            return None;
        }

        // walk to the node that can actually be unlinked, remembering the path
        // so the values can be shifted back along it afterwards
        let mut chain = vec![id];
        let mut victim = id;
        while !self.is_unlinkable(victim) {
            victim = self.replacement(victim);
            chain.push(victim);
        }

        let mut value = self.unlink(victim);
        for &node in chain.iter().rev().skip(1) {
            value = mem::replace(&mut self.arena[node].value, value);
        }

        self.self_check();
        Some(value)
    }

    /// Removes every node. All outstanding handles go stale.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.arena[id].color.is_red())
    }

    fn side_of(&self, parent: NodeId, child: NodeId) -> Side {
        let parent_node = &self.arena[parent];
        if parent_node.left == Some(child) {
            Side::Left
        } else {
            debug_assert_eq!(parent_node.right, Some(child), "{child:?} is not a child of {parent:?}");
            Side::Right
        }
    }

    /// The child of `parent` on the other side from `side`.
    ///
    /// When `side` is short on black nodes the other side has at least one
    /// black node more, so the sibling always exists in a well-formed tree.
    fn sibling(&self, parent: NodeId, side: Side) -> NodeId {
        match self.arena[parent].child(side.opposite()) {
            Some(sibling) => sibling,
            None => {
                error!("Node {parent:?} has no sibling for its {side:?} side while rebalancing");
                panic!("red-black tree corrupted: {parent:?} is missing its {:?} child", side.opposite())
            }
        }
    }

    /// Points whatever owned `old` (a parent or the root) at `new` instead.
    /// Does not touch `new`'s parent link.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(parent, old);
                self.arena[parent].set_child(side, new);
            }
        }
    }

    /// Rotates `node` down toward `toward`, lifting its child on the other side
    /// into its place. `Side::Left` is a left rotation (around the right child)
    /// and `Side::Right` a right rotation (around the left child).
    ///
    /// In-order sequence is unchanged. No-op if there is no child to lift.
    fn rotate(&mut self, node: NodeId, toward: Side) {
        let Some(pivot) = self.arena[node].child(toward.opposite()) else {
            return;
        };
        trace!("Rotating {node:?} {toward:?} around {pivot:?}");

        let parent = self.arena[node].parent;
        let inner = self.arena[pivot].child(toward);

        self.replace_child(parent, node, Some(pivot));
        self.arena[pivot].parent = parent;

        self.arena[node].set_child(toward.opposite(), inner);
        if let Some(inner) = inner {
            self.arena[inner].parent = Some(node);
        }

        self.arena[pivot].set_child(toward, Some(node));
        self.arena[node].parent = Some(pivot);
    }

    /// Repairs a red node sitting under a red parent, the only violation a new
    /// red leaf can cause. Each round either finishes or moves two levels up.
    fn fix_after_insert(&mut self, mut node: NodeId) {
        loop {
            let Some(parent) = self.arena[node].parent else {
                break;
            };
            if !(self.arena[node].color.is_red() && self.arena[parent].color.is_red()) {
                break;
            }
            let Some(grand) = self.arena[parent].parent else {
                error!("Red node {parent:?} is the root while fixing up after inserting {node:?}");
                panic!("red-black tree corrupted: red node {parent:?} has no grandparent above {node:?}");
            };

            let parent_side = self.side_of(grand, parent);
            let node_side = self.side_of(parent, node);
            let uncle = self.arena[grand].child(parent_side.opposite());

            if let Some(uncle) = uncle.filter(|&uncle| self.arena[uncle].color.is_red()) {
                debug!("Insert fixup at {node:?}: red uncle {uncle:?}, recoloring");
                self.arena[parent].color = Color::Black;
                self.arena[uncle].color = Color::Black;
                if self.root == Some(grand) {
                    break;
                }
                self.arena[grand].color = Color::Red;
                node = grand;
                continue;
            }

            if parent_side == node_side {
                // LL / RR
                debug!("Insert fixup at {node:?}: outer child, rotating {grand:?}");
                self.arena[parent].color = Color::Black;
                self.arena[grand].color = Color::Red;
                self.rotate(grand, parent_side.opposite());
            } else {
                // LR / RL
                debug!("Insert fixup at {node:?}: inner child, rotating {parent:?} then {grand:?}");
                self.arena[node].color = Color::Black;
                self.arena[grand].color = Color::Red;
                self.rotate(parent, parent_side);
                self.rotate(grand, parent_side.opposite());
            }
            break;
        }
    }

    /// A node can be unlinked directly if it is a leaf, or if it is black and
    /// its only child is a red leaf (which then takes its place).
    fn is_unlinkable(&self, id: NodeId) -> bool {
        let node = &self.arena[id];
        if node.is_leaf() {
            return true;
        }
        node.color.is_black()
            && node.only_child().is_some_and(|child| {
                let child = &self.arena[child];
                child.color.is_red() && child.is_leaf()
            })
    }

    /// The in-order successor of `id` (predecessor if it has none), which
    /// takes over `id`'s job in `remove`.
    fn replacement(&self, id: NodeId) -> NodeId {
        let node = NodeRef::new(&self.arena, id).map(|node| node.successor().or_else(|| node.predecessor()));
        match node.flatten() {
            Some(next) => next.id(),
            None => {
                error!("Node {id:?} has children but no in-order neighbor");
                panic!("red-black tree corrupted: no replacement for {id:?}")
            }
        }
    }

    /// Structurally removes a node that `is_unlinkable` and frees it.
    fn unlink(&mut self, id: NodeId) -> T {
        let node = &self.arena[id];
        let (color, parent) = (node.color, node.parent);

        if let Some(child) = node.only_child() {
            // black node over a red leaf: the leaf moves up and turns black
            debug!("Splicing {child:?} into the place of {id:?}");
            self.replace_child(parent, id, Some(child));
            let child = &mut self.arena[child];
            child.parent = parent;
            child.color = Color::Black;
        } else if let Some(parent) = parent {
            let side = self.side_of(parent, id);
            if color.is_black() {
                debug!("Removing black leaf {id:?}, rebalancing from {parent:?}");
                let sibling = self.sibling(parent, side);
                if self.arena[sibling].color.is_red() {
                    self.arena[sibling].color = Color::Black;
                    self.arena[parent].color = Color::Red;
                    self.rotate(parent, side);
                }
                // rotations only ever push `parent` further down on our side,
                // so `id` is still its child afterwards
                self.fix_after_remove(parent, side);
            }
            debug_assert_eq!(self.arena[id].parent, Some(parent));
            self.arena[parent].set_child(side, None);
        } else {
            debug!("Removing the last node {id:?}");
            self.root = None;
        }

        self.arena.free(id).expect("node was live before unlinking").value
    }

    /// Restores black-height after the `side` subtree of `parent` lost one
    /// black node.
    fn fix_after_remove(&mut self, mut parent: NodeId, mut side: Side) {
        loop {
            let sibling = self.sibling(parent, side);

            if self.arena[sibling].color.is_red() {
                debug!("Remove fixup at {parent:?}: red sibling {sibling:?}");
                self.arena[sibling].color = Color::Black;
                self.arena[parent].color = Color::Red;
                self.rotate(parent, side);
                continue;
            }

            let near = self.arena[sibling].child(side);
            let far = self.arena[sibling].child(side.opposite());

            if !self.is_red(near) && !self.is_red(far) {
                debug!("Remove fixup at {parent:?}: black sibling {sibling:?} with black children");
                let parent_color = self.arena[parent].color;
                self.arena[sibling].color = Color::Red;
                self.arena[parent].color = Color::Black;
                if parent_color.is_red() {
                    break;
                }
                // the whole subtree is now short, push the problem up
                match self.arena[parent].parent {
                    Some(grand) => {
                        side = self.side_of(grand, parent);
                        parent = grand;
                        continue;
                    }
                    None => break,
                }
            }

            let parent_color = self.arena[parent].color;
            let center = match (self.is_red(far), near) {
                (true, _) => {
                    debug!("Remove fixup at {parent:?}: far red child under {sibling:?}");
                    self.rotate(parent, side);
                    sibling
                }
                (false, Some(near)) => {
                    debug!("Remove fixup at {parent:?}: near red child {near:?} under {sibling:?}");
                    self.rotate(sibling, side.opposite());
                    self.rotate(parent, side);
                    near
                }
                (false, None) => unreachable!("sibling {sibling:?} has a red child"),
            };

            // whatever ended up in parent's old spot inherits its color
            let center = &mut self.arena[center];
            center.color = parent_color;
            let children = [center.left, center.right];
            for child in children.into_iter().flatten() {
                self.arena[child].color = Color::Black;
            }
            break;
        }
    }

    fn self_check(&self) {
        if cfg!(feature = "self_check") {
            if let Err(violation) = self.validate() {
                error!("Invariant check failed: {violation}");
                panic!("red-black tree invariant violated: {violation}");
            }
        }
    }
}

/// In-order iterator over the values of a [`Tree`].
pub struct Iter<'a, T> {
    next: Option<NodeRef<'a, T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.successor();
        Some(current.value())
    }
}

impl<'a, T, C: Comparator<T>> IntoIterator for &'a Tree<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, C: Comparator<T>> Extend<T> for Tree<T, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for Tree<T, Natural> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Tree::new();
        tree.extend(iter);
        tree
    }
}

impl<T: fmt::Debug, C: Comparator<T>> fmt::Debug for Tree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fmt::{Display, Write};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::test_util::init_logging;

    /// Pre-order dump of the tree shape: `value` + `R`/`B`, children in
    /// parentheses, `.` for an empty slot.
    fn render<T: Display, C: Comparator<T>>(tree: &Tree<T, C>) -> String {
        fn walk<T: Display>(node: Option<NodeRef<'_, T>>, out: &mut String) {
            let Some(node) = node else {
                out.push('.');
                return;
            };
            let color = match node.color() {
                Color::Red => 'R',
                Color::Black => 'B',
            };
            write!(out, "{}{color}", node.value()).unwrap();
            if node.left().is_some() || node.right().is_some() {
                out.push('(');
                walk(node.left(), out);
                out.push(',');
                walk(node.right(), out);
                out.push(')');
            }
        }
        let mut out = String::new();
        walk(tree.root(), &mut out);
        out
    }

    fn depth<T>(node: Option<NodeRef<'_, T>>) -> usize {
        match node {
            Some(node) => 1 + depth(node.left()).max(depth(node.right())),
            None => 0,
        }
    }

    fn build(values: &[i32]) -> Tree<i32> {
        let tree: Tree<i32> = values.iter().copied().collect();
        tree.validate().unwrap();
        tree
    }

    #[test]
    fn empty_tree() {
        let mut tree = Tree::<i32>::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.find(&1).is_none());
        assert!(tree.root().is_none());
        assert!(tree.first().is_none());
        assert_eq!(tree.remove_by_value(&1), None);
        assert_eq!(render(&tree), ".");
    }

    #[test]
    fn first_insert_is_black_root() {
        let mut tree = Tree::new();
        let id = tree.insert(7);
        let root = tree.root().unwrap();
        assert_eq!(root.id(), id);
        assert_eq!(root.color(), Color::Black);
        assert!(root.is_valid());
        assert!(root.parent().is_none());
    }

    #[test]
    fn insert_outer_right() {
        init_logging();
        // 10, 20, 30 ends up rotated left around 10
        let tree = build(&[10, 20, 30]);
        assert_eq!(render(&tree), "20B(10R,30R)");
        let root = tree.root().unwrap();
        assert_eq!(*root.value(), 20);
        assert_eq!(root.left().map(|n| *n.value()), Some(10));
        assert_eq!(root.right().map(|n| n.color()), Some(Color::Red));
    }

    #[test]
    fn insert_outer_left() {
        assert_eq!(render(&build(&[30, 20, 10])), "20B(10R,30R)");
    }

    #[test]
    fn insert_inner_children() {
        assert_eq!(render(&build(&[30, 10, 20])), "20B(10R,30R)");
        assert_eq!(render(&build(&[10, 30, 20])), "20B(10R,30R)");
    }

    #[test]
    fn insert_red_uncle_recolors() {
        let tree = build(&[20, 10, 30, 40]);
        assert_eq!(render(&tree), "20B(10B,30B(.,40R))");

        // the recolor moves the red up to 40, which sits under a black root
        let tree = build(&[10, 20, 30, 40, 50, 25]);
        assert_eq!(render(&tree), "20B(10B,40R(30B(25R,.),50B))");
    }

    #[test]
    fn insert_duplicate_is_noop() {
        let mut tree = build(&(1..=20).collect::<Vec<_>>());
        let before = render(&tree);
        let id = tree.find(&7).unwrap().id();

        assert_eq!(tree.insert(7), id);
        assert_eq!(tree.insert(7), id);
        assert_eq!(render(&tree), before);
        assert_eq!(tree.len(), 20);
    }

    #[test]
    fn duplicate_keeps_original_value() {
        let mut tree = Tree::with_comparator(|a: &(u32, &'static str), b: &(u32, &'static str)| a.0.cmp(&b.0));
        let id = tree.insert((1, "first"));
        assert_eq!(tree.insert((1, "second")), id);
        assert_eq!(tree.find(&(1, "")).map(|n| n.value().1), Some("first"));
    }

    #[test]
    #[should_panic(expected = "has no grandparent")]
    fn insert_fixup_rejects_red_root() {
        let mut tree = Tree::new();
        let root = tree.insert(1);
        let child = tree.insert(2);
        // corrupt the tree: two reds in a row with nothing above them
        tree.arena[root].color = Color::Red;
        tree.fix_after_insert(child);
    }

    #[test]
    #[cfg(feature = "self_check")]
    #[should_panic(expected = "invariant violated")]
    fn self_check_rejects_corrupted_tree() {
        init_logging();
        let mut tree = build(&[20, 10, 30]);
        let ten = tree.find(&10).unwrap().id();
        // 20B(10B,30R): the left path now has one black node too many
        tree.arena[ten].color = Color::Black;
        tree.insert(40);
    }

    #[test]
    fn rotations_keep_order_and_links() {
        let mut tree = build(&[20, 10, 30, 40]);
        let root = tree.root.unwrap();

        tree.rotate(root, Side::Left);
        assert_eq!(render(&tree), "30B(20B(10B,.),40R)");
        assert!(tree.iter().copied().eq([10, 20, 30, 40]));

        let new_root = tree.root.unwrap();
        assert_eq!(tree.arena[root].parent, Some(new_root));
        assert_eq!(tree.arena[new_root].parent, None);

        tree.rotate(new_root, Side::Right);
        assert_eq!(render(&tree), "20B(10B,30B(.,40R))");
        assert_eq!(tree.root, Some(root));
        tree.validate().unwrap();

        // nothing to lift
        let ten = tree.find(&10).unwrap().id();
        tree.rotate(ten, Side::Left);
        assert_eq!(render(&tree), "20B(10B,30B(.,40R))");
    }

    #[test]
    fn remove_internal_node_takes_successor() {
        init_logging();
        let mut tree = build(&[10, 20, 30, 40, 50, 25]);
        let twenty = tree.find(&20).unwrap().id();
        let twenty_five = tree.find(&25).unwrap().id();

        assert_eq!(tree.remove_by_value(&20), Some(20));
        tree.validate().unwrap();
        assert_eq!(render(&tree), "25B(10B,40R(30B,50B))");

        assert!(tree.find(&20).is_none());
        let found = tree.find(&25).unwrap();
        assert_eq!(found.id(), twenty);
        assert!(tree.get(twenty_five).is_none());
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn remove_red_leaf() {
        let mut tree = build(&[10, 20, 30]);
        assert_eq!(tree.remove_by_value(&10), Some(10));
        assert_eq!(render(&tree), "20B(.,30R)");
    }

    #[test]
    fn remove_black_node_over_red_leaf() {
        let mut tree = build(&[20, 10, 30, 40]);
        let thirty = tree.find(&30).unwrap().id();
        let forty = tree.find(&40).unwrap().id();

        assert_eq!(tree.remove(thirty), Some(30));
        assert_eq!(render(&tree), "20B(10B,40B)");
        assert!(tree.get(thirty).is_none());
        assert_eq!(tree.get(forty).map(|n| n.color()), Some(Color::Black));
        tree.validate().unwrap();
    }

    #[test]
    fn remove_black_leaf_black_sibling_black_parent() {
        let mut tree = build(&[20, 10, 30, 40]);
        tree.remove_by_value(&40);
        assert_eq!(render(&tree), "20B(10B,30B)");

        tree.remove_by_value(&10);
        assert_eq!(render(&tree), "20B(.,30R)");
        tree.validate().unwrap();
    }

    #[test]
    fn remove_black_leaf_black_sibling_red_parent() {
        let mut tree = build(&[10, 20, 30, 40, 50, 25]);
        tree.remove_by_value(&20);
        assert_eq!(render(&tree), "25B(10B,40R(30B,50B))");

        tree.remove_by_value(&30);
        assert_eq!(render(&tree), "25B(10B,40B(.,50R))");
        tree.validate().unwrap();
    }

    #[test]
    fn remove_black_leaf_far_red_nephew() {
        let mut tree = build(&[20, 10, 30, 40]);
        tree.remove_by_value(&10);
        assert_eq!(render(&tree), "30B(20B,40B)");
        tree.validate().unwrap();
    }

    #[test]
    fn remove_black_leaf_near_red_nephew() {
        let mut tree = build(&[20, 10, 30, 25]);
        assert_eq!(render(&tree), "20B(10B,30B(25R,.))");
        tree.remove_by_value(&10);
        assert_eq!(render(&tree), "25B(20B,30B)");
        tree.validate().unwrap();
    }

    #[test]
    fn remove_black_leaf_red_sibling() {
        let mut tree = build(&[10, 20, 30, 40, 50, 60]);
        assert_eq!(render(&tree), "20B(10B,40R(30B,50B(.,60R)))");
        tree.remove_by_value(&10);
        assert_eq!(render(&tree), "40B(20B(.,30R),50B(.,60R))");
        tree.validate().unwrap();
    }

    #[test]
    fn remove_root_whose_successor_has_a_child() {
        let mut tree = build(&[20, 10, 30, 40]);
        let root = tree.root().unwrap().id();
        assert_eq!(tree.remove(root), Some(20));
        assert_eq!(render(&tree), "30B(10B,40B)");
        assert_eq!(tree.root().unwrap().id(), root);
    }

    #[test]
    fn remove_last_node() {
        let mut tree = build(&[1]);
        let id = tree.root().unwrap().id();
        assert_eq!(tree.remove(id), Some(1));
        assert!(tree.is_empty());
        assert_eq!(tree.validate(), Ok(0));
        assert_eq!(tree.remove(id), None);
    }

    #[test]
    fn remove_missing_value_is_noop() {
        let mut tree = build(&[1, 2, 3]);
        let before = render(&tree);
        assert_eq!(tree.remove_by_value(&4), None);
        assert_eq!(render(&tree), before);
    }

    #[test]
    fn insert_then_remove_restores_shape() {
        let mut tree = Tree::new();
        tree.insert(5);
        tree.remove_by_value(&5);
        assert_eq!(render(&tree), ".");

        let mut tree = build(&[20, 10, 30, 40]);
        tree.remove_by_value(&40);
        let before = render(&tree);
        tree.insert(25);
        assert_ne!(render(&tree), before);
        tree.remove_by_value(&25);
        assert_eq!(render(&tree), before);
    }

    #[test]
    fn stale_handles() {
        let mut tree = build(&[1, 2, 3]);
        let three = tree.find(&3).unwrap().id();
        tree.remove_by_value(&3);
        assert!(tree.get(three).is_none());
        assert_eq!(tree.remove(three), None);

        // the freed slot gets reused, the old handle must still not resolve
        let four = tree.insert(4);
        assert_ne!(four, three);
        assert!(tree.get(three).is_none());
        assert_eq!(tree.get(four).map(|n| *n.value()), Some(4));
    }

    #[test]
    fn navigation() {
        let tree: Tree<i32> = (0..100).step_by(3).collect();
        tree.validate().unwrap();

        let mut forward = Vec::new();
        let mut node = tree.first();
        while let Some(n) = node {
            forward.push(*n.value());
            node = n.successor();
        }
        assert_eq!(forward, (0..100).step_by(3).collect::<Vec<_>>());

        let mut backward = Vec::new();
        let mut node = tree.last();
        while let Some(n) = node {
            backward.push(*n.value());
            node = n.predecessor();
        }
        backward.reverse();
        assert_eq!(backward, forward);

        assert!(tree.first().unwrap().predecessor().is_none());
        assert!(tree.last().unwrap().successor().is_none());

        assert!(tree.find(&50).is_none());
        let found = tree.find(&51).unwrap();
        assert_eq!(found.predecessor().map(|n| *n.value()), Some(48));
        assert_eq!(found.successor().map(|n| *n.value()), Some(54));
    }

    #[test]
    fn custom_order() {
        let mut tree = Tree::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        tree.extend(1..=10);
        tree.validate().unwrap();
        assert!(tree.iter().copied().eq((1..=10).rev()));
        assert_eq!(tree.first().map(|n| *n.value()), Some(10));
    }

    #[test]
    fn clear_invalidates_handles() {
        let mut tree = build(&[1, 2, 3, 4]);
        let ids: Vec<_> = (1..=4).map(|v| tree.find(&v).unwrap().id()).collect();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.validate(), Ok(0));
        assert!(ids.iter().all(|&id| tree.get(id).is_none()));

        tree.extend([5, 6]);
        assert!(ids.iter().all(|&id| tree.get(id).is_none()));
        assert_eq!(format!("{tree:?}"), "{5, 6}");
    }

    #[test]
    fn sequential_inserts_stay_shallow() {
        const N: i32 = 1000;
        let mut tree = Tree::new();
        for i in 0..N {
            tree.insert(i);
            tree.validate().unwrap();
        }
        // a red-black tree with n nodes is at most 2*log2(n+1) deep
        let bound = 2.0 * ((N + 1) as f64).log2();
        assert!(depth(tree.root()) as f64 <= bound);

        for i in (0..N).rev() {
            assert_eq!(tree.remove_by_value(&i), Some(i));
            tree.validate().unwrap();
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn randomized_operations_keep_invariants() {
        init_logging();
        const TREES: u64 = 5;
        const MIN: i32 = -100;
        const MAX: i32 = 100;

        for seed in 0..TREES {
            let mut rng = StdRng::seed_from_u64(0x5eed + seed);
            let mut tree = Tree::new();
            let mut model = BTreeSet::new();
            let ops = rng.gen_range(6000..12000);

            for step in 0..ops {
                let value = rng.gen_range(MIN..MAX);
                match rng.gen_range(0..4) {
                    0 => {
                        let id = tree.insert(value);
                        assert_eq!(tree.get(id).map(|n| *n.value()), Some(value));
                        model.insert(value);
                    }
                    1 => assert_eq!(tree.remove_by_value(&value), model.take(&value)),
                    2 => {
                        let id = tree.find(&value).map(|n| n.id());
                        let removed = id.and_then(|id| tree.remove(id));
                        assert_eq!(removed, model.take(&value));
                    }
                    _ => {
                        let found = tree.find(&value);
                        assert_eq!(found.map(|n| *n.value()), model.get(&value).copied());
                    }
                }

                if let Err(violation) = tree.validate() {
                    panic!("seed {seed}, step {step}: {violation}");
                }
                assert_eq!(tree.len(), model.len());
            }

            assert!(tree.iter().eq(model.iter()));
            debug!("tree {seed} done after {ops} operations, {} values left", tree.len());
        }
    }
}
