use core::fmt;
use core::iter::FusedIterator;
use std::borrow::Borrow;
use std::mem;

use log::{debug, trace, warn};

use crate::arena::Arena;
use crate::{Error, NodeHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

impl Color {
    /// Returns `true` if the color is [`Red`].
    ///
    /// [`Red`]: Color::Red
    #[must_use]
    fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }

    /// Returns `true` if the color is [`Black`].
    ///
    /// [`Black`]: Color::Black
    #[must_use]
    fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }
}

struct Node<K> {
    key: K,
    color: Color,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// Position of a node relative to its parent, carrying the parent's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodePos {
    Root,
    Left(usize),
    Right(usize),
}

/// A red-black tree based ordered multiset.
///
/// Equal keys may be inserted any number of times, each insertion creates a
/// new node and returns a [`NodeHandle`] to it. Among equal keys the relative
/// order is not specified, they only cluster together in the in-order sequence.
pub struct RedBlackTree<K> {
    // INVARIANTS:
    //  * `root` is `None` iff `nodes` is empty
    //  * the root has no parent and is black
    //  * a red node has no red children
    //  * all paths from a node down to an empty link have the same number of black nodes
    root: Option<usize>,
    nodes: Arena<Node<K>>,
}

impl<K> Default for RedBlackTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for RedBlackTree<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct NodeDebug<'a, K> {
            tree: &'a RedBlackTree<K>,
            index: usize,
        }

        impl<K> fmt::Debug for NodeDebug<'_, K>
        where
            K: fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let node = &self.tree.nodes[self.index];
                let key_of = |link: Option<usize>| link.map(|x| &self.tree.nodes[x].key);
                f.debug_struct("Node")
                    .field("key", &node.key)
                    .field("color", &node.color)
                    .field("parent", &key_of(node.parent))
                    .field("left", &key_of(node.left))
                    .field("right", &key_of(node.right))
                    .finish()
            }
        }

        struct TreeDebug<'a, K> {
            tree: &'a RedBlackTree<K>,
        }

        impl<K> fmt::Debug for TreeDebug<'_, K>
        where
            K: fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut f = f.debug_list();
                let mut next = self.tree.root.map(|root| self.tree.min_of(root));
                while let Some(index) = next {
                    f.entry(&NodeDebug {
                        tree: self.tree,
                        index,
                    });
                    next = self.tree.successor_core(index);
                }
                f.finish()
            }
        }

        f.debug_struct("RedBlackTree")
            .field("len", &self.len())
            .field("root", &self.root.map(|x| &self.nodes[x].key))
            .field("nodes", &TreeDebug { tree: self })
            .finish()
    }
}

impl<K> RedBlackTree<K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty tree with storage for at least `cap` nodes.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            root: None,
            nodes: Arena::with_capacity(cap),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Tears down the tree. Same as dropping it.
    pub fn destroy(mut self) {
        self.clear();
    }

    /// Removes every node, children before their parents.
    ///
    /// All handles previously returned by this tree become invalid.
    pub fn clear(&mut self) {
        trace!("clearing tree with {} nodes", self.len());

        // Walk down to a leaf, release it and continue from its parent.
        // The parent links make an explicit stack unnecessary.
        let mut next = self.root.take();
        while let Some(node) = next {
            match (self.left(node), self.right(node)) {
                (Some(child), _) | (None, Some(child)) => next = Some(child),
                (None, None) => {
                    let parent = self.parent(node);
                    match self.pos(node) {
                        NodePos::Root => {}
                        NodePos::Left(p) => self.set_left(p, None),
                        NodePos::Right(p) => self.set_right(p, None),
                    }
                    self.nodes.remove(node);
                    next = parent;
                }
            }
        }

        debug_assert_eq!(self.len(), 0);
    }

    /// Returns the key of the node `handle` refers to.
    pub fn key(&self, handle: NodeHandle) -> Result<&K, Error> {
        let node = self.resolve(handle)?;
        Ok(&self.nodes[node].key)
    }

    /// Returns `true` if `handle` refers to a node currently in this tree.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.resolve(handle).is_some()
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            tree: self,
            next: self.root.map(|root| self.min_of(root)),
            remaining: self.len(),
        }
    }

    pub fn inorder_for_each<F>(&self, f: F)
    where
        F: FnMut(&K),
    {
        self.iter().for_each(f)
    }

    /// Copies up to `buf.len()` smallest keys into `buf` in ascending order
    /// and returns how many were written.
    pub fn to_ordered_array(&self, buf: &mut [K]) -> usize
    where
        K: Clone,
    {
        let mut count = 0;
        for (slot, key) in buf.iter_mut().zip(self.iter()) {
            slot.clone_from(key);
            count += 1;
        }
        count
    }

    /// Collects up to `capacity` smallest keys in ascending order.
    pub fn to_vec(&self, capacity: usize) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().take(capacity).cloned().collect()
    }

    /// Finds a node with a key equal to `key`.
    ///
    /// If several nodes hold an equal key, the one closest to the root is
    /// returned, which is not necessarily the one inserted first.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeHandle>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_raw(key).map(|node| self.nodes.handle(node))
    }

    fn find_raw<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut x = self.root;
        while let Some(node) = x {
            match key.cmp(self.nodes[node].key.borrow()) {
                std::cmp::Ordering::Less => x = self.left(node),
                std::cmp::Ordering::Equal => return Some(node),
                std::cmp::Ordering::Greater => x = self.right(node),
            }
        }

        None
    }

    pub fn min(&self) -> Option<NodeHandle> {
        self.root
            .map(|root| self.nodes.handle(self.min_of(root)))
    }

    fn min_of(&self, root: usize) -> usize {
        let mut x = root;
        while let Some(left) = self.left(x) {
            x = left;
        }

        x
    }

    pub fn max(&self) -> Option<NodeHandle> {
        self.root
            .map(|root| self.nodes.handle(self.max_of(root)))
    }

    fn max_of(&self, root: usize) -> usize {
        let mut x = root;
        while let Some(right) = self.right(x) {
            x = right;
        }

        x
    }

    /// Returns the node that follows `handle` in the in-order sequence.
    pub fn successor(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, Error> {
        let node = self.resolve(handle)?;
        Ok(self.successor_core(node).map(|x| self.nodes.handle(x)))
    }

    fn successor_core(&self, mut node: usize) -> Option<usize> {
        //       +---------- 34 ---------+
        //       |                       |
        // +---- 2 ----+                 58 ----+
        // |           |                        |
        // 1      +--- 9 ----+              +-- 77 --+
        //        |          |              |        |
        //     +- 6       +- 20 -+      +- 71 -+     82
        //     |          |      |      |      |
        //     5         12 -+   24    67      75
        //                   |
        //                   13

        match self.right(node) {
            // 9 -> 12, 2 -> 5, 58 -> 67 ...
            // Everything in the right subtree is >= node and smaller than any
            // ancestor node is a left descendant of, so the successor is its minimum.
            Some(right) => Some(self.min_of(right)),
            None => {
                // 6 -> 9, 1 -> 2, 13 -> 20, 24 -> 34 ...
                // Move up until we leave a left subtree, that parent is the successor.
                let mut node_parent = self.parent(node);
                while let Some(parent) = node_parent {
                    if self.left(parent) == Some(node) {
                        break;
                    }
                    node = parent;
                    node_parent = self.parent(node);
                }

                node_parent
            }
        }
    }

    /// Returns the node that precedes `handle` in the in-order sequence.
    pub fn predecessor(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, Error> {
        let node = self.resolve(handle)?;
        Ok(self.predecessor_core(node).map(|x| self.nodes.handle(x)))
    }

    fn predecessor_core(&self, mut node: usize) -> Option<usize> {
        match self.left(node) {
            // 2 -> 1, 9 -> 6, 20 -> 13, 77 -> 75
            Some(left) => Some(self.max_of(left)),
            None => {
                // 12 -> 9, 58 -> 34, 67 -> 58
                let mut node_parent = self.parent(node);
                while let Some(parent) = node_parent {
                    if self.right(parent) == Some(node) {
                        break;
                    }
                    node = parent;
                    node_parent = self.parent(node);
                }

                node_parent
            }
        }
    }

    fn rotate_left(&mut self, node: usize) {
        //    p                       p
        //    |                       |
        // +-node-+               +-right-+
        // |      |      -->      |       |
        // a  +-right-+       +-node-+    c
        //    |       |       |      |
        //    b       c       a      b
        // where a, b, c can be any subtrees
        let Some(right) = self.right(node) else {
            return;
        };

        // attach b to node
        let b = self.left(right);
        self.set_right(node, b);
        if let Some(b) = b {
            self.set_parent(b, Some(node));
        }

        // attach right to parent
        let parent = self.parent(node);
        self.set_parent(right, parent);
        match self.pos(node) {
            NodePos::Root => self.root = Some(right),
            NodePos::Left(p) => self.set_left(p, Some(right)),
            NodePos::Right(p) => self.set_right(p, Some(right)),
        }

        // attach node to right
        self.set_left(right, Some(node));
        self.set_parent(node, Some(right));
    }

    fn rotate_right(&mut self, node: usize) {
        //         p              p
        //         |              |
        //     +-node-+       +-left-+
        //     |      |       |      |
        // +-left-+   c  -->  a  +-node-+
        // |      |              |      |
        // a      b              b      c
        // where a, b, c can be any subtrees
        let Some(left) = self.left(node) else {
            return;
        };

        // attach b to node
        let b = self.right(left);
        self.set_left(node, b);
        if let Some(b) = b {
            self.set_parent(b, Some(node));
        }

        // attach left to parent
        let parent = self.parent(node);
        self.set_parent(left, parent);
        match self.pos(node) {
            NodePos::Root => self.root = Some(left),
            NodePos::Left(p) => self.set_left(p, Some(left)),
            NodePos::Right(p) => self.set_right(p, Some(left)),
        }

        // attach node to left
        self.set_right(left, Some(node));
        self.set_parent(node, Some(left));
    }

    /// Inserts `key` and returns a handle to the new node.
    ///
    /// # Panics
    ///
    /// If storage for the node cannot be allocated, see [`try_insert`].
    ///
    /// [`try_insert`]: RedBlackTree::try_insert
    pub fn insert(&mut self, key: K) -> NodeHandle
    where
        K: Ord,
    {
        match self.try_insert(key) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    /// Inserts `key` and returns a handle to the new node.
    ///
    /// Keys equal to an existing one are placed to its right. On allocation
    /// failure the tree is left exactly as it was.
    pub fn try_insert(&mut self, key: K) -> Result<NodeHandle, Error>
    where
        K: Ord,
    {
        // Move left/right down the tree until we find empty slot
        let mut parent = None;
        let mut go_left = false;
        let mut maybe_node = self.root;
        while let Some(node) = maybe_node {
            parent = maybe_node;
            go_left = key < self.nodes[node].key;
            maybe_node = if go_left {
                self.left(node)
            } else {
                self.right(node)
            };
        }

        let new_node = self
            .nodes
            .try_insert(Node {
                key,
                color: Color::Red,
                parent,
                left: None,
                right: None,
            })
            .inspect_err(|err| warn!("insert failed: {err}"))?;

        // update parent to point to the new node
        match parent {
            Some(parent) if go_left => self.set_left(parent, Some(new_node)),
            Some(parent) => self.set_right(parent, Some(new_node)),
            None => self.root = Some(new_node),
        }

        self.insert_fixup(new_node);

        let handle = self.nodes.handle(new_node);
        trace!("inserted {handle:?}, len {}", self.len());
        Ok(handle)
    }

    fn insert_fixup(&mut self, new_node: usize) {
        let mut node = new_node;
        loop {
            let mut parent = match self.parent(node) {
                Some(parent) if self.color(parent).is_red() => parent,
                _ => break,
            };
            debug_assert!(self.color(node).is_red());
            // Red parent has a red child. This is the only violation: at first
            // it's the new node and its parent, after a "red uncle" step it's
            // the grand parent and its parent.

            match self.pos(parent) {
                // the root is black, a red parent always has a parent itself
                NodePos::Root => unreachable!("red root"),
                NodePos::Left(grand_parent) => {
                    debug_assert!(self.color(grand_parent).is_black());
                    match self.right(grand_parent) {
                        Some(uncle) if self.color(uncle).is_red() => {
                            //     +--- gp:b ---+               +--- gp:r ---+
                            //     |            |               |            |
                            //  + p:r +      + u:r +   -->   + p:b +      + u:b +
                            //  |     |      |     |         |     |      |     |
                            // n:r   a:b    b:b   c:b       n:r   a:b    b:b   c:b
                            //
                            // Black height stays the same. The grand parent may now
                            // have a red parent, repeat as if it was the new node.
                            self.set_color(parent, Color::Black);
                            self.set_color(uncle, Color::Black);
                            self.set_color(grand_parent, Color::Red);
                            node = grand_parent;
                        }
                        _ => {
                            if let NodePos::Right(_) = self.pos(node) {
                                //       +-- gp:b --+                 +-- gp:b --+
                                //       |          |                 |          |
                                //  +-- p:r --+    u:b  -->       +- n:r --+    u:b
                                //  |         |                   |        |
                                // a:b    +- n:r -+           +- p:r -+   c:b
                                //        |       |           |       |
                                //       b:b     c:b         a:b     b:b
                                self.rotate_left(parent);
                                mem::swap(&mut parent, &mut node);
                            }

                            //           +-- gp:b --+            +----- p:b -----+
                            //           |          |            |               |
                            //      +-- p:r --+    u:b  -->   +- n:r -+     +- gp:r -+
                            //      |         |               |       |     |        |
                            //  +- n:r -+    c:b             a:b     b:b   c:b      u:b
                            //  |       |
                            // a:b     b:b
                            //
                            // parent of node is black afterwards, the loop ends
                            self.set_color(parent, Color::Black);
                            self.set_color(grand_parent, Color::Red);
                            self.rotate_right(grand_parent);
                        }
                    }
                }
                NodePos::Right(grand_parent) => {
                    // same as Left branch but left/right are switched
                    match self.left(grand_parent) {
                        Some(uncle) if self.color(uncle).is_red() => {
                            self.set_color(parent, Color::Black);
                            self.set_color(uncle, Color::Black);
                            self.set_color(grand_parent, Color::Red);
                            node = grand_parent;
                        }
                        _ => {
                            if let NodePos::Left(_) = self.pos(node) {
                                self.rotate_right(parent);
                                mem::swap(&mut parent, &mut node);
                            }

                            self.set_color(parent, Color::Black);
                            self.set_color(grand_parent, Color::Red);
                            self.rotate_left(grand_parent);
                        }
                    }
                }
            }
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    /// Removes the node `handle` refers to and returns its key.
    ///
    /// Fails with [`Error::InvalidHandle`] without touching the tree if the
    /// node was already erased or belongs to another tree.
    pub fn erase(&mut self, handle: NodeHandle) -> Result<K, Error> {
        let node = self.resolve(handle)?;
        let key = self.delete_core(node);
        trace!("erased {handle:?}, len {}", self.len());
        Ok(key)
    }

    fn delete_core(&mut self, node: usize) -> K {
        //       ┌────────── 34 ─────────┐
        //       │                       │
        // ┌──── 2 ────┐                 58 ────┐
        // │           │                        │
        // 1      ┌─── 9 ────┐              ┌── 77 ──┐
        //        │          │              │        │
        //     ┌─ 6       ┌─ 20 ─┐      ┌─ 71 ─┐     82
        //     │          │      │      │      │
        //     5         12 ─┐   24    67      75
        //                   │
        //                   13

        let mut to_remove_orig_color = self.color(node);
        // Node that moves into the position of the removed one. It may be
        // empty, so its parent is tracked separately.
        let replacement: Option<usize>;
        let replacement_parent: Option<usize>;
        match (self.left(node), self.right(node)) {
            (None, v @ Some(_)) | (v @ Some(_), None) | (None, v @ None) => {
                // `node` has no children or only one.
                // Replace `node` with its child or nothing.
                // For example remove 1, 6, 12, 58 from tree above
                replacement_parent = self.parent(node);
                self.replace_subtree(node, v);
                replacement = v;
            }
            (Some(left), Some(right)) => {
                // Replace `node` with its successor, the minimum of its right
                // subtree. The successor has no left child.
                let to_remove = self.min_of(right);
                to_remove_orig_color = self.color(to_remove);
                replacement = self.right(to_remove);

                // Two cases:
                //  a) `min` is the right child of `node`, it simply takes the
                //     place of `node`, for example remove 20, 75, 77 from tree above
                //  b) otherwise `min` is first replaced by its own right child,
                //     for example remove 9 from tree above, min will be 12
                if to_remove == right {
                    replacement_parent = Some(to_remove);
                } else {
                    // b)
                    replacement_parent = self.parent(to_remove);
                    self.replace_subtree(to_remove, replacement);
                    self.set_right(to_remove, Some(right));
                    self.set_parent(right, Some(to_remove));
                }
                self.replace_subtree(node, Some(to_remove));
                self.set_left(to_remove, Some(left));
                self.set_parent(left, Some(to_remove));
                self.set_color(to_remove, self.color(node));
            }
        }

        // Removing a red node never changes black heights
        if to_remove_orig_color.is_black() {
            self.delete_fixup(replacement, replacement_parent);
        }

        self.nodes.remove(node).key
    }

    fn delete_fixup(&mut self, mut x: Option<usize>, mut x_parent: Option<usize>) {
        // x points to the place where we removed a black node.
        //
        // If x is red we simply color it black after the loop. If x is the
        // root there is nothing to balance. Otherwise x is "doubly black":
        // all paths through x lack one black node.
        //
        // x must have a sibling. The black height from x.parent through x is at
        // least 1 (x itself counted double), so an empty sibling would violate
        // the equal black height property, which still holds for the rest of the tree.
        while let Some(parent) = x_parent {
            if self.color_of(x).is_red() {
                break;
            }

            if self.left(parent) == x {
                let mut sibling = self.expect_node(self.right(parent));
                if self.color(sibling).is_red() {
                    // case 1
                    //
                    //     ┌─── p:b ───┐                ┌─── p:r ───┐                    ┌─── s:b ───┐
                    //     │           │                │           │                    │           │
                    // ┌─ x:b ─┐   ┌─ s:r ─┐   ──►  ┌─ x:b ─┐   ┌─ s:b ─┐   ──►      ┌─ p:r ─┐      d:b
                    // │       │   │       │        │       │   │       │            │       │
                    // a       b  c:b     d:b       a       b  c:b     d:b       ┌─ x:b ─┐  c:b
                    //                                                           │       │
                    //                                                           a       b
                    // Turns into case 2, 3 or 4 with x having a red parent.
                    debug_assert!(self.color(parent).is_black());
                    self.set_color(sibling, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_left(parent);
                    sibling = self.expect_node(self.right(parent));
                }

                let near = self.left(sibling);
                let far = self.right(sibling);
                if self.color_of(near).is_black() && self.color_of(far).is_black() {
                    // case 2
                    // Move the extra black up to the parent.
                    //
                    //     ┌─── p:c ───┐                ┌─── p:c ───┐
                    //     │           │                │           │
                    // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ s:r ─┐
                    // │       │   │       │        │       │   │       │
                    // a       b  c:b     d:b       a       b  c:b     d:b
                    self.set_color(sibling, Color::Red);
                    x = Some(parent);
                    x_parent = self.parent(parent);
                } else {
                    if self.color_of(far).is_black() {
                        // case 3, near child is red
                        //
                        //    ┌───── p:c ─────┐                ┌─── p:c ───┐
                        //    │               │                │           │
                        // ┌─ x:b ─┐      ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ c:b ─┐
                        // │       │      │       │        │       │   │       │
                        // a       b  ┌─ c:r ─┐  d:b       a       b   e   ┌─ s:r ─┐
                        //            │       │                            │       │
                        //            e       f                            f      d:b
                        self.set_color(self.expect_node(near), Color::Black);
                        self.set_color(sibling, Color::Red);
                        self.rotate_right(sibling);
                        sibling = self.expect_node(self.right(parent));
                    }

                    // case 4, far child is red
                    //
                    //     ┌─── p:c ───┐                     ┌── s:c ──┐
                    //     │           │                     │         │
                    // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►       ┌─ p:b ─┐    d:b
                    // │       │   │       │             │       │
                    // a       b  c:?     d:r       ┌─ x:b ─┐   c:?
                    //
                    // Paths through x gain the missing black node, paths through d
                    // keep theirs by coloring d black. This ends the loop.
                    self.set_color(sibling, self.color(parent));
                    self.set_color(parent, Color::Black);
                    let far = self.expect_node(self.right(sibling));
                    self.set_color(far, Color::Black);
                    self.rotate_left(parent);
                    x = self.root;
                    x_parent = None;
                }
            } else {
                // same as above but left/right are switched
                let mut sibling = self.expect_node(self.left(parent));
                if self.color(sibling).is_red() {
                    self.set_color(sibling, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_right(parent);
                    sibling = self.expect_node(self.left(parent));
                }

                let near = self.right(sibling);
                let far = self.left(sibling);
                if self.color_of(near).is_black() && self.color_of(far).is_black() {
                    self.set_color(sibling, Color::Red);
                    x = Some(parent);
                    x_parent = self.parent(parent);
                } else {
                    if self.color_of(far).is_black() {
                        self.set_color(self.expect_node(near), Color::Black);
                        self.set_color(sibling, Color::Red);
                        self.rotate_left(sibling);
                        sibling = self.expect_node(self.left(parent));
                    }

                    self.set_color(sibling, self.color(parent));
                    self.set_color(parent, Color::Black);
                    let far = self.expect_node(self.left(sibling));
                    self.set_color(far, Color::Black);
                    self.rotate_right(parent);
                    x = self.root;
                    x_parent = None;
                }
            }
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }

    /// Replaces subtree `old` with subtree `new`
    fn replace_subtree(&mut self, old: usize, new: Option<usize>) {
        // a) make the parent of `old` point to `new`, or make `new` the root
        // b) make `new` point to the parent of `old`
        let parent = self.parent(old);
        match self.pos(old) {
            NodePos::Root => self.root = new,
            NodePos::Left(p) => self.set_left(p, new),
            NodePos::Right(p) => self.set_right(p, new),
        }

        if let Some(new) = new {
            self.set_parent(new, parent);
        }
    }

    fn resolve(&self, handle: NodeHandle) -> Result<usize, Error> {
        self.nodes.resolve(handle).ok_or_else(|| {
            debug!("rejected {handle:?}");
            Error::InvalidHandle
        })
    }

    /// Unwraps a link that the black height property guarantees to be non-empty.
    #[inline]
    fn expect_node(&self, link: Option<usize>) -> usize {
        match link {
            Some(x) => x,
            None => unreachable!("black height violated, expected a node"),
        }
    }

    #[inline]
    fn pos(&self, node: usize) -> NodePos {
        match self.parent(node) {
            Some(p) if self.left(p) == Some(node) => NodePos::Left(p),
            Some(p) => {
                debug_assert_eq!(self.right(p), Some(node));
                NodePos::Right(p)
            }
            None => NodePos::Root,
        }
    }

    #[inline]
    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }

    #[inline]
    fn set_parent(&mut self, node: usize, new_parent: Option<usize>) {
        self.nodes[node].parent = new_parent;
    }

    #[inline]
    fn left(&self, node: usize) -> Option<usize> {
        self.nodes[node].left
    }

    #[inline]
    fn set_left(&mut self, node: usize, new_left: Option<usize>) {
        self.nodes[node].left = new_left;
    }

    #[inline]
    fn right(&self, node: usize) -> Option<usize> {
        self.nodes[node].right
    }

    #[inline]
    fn set_right(&mut self, node: usize, new_right: Option<usize>) {
        self.nodes[node].right = new_right;
    }

    #[inline]
    fn color(&self, node: usize) -> Color {
        self.nodes[node].color
    }

    /// Empty links count as black leaves.
    #[inline]
    fn color_of(&self, link: Option<usize>) -> Color {
        link.map_or(Color::Black, |x| self.color(x))
    }

    #[inline]
    fn set_color(&mut self, node: usize, new_color: Color) {
        self.nodes[node].color = new_color;
    }
}

impl<K: Ord> Extend<K> for RedBlackTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for RedBlackTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<'a, K> IntoIterator for &'a RedBlackTree<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over the keys of a [`RedBlackTree`].
pub struct Iter<'a, K> {
    tree: &'a RedBlackTree<K>,
    next: Option<usize>,
    remaining: usize,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = self.tree.successor_core(node);
        self.remaining -= 1;
        Some(&self.tree.nodes[node].key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}
