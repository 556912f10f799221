//! Arena-backed record tree.
//!
//! Every record id owns exactly one [`TreeNode`] slot in the arena; parents and
//! the synthetic root refer to children by arena [`Index`], so a node linked
//! from several places is still one shared node. Records without a readable id
//! get a slot keyed by their input position.

use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use indexmap::IndexMap;
use termtree::Tree as TermTree;
use tracing::instrument;

use crate::domain::entities::RecordId;

/// Registry key of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// Record with a readable id
    Id(RecordId),
    /// Record without one, keyed by its input position
    Unkeyed(usize),
}

impl NodeKey {
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            NodeKey::Id(id) => Some(id),
            NodeKey::Unkeyed(_) => None,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Id(id) => write!(f, "{}", id),
            NodeKey::Unkeyed(index) => write!(f, "#{}", index),
        }
    }
}

/// Tree node in the arena.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Record id, None for the synthetic root and for id-less records
    pub id: Option<RecordId>,
    /// Input position of the record that last wrote this node, None for the
    /// root and for parents that were referenced but never seen
    pub index: Option<usize>,
    /// Children keyed by node key, in first-encountered order
    pub children: IndexMap<NodeKey, Index>,
}

impl TreeNode {
    fn empty(id: Option<RecordId>) -> Self {
        Self {
            id,
            index: None,
            children: IndexMap::new(),
        }
    }
}

/// One step of a depth-first walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub idx: Index,
    pub node: &'a TreeNode,
    /// Distance from the synthetic root; top-level nodes have depth 0
    pub depth: usize,
}

/// Record tree: arena storage, id registry and the synthetic root.
#[derive(Debug, Clone)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    registry: HashMap<NodeKey, Index>,
    root: Index,
    filter: Option<RecordId>,
}

impl TreeArena {
    pub(crate) fn new(filter: Option<RecordId>) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode::empty(None));
        Self {
            arena,
            registry: HashMap::new(),
            root,
            filter,
        }
    }

    /// Registry slot for `key`, created empty if the key was not seen yet.
    pub(crate) fn ensure(&mut self, key: &NodeKey) -> Index {
        if let Some(&idx) = self.registry.get(key) {
            return idx;
        }
        let idx = self.arena.insert(TreeNode::empty(key.id().cloned()));
        self.registry.insert(key.clone(), idx);
        idx
    }

    /// Point the node for `key` at the record at `index`; last write wins.
    pub(crate) fn upsert(&mut self, key: &NodeKey, index: usize) -> Index {
        let idx = self.ensure(key);
        if let Some(node) = self.arena.get_mut(idx) {
            node.index = Some(index);
        }
        idx
    }

    /// Link `child` under `parent`. Re-linking an existing key keeps its position.
    pub(crate) fn attach(&mut self, parent: Index, key: &NodeKey, child: Index) {
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.insert(key.clone(), child);
        }
    }

    pub fn root(&self) -> Index {
        self.root
    }

    /// Parent id this tree was filtered on, None for a full tree.
    pub fn filter(&self) -> Option<&RecordId> {
        self.filter.as_ref()
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    /// Registry lookup; the node may exist without being reachable from the root.
    pub fn lookup(&self, id: &RecordId) -> Option<Index> {
        self.registry.get(&NodeKey::Id(id.clone())).copied()
    }

    /// Number of registered nodes, reachable or not.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Depth-first, parent-before-children walk below the synthetic root.
    ///
    /// Each node is yielded at most once, even when it is linked under
    /// several parents or through a cycle.
    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    /// Number of levels below the synthetic root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.iter().map(|visit| visit.depth + 1).max().unwrap_or(0)
    }

    /// Ids of reachable nodes without children, in walk order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_ids(&self) -> Vec<RecordId> {
        self.iter()
            .filter(|visit| visit.node.children.is_empty())
            .filter_map(|visit| visit.node.id.clone())
            .collect()
    }

    /// Render the reachable tree; repeated ids along a path are cut.
    pub fn to_termtree<F>(&self, label: F) -> TermTree<String>
    where
        F: Fn(Index, &TreeNode) -> String,
    {
        fn build<F: Fn(Index, &TreeNode) -> String>(
            tree: &TreeArena,
            idx: Index,
            label: &F,
            path: &mut HashSet<Index>,
            parent: &mut TermTree<String>,
        ) {
            let Some(node) = tree.get_node(idx) else {
                return;
            };
            for &child_idx in node.children.values() {
                if !path.insert(child_idx) {
                    continue;
                }
                if let Some(child) = tree.get_node(child_idx) {
                    let mut child_tree = TermTree::new(label(child_idx, child));
                    build(tree, child_idx, label, path, &mut child_tree);
                    parent.push(child_tree);
                }
                path.remove(&child_idx);
            }
        }

        let caption = match &self.filter {
            Some(id) => format!("children of {}", id),
            None => ".".to_string(),
        };
        let mut tree = TermTree::new(caption);
        let mut path = HashSet::new();
        build(self, self.root, &label, &mut path, &mut tree);
        tree
    }
}

pub struct PreOrderIterator<'a> {
    tree: &'a TreeArena,
    stack: Vec<(Index, usize)>,
    visited: HashSet<Index>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(tree: &'a TreeArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.get_node(tree.root()) {
            // Push children in reverse order for left-to-right traversal
            for &child in root.children.values().rev() {
                stack.push((child, 0));
            }
        }
        Self {
            tree,
            stack,
            visited: HashSet::new(),
        }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((idx, depth)) = self.stack.pop() {
            if !self.visited.insert(idx) {
                continue;
            }
            if let Some(node) = self.tree.get_node(idx) {
                for &child in node.children.values().rev() {
                    self.stack.push((child, depth + 1));
                }
                return Some(Visit { idx, node, depth });
            }
        }
        None
    }
}

/// A tree paired with the records its nodes point into.
pub struct TreeView<'a, R> {
    tree: &'a TreeArena,
    records: &'a [R],
}

impl<R> Clone for TreeView<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for TreeView<'_, R> {}

impl<'a, R> TreeView<'a, R> {
    pub(crate) fn new(tree: &'a TreeArena, records: &'a [R]) -> Self {
        Self { tree, records }
    }

    pub fn arena(&self) -> &'a TreeArena {
        self.tree
    }

    /// The synthetic root: no id, no data.
    pub fn root(&self) -> NodeRef<'a, R> {
        NodeRef {
            view: *self,
            idx: self.tree.root(),
        }
    }

    /// Nodes directly below the synthetic root.
    pub fn top_level(&self) -> impl Iterator<Item = NodeRef<'a, R>> + 'a {
        self.root().children()
    }

    pub fn top_level_ids(&self) -> Vec<RecordId> {
        self.top_level().filter_map(|n| n.id().cloned()).collect()
    }

    /// Node registered for `id`, whether or not it is reachable from the root.
    pub fn get(&self, id: &RecordId) -> Option<NodeRef<'a, R>> {
        self.tree.lookup(id).map(|idx| NodeRef { view: *self, idx })
    }

    /// Depth-first walk yielding `(depth, node)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, NodeRef<'a, R>)> + 'a {
        let view = *self;
        self.tree
            .iter()
            .map(move |visit| (visit.depth, NodeRef { view, idx: visit.idx }))
    }

    pub fn is_empty(&self) -> bool {
        self.tree
            .get_node(self.tree.root())
            .map_or(true, |root| root.children.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn leaf_ids(&self) -> Vec<RecordId> {
        self.tree.leaf_ids()
    }

    /// Render with a caller-supplied label per node.
    pub fn to_termtree<F>(&self, label: F) -> TermTree<String>
    where
        F: Fn(NodeRef<'a, R>) -> String,
    {
        let view = *self;
        self.tree.to_termtree(|idx, _| label(NodeRef { view, idx }))
    }
}

/// Handle to one node of a [`TreeView`].
pub struct NodeRef<'a, R> {
    view: TreeView<'a, R>,
    idx: Index,
}

impl<R> Clone for NodeRef<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for NodeRef<'_, R> {}

impl<'a, R> NodeRef<'a, R> {
    fn node(&self) -> Option<&'a TreeNode> {
        self.view.tree.get_node(self.idx)
    }

    pub fn arena_index(&self) -> Index {
        self.idx
    }

    pub fn id(&self) -> Option<&'a RecordId> {
        self.node().and_then(|n| n.id.as_ref())
    }

    /// Input position of the record behind this node.
    pub fn index(&self) -> Option<usize> {
        self.node().and_then(|n| n.index)
    }

    /// The record behind this node.
    pub fn data(&self) -> Option<&'a R> {
        self.index().and_then(|i| self.view.records.get(i))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, R>> + 'a {
        let view = self.view;
        self.node()
            .into_iter()
            .flat_map(|n| n.children.values())
            .map(move |&idx| NodeRef { view, idx })
    }

    pub fn child_ids(&self) -> Vec<RecordId> {
        self.node()
            .map(|n| n.children.keys().filter_map(NodeKey::id).cloned().collect())
            .unwrap_or_default()
    }

    pub fn child(&self, id: &RecordId) -> Option<NodeRef<'a, R>> {
        let view = self.view;
        self.node()
            .and_then(|n| n.children.get(&NodeKey::Id(id.clone())))
            .map(|&idx| NodeRef { view, idx })
    }

    pub fn is_leaf(&self) -> bool {
        self.node().map_or(true, |n| n.children.is_empty())
    }
}
