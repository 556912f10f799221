//! Payload-free projection of a record tree.

use std::collections::HashSet;

use generational_arena::Index;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::arena::{NodeKey, TreeArena};
use crate::domain::entities::RecordId;

/// Nested `id -> children` mapping with the same shape as the tree.
///
/// Serializes as a nested object with string keys, e.g.
/// `{"1": {"2": {}, "3": {}}}`, so it fits JSON and TOML alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RelationshipMap(IndexMap<RecordId, RelationshipMap>);

impl RelationshipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project the reachable part of `tree`.
    ///
    /// A node linked under several parents appears under each of them. An id
    /// that repeats along its own ancestor path is cut there, so cyclic links
    /// produce a finite map. Records without an id have no key and are left out.
    pub fn from_tree(tree: &TreeArena) -> Self {
        let mut path = HashSet::new();
        Self::project(tree, tree.root(), &mut path)
    }

    fn project(tree: &TreeArena, idx: Index, path: &mut HashSet<Index>) -> Self {
        let mut map = IndexMap::new();
        if let Some(node) = tree.get_node(idx) {
            for (key, &child) in &node.children {
                let NodeKey::Id(id) = key else {
                    continue;
                };
                if !path.insert(child) {
                    continue;
                }
                map.insert(id.clone(), Self::project(tree, child, path));
                path.remove(&child);
            }
        }
        Self(map)
    }

    pub fn get(&self, id: &RecordId) -> Option<&RelationshipMap> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.0.contains_key(id)
    }

    /// Ids at this level, in first-encountered order.
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &RelationshipMap)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of entries at every level.
    pub fn count(&self) -> usize {
        self.0.values().map(|child| 1 + child.count()).sum()
    }
}

impl Serialize for RelationshipMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, children)| (id.to_string(), children)))
    }
}

impl<'a> IntoIterator for &'a RelationshipMap {
    type Item = (&'a RecordId, &'a RelationshipMap);
    type IntoIter = indexmap::map::Iter<'a, RecordId, RelationshipMap>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
