//! Tree builder for turning flat parent-linked records into hierarchies.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, trace, warn};

use crate::domain::arena::{NodeKey, TreeArena, TreeView};
use crate::domain::entities::{Link, LinkFields, Record, RecordId};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::relationships::RelationshipMap;

/// One record of a flattened tree.
#[derive(Debug)]
pub struct FlatEntry<'a, R> {
    /// Distance from the top level of the tree
    pub depth: usize,
    /// None for a record without a readable id
    pub id: Option<&'a RecordId>,
    /// Input position of the record
    pub index: usize,
    pub data: &'a R,
}

/// Constructs hierarchical trees from an ordered sequence of records.
///
/// Construction reads the linking fields once. Lenient by default: records
/// pointing at missing parents become roots, duplicate ids resolve last write
/// wins, records without a readable id are placed by their parent alone, and
/// cyclic links are cut during traversal.
pub struct TreeBuilder<R> {
    records: Vec<R>,
    fields: LinkFields,
    links: Vec<Link>,
    sanitized: bool,
    tree: Option<TreeArena>,
}

impl<R: Record> TreeBuilder<R> {
    /// Builder over `records` using the `id`/`pid` fields.
    pub fn new(records: Vec<R>) -> Self {
        Self::with_fields(records, LinkFields::default())
    }

    /// Builder over `records` using custom linking fields.
    pub fn with_fields(records: Vec<R>, fields: LinkFields) -> Self {
        let links = records
            .iter()
            .enumerate()
            .map(|(index, record)| read_link(index, record, &fields))
            .collect();
        Self {
            records,
            fields,
            links,
            sanitized: false,
            tree: None,
        }
    }

    /// Builder that rejects malformed input up front.
    ///
    /// Fails on missing ids, unreadable linking fields, repeated ids and
    /// parent chains that loop. Parents that do not exist are still promoted
    /// to roots, as in lenient mode.
    #[instrument(level = "debug", skip(records))]
    pub fn strict(records: Vec<R>, fields: LinkFields) -> DomainResult<Self> {
        let mut links = Vec::with_capacity(records.len());
        let mut first_seen: HashMap<RecordId, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let id = record
                .link_field(&fields.id)
                .map_err(|source| DomainError::MalformedField {
                    index,
                    field: fields.id.clone(),
                    source,
                })?
                .ok_or(DomainError::MissingId { index })?;
            let parent = record
                .link_field(&fields.parent)
                .map_err(|source| DomainError::MalformedField {
                    index,
                    field: fields.parent.clone(),
                    source,
                })?
                .and_then(RecordId::into_parent);

            if let Some(&first) = first_seen.get(&id) {
                return Err(DomainError::DuplicateId {
                    id,
                    first,
                    second: index,
                });
            }
            first_seen.insert(id.clone(), index);
            links.push(Link {
                id: Some(id),
                parent,
            });
        }

        detect_cycle(&links)?;

        Ok(Self {
            records,
            fields,
            links,
            sanitized: false,
            tree: None,
        })
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn fields(&self) -> &LinkFields {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parent of the record at `index` as currently linked.
    pub fn parent_of(&self, index: usize) -> Option<&RecordId> {
        self.links.get(index).and_then(|link| link.parent.as_ref())
    }

    /// The tree from the most recent `build_tree` or `flatten`, if any.
    pub fn tree(&self) -> Option<TreeView<'_, R>> {
        self.tree
            .as_ref()
            .map(|tree| TreeView::new(tree, &self.records))
    }

    /// Promote records whose parent id matches no record to roots.
    ///
    /// Linear scan per record. The parent field is cleared both in the
    /// linkage table and in the record itself. Returns the number of records
    /// promoted; a second run promotes none.
    #[instrument(level = "debug", skip(self))]
    pub fn sanitize_orphans(&mut self) -> usize {
        let mut promoted = 0;
        for i in 0..self.links.len() {
            let Some(parent) = &self.links[i].parent else {
                continue;
            };
            let found = self.links.iter().any(|link| link.id.as_ref() == Some(parent));
            if !found {
                trace!(index = i, parent = %parent, "parent not found, promoting to root");
                self.links[i].parent = None;
                self.records[i].clear_link_field(&self.fields.parent);
                promoted += 1;
            }
        }
        self.sanitized = true;
        debug!("sanitize_orphans: promoted {} records", promoted);
        promoted
    }

    /// Build the tree, or the subtree below `filter`.
    ///
    /// Without a filter the synthetic root holds every record without a
    /// parent. With a filter it holds the records whose parent is `filter`,
    /// each with its full subtree. The result is cached for [`flatten`].
    ///
    /// [`flatten`]: TreeBuilder::flatten
    #[instrument(level = "debug", skip(self))]
    pub fn build_tree(&mut self, filter: Option<&RecordId>) -> TreeView<'_, R> {
        let tree = self.assemble(filter);
        let tree = self.tree.insert(tree);
        TreeView::new(tree, &self.records)
    }

    /// Build the payload-free `id -> children` mapping, or the one below `filter`.
    ///
    /// Does not touch the cached tree.
    #[instrument(level = "debug", skip(self))]
    pub fn build_relationships(&mut self, filter: Option<&RecordId>) -> RelationshipMap {
        let tree = self.assemble(filter);
        RelationshipMap::from_tree(&tree)
    }

    /// Records in tree order: depth-first, parents before children, children
    /// in first-encountered order.
    ///
    /// Reuses the cached tree unless there is none or `force_rebuild` is set;
    /// `filter` only applies when a tree gets built.
    pub fn flatten(&mut self, filter: Option<&RecordId>, force_rebuild: bool) -> Vec<&R> {
        self.flatten_entries(filter, force_rebuild)
            .into_iter()
            .map(|entry| entry.data)
            .collect()
    }

    /// Like [`flatten`](TreeBuilder::flatten), keeping depth, id and index.
    #[instrument(level = "debug", skip(self))]
    pub fn flatten_entries(
        &mut self,
        filter: Option<&RecordId>,
        force_rebuild: bool,
    ) -> Vec<FlatEntry<'_, R>> {
        if force_rebuild || self.tree.is_none() {
            let tree = self.assemble(filter);
            self.tree = Some(tree);
        }
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };

        let records = &self.records;
        let flat: Vec<FlatEntry<'_, R>> = tree
            .iter()
            .filter_map(|visit| {
                let index = visit.node.index?;
                let data = records.get(index)?;
                Some(FlatEntry {
                    depth: visit.depth,
                    id: visit.node.id.as_ref(),
                    index,
                    data,
                })
            })
            .collect();
        debug!("flatten: {} of {} records", flat.len(), records.len());
        flat
    }

    /// Single linking pass shared by every view.
    fn assemble(&mut self, filter: Option<&RecordId>) -> TreeArena {
        let filter = filter.filter(|id| !id.is_sentinel());
        if filter.is_none() && !self.sanitized {
            self.sanitize_orphans();
        }

        let mut tree = TreeArena::new(filter.cloned());
        let root = tree.root();

        for (index, link) in self.links.iter().enumerate() {
            let key = match &link.id {
                Some(id) => NodeKey::Id(id.clone()),
                None => NodeKey::Unkeyed(index),
            };
            let node = tree.upsert(&key, index);

            match (&link.parent, filter) {
                (Some(parent), Some(wanted)) if parent == wanted => {
                    trace!(%key, "top level of filtered tree");
                    tree.attach(root, &key, node);
                }
                (Some(parent), _) => {
                    trace!(%key, %parent, "attach under parent");
                    let parent_idx = tree.ensure(&NodeKey::Id(parent.clone()));
                    tree.attach(parent_idx, &key, node);
                }
                (None, None) => {
                    trace!(%key, "attach at root");
                    tree.attach(root, &key, node);
                }
                (None, Some(_)) => {
                    trace!(%key, "root outside of filter, not attached");
                }
            }
        }

        debug!(
            "assemble: {} records, {} nodes, filter={:?}",
            self.links.len(),
            tree.len(),
            filter
        );
        tree
    }
}

/// Read both linking fields leniently: unreadable values count as absent.
fn read_link<R: Record>(index: usize, record: &R, fields: &LinkFields) -> Link {
    let id = match record.link_field(&fields.id) {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            warn!(index, field = %fields.id, "record has no id, placing by parent only");
            None
        }
        Err(e) => {
            warn!(index, field = %fields.id, error = %e, "unreadable id, placing by parent only");
            None
        }
    };
    let parent = match record.link_field(&fields.parent) {
        Ok(parent) => parent.and_then(RecordId::into_parent),
        Err(e) => {
            warn!(index, field = %fields.parent, error = %e, "unreadable parent, treating as root");
            None
        }
    };
    Link { id, parent }
}

/// Follow each parent chain; fail on the first id seen twice on one chain.
fn detect_cycle(links: &[Link]) -> DomainResult<()> {
    let parents: HashMap<&RecordId, &RecordId> = links
        .iter()
        .filter_map(|link| Some((link.id.as_ref()?, link.parent.as_ref()?)))
        .collect();
    let mut acyclic: HashSet<&RecordId> = HashSet::new();

    for start in links.iter().filter_map(|link| link.id.as_ref()) {
        let mut chain = HashSet::new();
        let mut current = start;
        loop {
            if acyclic.contains(current) {
                break;
            }
            if !chain.insert(current) {
                return Err(DomainError::CycleDetected(current.clone()));
            }
            match parents.get(current) {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        acyclic.extend(chain);
    }
    Ok(())
}
