//! Lazily expanded label tree.
//!
//! The tree starts with only the root sentinel.  A node's children are
//! fetched the first time the node is expanded and are authoritative from
//! then on: expanding an already expanded node never reaches the backend.
//!
//! Nodes live in a flat index keyed by identity; parents refer to their
//! children by id.  The index doubles as the back-reference map from child
//! identity to node and only ever grows.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Label, LabelId};

/// Lazy-expansion state of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Unexpanded,
    /// A children fetch owned by one `expand` call is outstanding.
    InFlight,
    /// Children sorted by display name.
    Expanded(Vec<LabelId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNode {
    pub label: Label,
    pub parent: LabelId,
    pub expansion: Expansion,
}

impl LabelNode {
    fn new(label: Label, parent: LabelId) -> Self {
        Self {
            label,
            parent,
            expansion: Expansion::Unexpanded,
        }
    }

    pub fn id(&self) -> LabelId {
        self.label.id
    }

    pub fn children(&self) -> Option<&[LabelId]> {
        match &self.expansion {
            Expansion::Expanded(children) => Some(children),
            _ => None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.expansion, Expansion::Expanded(_))
    }
}

/// What an [`HierarchyCache::expand`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Children were fetched and attached.
    Expanded { children: usize },
    /// Children were already cached.
    AlreadyExpanded,
    /// Another call is fetching this node's children.
    InFlight,
}

#[derive(Debug)]
pub struct LabelTree {
    root: LabelNode,
    index: HashMap<LabelId, LabelNode>,
}

impl Default for LabelTree {
    fn default() -> Self {
        let root = Label {
            id: LabelId::ROOT,
            name: String::new(),
            hostname_id: None,
        };
        Self {
            root: LabelNode::new(root, LabelId::ROOT),
            index: HashMap::new(),
        }
    }
}

impl LabelTree {
    /// Any node, root included.
    pub fn node(&self, id: LabelId) -> Option<&LabelNode> {
        if id.is_root() {
            Some(&self.root)
        } else {
            self.index.get(&id)
        }
    }

    fn node_mut(&mut self, id: LabelId) -> Option<&mut LabelNode> {
        if id.is_root() {
            Some(&mut self.root)
        } else {
            self.index.get_mut(&id)
        }
    }

    /// Back-reference lookup.  The root is nobody's child and is never
    /// returned.
    pub fn lookup_by_identity(&self, id: LabelId) -> Option<&LabelNode> {
        self.index.get(&id)
    }

    /// Children of `id` in display order, if the node has been expanded.
    pub fn children(&self, id: LabelId) -> Option<impl Iterator<Item = &LabelNode> + '_> {
        let ids = self.node(id)?.children()?;
        Some(ids.iter().filter_map(move |child| self.index.get(child)))
    }

    /// Number of nodes attached as children anywhere in the tree.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Move an unexpanded node to `InFlight`.
    fn begin(&mut self, id: LabelId) -> Result<Option<ExpandOutcome>> {
        let node = self.node_mut(id).ok_or(Error::UnknownLabel(id))?;
        match node.expansion {
            Expansion::Expanded(_) => Ok(Some(ExpandOutcome::AlreadyExpanded)),
            Expansion::InFlight => Ok(Some(ExpandOutcome::InFlight)),
            Expansion::Unexpanded => {
                node.expansion = Expansion::InFlight;
                Ok(None)
            }
        }
    }

    fn abort(&mut self, id: LabelId) {
        if let Some(node) = self.node_mut(id) {
            node.expansion = Expansion::Unexpanded;
        }
    }

    /// Sort the fetched children, register them in the index and complete
    /// the parent's expansion.  Children already attached elsewhere, repeated
    /// in the batch, or claiming the root identity are dropped so every node
    /// keeps a single parent chain.
    fn attach(&mut self, parent: LabelId, mut children: Vec<Label>) -> usize {
        children.sort_by(|a, b| a.name.cmp(&b.name));

        let mut ids = Vec::with_capacity(children.len());
        for child in children {
            let id = child.id;
            if id.is_root() {
                warn!("Ignoring child of label {} claiming the root identity", parent);
                continue;
            }
            if let Some(existing) = self.index.get(&id) {
                warn!(
                    "Ignoring label {} under {}: already attached under {}",
                    id, parent, existing.parent
                );
                continue;
            }
            self.index.insert(id, LabelNode::new(child, parent));
            ids.push(id);
        }

        let count = ids.len();
        if let Some(node) = self.node_mut(parent) {
            node.expansion = Expansion::Expanded(ids);
        }
        count
    }
}

pub struct HierarchyCache {
    backend: Arc<dyn Backend>,
    tree: RwLock<LabelTree>,
}

impl HierarchyCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            tree: RwLock::new(LabelTree::default()),
        }
    }

    /// Fetch and attach a node's children unless they are cached or being
    /// fetched already.
    ///
    /// The node is marked in flight before the fetch suspends, so a second
    /// call racing the first returns [`ExpandOutcome::InFlight`] instead of
    /// issuing another request.  On failure the node goes back to
    /// unexpanded with no children recorded.
    pub async fn expand(&self, id: LabelId) -> Result<ExpandOutcome> {
        let skipped = self.tree.write().await.begin(id)?;
        if let Some(outcome) = skipped {
            debug!("Skipping expansion of label {}: {:?}", id, outcome);
            return Ok(outcome);
        }

        let fetched = self.backend.label_children(id).await;

        let mut tree = self.tree.write().await;
        match fetched {
            Ok(children) => {
                let children = tree.attach(id, children);
                debug!(
                    "Expanded label {} with {} children, {} labels cached",
                    id,
                    children,
                    tree.len()
                );
                Ok(ExpandOutcome::Expanded { children })
            }
            Err(e) => {
                tree.abort(id);
                warn!("Fetching children of label {} failed: {}", id, e);
                Err(e)
            }
        }
    }

    pub async fn lookup_by_identity(&self, id: LabelId) -> Option<LabelNode> {
        self.tree.read().await.lookup_by_identity(id).cloned()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, LabelTree> {
        self.tree.read().await
    }
}
