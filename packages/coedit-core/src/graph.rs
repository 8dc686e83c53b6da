use std::collections::{HashMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::apply::apply;
use crate::compose::{compose, compose_all};
use crate::error::{Error, Result};
use crate::ids::{AuthorId, RoomId, Timestamp, VersionId};
use crate::invert::invert;
use crate::ops::OperationSeq;
use crate::traits::Clock;

/// One committed edit. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VersionNode {
    pub version_id: VersionId,
    pub parent_id: Option<VersionId>,
    pub timestamp: Timestamp,
    pub author_id: AuthorId,
    /// Edit relative to the parent's text (or `""` for the root).
    pub operations: OperationSeq,
    /// Append index within the room, starting at 0.
    pub seq: u64,
}

/// Append-only history of one room, stored as an arena of parent-linked nodes.
pub struct VersionGraph<C: Clock> {
    room_id: RoomId,
    clock: C,
    nodes: HashMap<VersionId, VersionNode>,
    order: Vec<VersionId>, // append order, index == seq
    text_lens: HashMap<VersionId, usize>,
    latest_timestamp: Option<Timestamp>,
}

impl<C: Clock> VersionGraph<C> {
    pub fn new(room_id: RoomId, clock: C) -> Self {
        Self {
            room_id,
            clock,
            nodes: HashMap::new(),
            order: Vec::new(),
            text_lens: HashMap::new(),
            latest_timestamp: None,
        }
    }

    /// Rebuild a graph from persisted nodes (any order; they are replayed by `seq`).
    pub fn from_nodes<I>(room_id: RoomId, clock: C, nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = VersionNode>,
    {
        let mut nodes: Vec<VersionNode> = nodes.into_iter().collect();
        nodes.sort_by_key(|n| n.seq);
        let mut graph = Self::new(room_id, clock);
        for node in nodes {
            graph.commit_node(node)?;
        }
        Ok(graph)
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Commit `operations` as a child of `parent_id` and return the new version's id.
    pub fn commit(
        &mut self,
        parent_id: Option<&VersionId>,
        author_id: AuthorId,
        operations: OperationSeq,
    ) -> Result<VersionId> {
        let node = self.prepare(parent_id, author_id, operations)?;
        let id = node.version_id.clone();
        self.commit_node(node)?;
        Ok(id)
    }

    /// Build the node `commit` would append, without appending it.
    ///
    /// Lets callers persist the node before it becomes visible; pass it to
    /// [`commit_node`](Self::commit_node) afterwards.
    pub fn prepare(
        &mut self,
        parent_id: Option<&VersionId>,
        author_id: AuthorId,
        operations: OperationSeq,
    ) -> Result<VersionNode> {
        self.check_parent(parent_id, &operations)?;
        let now = self.clock.now();
        let timestamp = self.latest_timestamp.map_or(now, |last| now.max(last));
        Ok(VersionNode {
            version_id: VersionId::generate(),
            parent_id: parent_id.cloned(),
            timestamp,
            author_id,
            operations,
            seq: self.order.len() as u64,
        })
    }

    /// Append an already-built node (replay, or the second half of [`prepare`](Self::prepare)).
    pub fn commit_node(&mut self, node: VersionNode) -> Result<()> {
        if self.nodes.contains_key(&node.version_id) {
            return Err(Error::InconsistentState(format!(
                "version {} already committed",
                node.version_id
            )));
        }
        if node.seq != self.order.len() as u64 {
            return Err(Error::InconsistentState(format!(
                "version {} has seq {}, expected {}",
                node.version_id,
                node.seq,
                self.order.len()
            )));
        }
        let parent_len = self.check_parent(node.parent_id.as_ref(), &node.operations)?;
        let len = if node.operations.is_empty() {
            parent_len
        } else {
            node.operations.target_len()
        };

        self.latest_timestamp = Some(
            self.latest_timestamp
                .map_or(node.timestamp, |last| last.max(node.timestamp)),
        );
        self.text_lens.insert(node.version_id.clone(), len);
        self.order.push(node.version_id.clone());
        self.nodes.insert(node.version_id.clone(), node);
        Ok(())
    }

    /// Validate a prospective parent and return the length of its text.
    fn check_parent(
        &self,
        parent_id: Option<&VersionId>,
        operations: &OperationSeq,
    ) -> Result<usize> {
        let parent_len = match parent_id {
            Some(parent) => *self
                .text_lens
                .get(parent)
                .ok_or_else(|| Error::UnknownVersion(parent.clone()))?,
            None if self.order.is_empty() => 0,
            None => {
                return Err(Error::InconsistentState(format!(
                    "room {} already has a root version",
                    self.room_id
                )))
            }
        };
        if !operations.fits(parent_len) {
            return Err(Error::LengthMismatch {
                expected: parent_len,
                actual: operations.base_len(),
            });
        }
        Ok(parent_len)
    }

    pub fn get(&self, id: &VersionId) -> Option<&VersionNode> {
        self.nodes.get(id)
    }

    fn node(&self, id: &VersionId) -> Result<&VersionNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::UnknownVersion(id.clone()))
    }

    /// Most recently committed node.
    pub fn head(&self) -> Option<&VersionNode> {
        self.order.last().and_then(|id| self.nodes.get(id))
    }

    pub fn root(&self) -> Option<&VersionNode> {
        self.order.first().and_then(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Length in chars of the text at `id`.
    pub fn text_len(&self, id: &VersionId) -> Option<usize> {
        self.text_lens.get(id).copied()
    }

    /// All nodes ordered by timestamp, ties broken by `seq`.
    pub fn history(&self) -> Vec<&VersionNode> {
        let mut nodes: Vec<&VersionNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| (n.timestamp, n.seq));
        nodes
    }

    /// `id` followed by its parent chain, ending at the root.
    pub fn ancestors(&self, id: &VersionId) -> Result<Vec<&VersionNode>> {
        let mut chain = Vec::new();
        let mut current = Some(self.node(id)?);
        while let Some(node) = current {
            chain.push(node);
            current = match &node.parent_id {
                Some(parent) => Some(self.node(parent)?),
                None => None,
            };
        }
        Ok(chain)
    }

    /// The root-to-`id` path, `id` last.
    pub fn path_from_root(&self, id: &VersionId) -> Result<Vec<&VersionNode>> {
        let mut path = self.ancestors(id)?;
        path.reverse();
        Ok(path)
    }

    /// True when `ancestor` lies on `descendant`'s parent chain (or is `descendant`).
    pub fn is_ancestor(&self, ancestor: &VersionId, descendant: &VersionId) -> Result<bool> {
        self.node(ancestor)?;
        Ok(self
            .ancestors(descendant)?
            .iter()
            .any(|n| &n.version_id == ancestor))
    }

    /// Replay the root-to-`id` path starting from the empty text.
    pub fn reconstruct(&self, id: &VersionId) -> Result<String> {
        self.path_from_root(id)?
            .into_iter()
            .try_fold(String::new(), |text, node| apply(&text, &node.operations))
    }

    /// Nearest node shared by the parent chains of `a` and `b` (each chain includes itself).
    pub fn common_ancestor(&self, a: &VersionId, b: &VersionId) -> Result<Option<VersionId>> {
        let seen: HashSet<&VersionId> = self
            .ancestors(a)?
            .into_iter()
            .map(|n| &n.version_id)
            .collect();
        Ok(self
            .ancestors(b)?
            .into_iter()
            .find(|n| seen.contains(&n.version_id))
            .map(|n| n.version_id.clone()))
    }

    /// Nodes strictly after `base` on the root-to-`head` path; the whole path when `base`
    /// is `None`.
    pub fn operations_since(
        &self,
        base: Option<&VersionId>,
        head: &VersionId,
    ) -> Result<Vec<&VersionNode>> {
        let path = self.path_from_root(head)?;
        let Some(base) = base else {
            return Ok(path);
        };
        self.node(base)?;
        match path.iter().position(|n| &n.version_id == base) {
            Some(idx) => Ok(path[idx + 1..].to_vec()),
            None => Err(Error::NotAncestor {
                base: base.clone(),
                head: head.clone(),
            }),
        }
    }

    /// Operations taking `from`'s text toward `to`'s text.
    ///
    /// Forward along one chain this is the composition of every edit after `from` up to
    /// and including `to`. When `to` precedes `from` in history this returns `to`'s own
    /// operations only; use [`diff`](Self::diff) for an exact reverse transition. Any other
    /// pair is routed through [`diff`](Self::diff).
    pub fn composed_chain(&self, from: &VersionId, to: &VersionId) -> Result<OperationSeq> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;
        if from == to {
            return Ok(OperationSeq::new());
        }
        if self.is_ancestor(from, to)? {
            let since = self.operations_since(Some(from), to)?;
            return compose_all(since.into_iter().map(|n| &n.operations));
        }
        if (to_node.timestamp, to_node.seq) < (from_node.timestamp, from_node.seq) {
            return Ok(to_node.operations.clone());
        }
        self.diff(from, to)
    }

    /// Exact edit from `from`'s text to `to`'s text, routed through their common ancestor.
    ///
    /// `apply(reconstruct(from), diff(from, to)) == reconstruct(to)`.
    pub fn diff(&self, from: &VersionId, to: &VersionId) -> Result<OperationSeq> {
        let ancestor = self.common_ancestor(from, to)?.ok_or_else(|| {
            Error::InconsistentState(format!("{from} and {to} share no ancestor"))
        })?;

        let mut text = self.reconstruct(&ancestor)?;
        let mut undo = Vec::new();
        for node in self.operations_since(Some(&ancestor), from)? {
            undo.push(invert(&node.operations, &text)?);
            text = apply(&text, &node.operations)?;
        }
        let backward = compose_all(undo.iter().rev())?;
        let forward = compose_all(
            self.operations_since(Some(&ancestor), to)?
                .into_iter()
                .map(|n| &n.operations),
        )?;
        compose(&backward, &forward)
    }
}
