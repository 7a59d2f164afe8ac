//! Incremental reconciliation of displayed status trees

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::status::{ItemBuildStatus, StatusItem};

/// A displayed node. `label` and `status` mirror the latest fetch while
/// `selected` and `expanded` belong to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
    pub status: ItemBuildStatus,
    pub selected: bool,
    pub expanded: bool,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    fn created_from(item: &StatusItem, diff: &mut TreeDiff) -> Self {
        diff.created.push(item.identifier.clone());
        Self {
            id: item.identifier.clone(),
            label: item.name.clone(),
            status: item.status,
            selected: false,
            expanded: true,
            children: item.children.iter().map(|c| ViewNode::created_from(c, diff)).collect(),
        }
    }

    fn find(&self, id: &str) -> Option<&ViewNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut ViewNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn selected(&self) -> Option<&ViewNode> {
        if self.selected {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.selected())
    }

    fn clear_selection(&mut self) {
        self.selected = false;
        self.children.iter_mut().for_each(ViewNode::clear_selection);
    }

    fn collect_ids(&self, into: &mut Vec<String>) {
        into.push(self.id.clone());
        self.children.iter().for_each(|c| c.collect_ids(into));
    }

    /// Number of nodes in this subtree, itself included
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ViewNode::len).sum::<usize>()
    }
}

/// Identifiers touched by one reconciliation, in walk order.
///
/// `removed` lists a dropped node and all of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeDiff {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl TreeDiff {
    /// True when the set of nodes did not change
    pub fn is_structurally_unchanged(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub nodes: Vec<ViewNode>,
    pub diff: TreeDiff,
}

/// Rebuild `previous` from a fresh snapshot.
///
/// Siblings are matched by identifier through one index per level. A match
/// keeps its selection and expansion and takes the fresh label and status.
/// Repeated identifiers on a level match their previous occurrences in order,
/// so the nth fresh `a` reuses the nth previous `a`. Unmatched items, extra
/// repeats and items with an empty identifier become new nodes. Output order
/// follows the snapshot.
pub fn reconcile(previous: &[ViewNode], fresh: &[StatusItem]) -> Reconciliation {
    let mut diff = TreeDiff::default();
    let nodes = reconcile_level(previous, fresh, &mut diff);
    Reconciliation { nodes, diff }
}

fn reconcile_level(previous: &[ViewNode], fresh: &[StatusItem], diff: &mut TreeDiff) -> Vec<ViewNode> {
    let mut index: HashMap<&str, VecDeque<usize>> = HashMap::with_capacity(previous.len());
    for (position, node) in previous.iter().enumerate() {
        if !node.id.is_empty() {
            index.entry(node.id.as_str()).or_default().push_back(position);
        }
    }

    let mut visited = vec![false; previous.len()];
    let mut nodes = Vec::with_capacity(fresh.len());

    for item in fresh {
        let matched = index
            .get_mut(item.identifier.as_str())
            .and_then(VecDeque::pop_front);

        let node = match matched {
            Some(position) => {
                visited[position] = true;
                let existing = &previous[position];
                diff.updated.push(item.identifier.clone());
                ViewNode {
                    id: item.identifier.clone(),
                    label: item.name.clone(),
                    status: item.status,
                    selected: existing.selected,
                    expanded: existing.expanded,
                    children: reconcile_level(&existing.children, &item.children, diff),
                }
            }
            None => ViewNode::created_from(item, diff),
        };
        nodes.push(node);
    }

    for (node, seen) in previous.iter().zip(visited) {
        if !seen {
            node.collect_ids(&mut diff.removed);
        }
    }

    nodes
}

/// A reconciled forest with single selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewTree {
    roots: Vec<ViewNode>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[ViewNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Reconcile against a fresh snapshot. Selects the first root when the
    /// result has no selection.
    pub fn apply(&mut self, fresh: &[StatusItem]) -> TreeDiff {
        let Reconciliation { nodes, diff } = reconcile(&self.roots, fresh);
        self.roots = nodes;

        if self.selected().is_none() {
            if let Some(first) = self.roots.first_mut() {
                first.selected = true;
            }
        }
        diff
    }

    pub fn find(&self, id: &str) -> Option<&ViewNode> {
        self.roots.iter().find_map(|n| n.find(id))
    }

    pub fn selected(&self) -> Option<&ViewNode> {
        self.roots.iter().find_map(ViewNode::selected)
    }

    /// Select the node with `id`, clearing any other selection. Returns false
    /// if no such node exists.
    pub fn set_selected(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.roots.iter_mut().for_each(ViewNode::clear_selection);
        if let Some(node) = self.roots.iter_mut().find_map(|n| n.find_mut(id)) {
            node.selected = true;
        }
        true
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> bool {
        match self.roots.iter_mut().find_map(|n| n.find_mut(id)) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.roots.iter().map(ViewNode::len).sum()
    }
}
