//! Tree Builder
//!
//! Materializes a depth-bounded descendant or ancestor tree. A person already
//! placed in the tree is emitted again only as a flagged leaf, which keeps
//! both pedigree collapse and corrupt cycles finite.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::Result;
use crate::graph::GraphSnapshot;
use crate::person::{Person, PersonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Descendants,
    Ancestors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: PersonId,
    pub name: String,
    pub depth: u32,
    /// Ordered by `order_by_spouse`, then id
    pub spouses: Vec<PersonId>,
    /// Next generation in the requested direction
    pub children: Vec<TreeNode>,
    /// Depth limit reached while relatives remained
    pub truncated: bool,
    /// Person already appears elsewhere in this tree; not expanded again
    pub revisited: bool,
}

impl TreeNode {
    /// Number of nodes including this one
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Deepest depth present below (and including) this node
    pub fn depth_reached(&self) -> u32 {
        self.children
            .iter()
            .map(TreeNode::depth_reached)
            .max()
            .unwrap_or(self.depth)
    }

    /// Ids in pre-order
    pub fn ids(&self) -> Vec<PersonId> {
        let mut out = vec![self.id];
        for child in &self.children {
            out.extend(child.ids());
        }
        out
    }
}

pub fn build_subtree(
    snapshot: &GraphSnapshot,
    root: PersonId,
    direction: Direction,
    max_depth: u32,
) -> Result<TreeNode> {
    snapshot.require(root)?;
    let mut visited = HashSet::new();
    Ok(expand(snapshot, root, direction, 0, max_depth, &mut visited))
}

fn expand(
    snapshot: &GraphSnapshot,
    id: PersonId,
    direction: Direction,
    depth: u32,
    max_depth: u32,
    visited: &mut HashSet<PersonId>,
) -> TreeNode {
    let mut node = TreeNode {
        id,
        name: snapshot.get(id).map(Person::full_name).unwrap_or_default(),
        depth,
        spouses: ordered_spouses(snapshot, id),
        children: Vec::new(),
        truncated: false,
        revisited: false,
    };

    if !visited.insert(id) {
        node.revisited = true;
        return node;
    }

    let next = match direction {
        Direction::Descendants => ordered_children(snapshot, id),
        Direction::Ancestors => snapshot.parents_of(id).to_vec(),
    };
    if depth >= max_depth {
        node.truncated = !next.is_empty();
        return node;
    }

    node.children = next
        .into_iter()
        .map(|relative| expand(snapshot, relative, direction, depth + 1, max_depth, visited))
        .collect();
    node
}

fn ordered_children(snapshot: &GraphSnapshot, parent: PersonId) -> Vec<PersonId> {
    let mut children = snapshot.children_of(parent).to_vec();
    children.sort_by_key(|child| {
        let order = snapshot.get(*child).map(|c| c.order_under(parent)).unwrap_or(0);
        (order, *child)
    });
    children
}

fn ordered_spouses(snapshot: &GraphSnapshot, id: PersonId) -> Vec<PersonId> {
    let mut spouses = snapshot.spouses_of(id).to_vec();
    spouses.sort_by_key(|spouse| {
        let order = snapshot.get(*spouse).map(|s| s.order_by_spouse).unwrap_or(0);
        (order, *spouse)
    });
    spouses
}
