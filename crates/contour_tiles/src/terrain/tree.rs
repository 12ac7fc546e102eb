//! Containment tree over sampled contours.
//!
//! [`ContourTree::build`] inserts contours one at a time below a virtual root. A new
//! contour descends into whichever existing child already encloses it; if none does it
//! becomes a child of the current node and adopts any siblings it encloses, so input
//! order does not matter. Nodes live in a flat arena addressed by contour index, and
//! the final children lists are flattened into a single index array.
use std::collections::VecDeque;

use tracing::debug;

use crate::terrain::contour::SampledContour;

/// Parent index used for root nodes.
pub const NO_PARENT: i32 = -1;

/// One node of the containment forest, addressed by contour index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContourTreeNode {
    /// Index of the contour this node represents.
    pub contour_index: u32,
    /// Index of the enclosing contour, or [`NO_PARENT`] for roots.
    pub parent_index: i32,
    /// Nesting depth; roots are at depth 0.
    pub depth: u32,
    /// Offset of this node's children in [`ContourTree::child_indices`].
    pub child_start: u32,
    /// Number of children.
    pub child_count: u32,
}

impl ContourTreeNode {
    pub fn is_root(&self) -> bool {
        self.parent_index == NO_PARENT
    }
}

/// Containment forest over a set of contours.
#[derive(Clone, Debug, Default)]
pub struct ContourTree {
    nodes: Vec<ContourTreeNode>,
    child_indices: Vec<u32>,
    roots: Vec<u32>,
}

/// Working arena used while inserting; slot `n` is the virtual root.
struct Arena {
    parent: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl Arena {
    fn new(count: usize) -> Self {
        Self {
            parent: vec![count; count + 1],
            children: vec![Vec::new(); count + 1],
        }
    }

    fn insert(&mut self, contours: &[SampledContour], root: usize, new: usize) {
        let mut parent = root;
        'descend: loop {
            for &child in &self.children[parent] {
                if contours[child].contains(&contours[new]) {
                    parent = child;
                    continue 'descend;
                }
            }
            break;
        }

        let (adopted, kept): (Vec<usize>, Vec<usize>) = self.children[parent]
            .iter()
            .partition(|&&sibling| contours[new].contains(&contours[sibling]));
        for &child in &adopted {
            self.parent[child] = new;
        }
        self.children[new].extend(adopted);
        self.children[parent] = kept;
        self.children[parent].push(new);
        self.parent[new] = parent;
    }
}

impl ContourTree {
    /// Build the containment forest for `contours`.
    ///
    /// Degenerate contours are logged and kept as childless roots so their heights
    /// stay addressable; they never contain or get contained.
    pub fn build(contours: &[SampledContour]) -> Self {
        let n = contours.len();
        let root = n;
        let mut arena = Arena::new(n);

        for (i, contour) in contours.iter().enumerate() {
            if contour.degenerate {
                debug!(
                    "Contour {} has {} points; kept for its height but excluded from containment.",
                    i,
                    contour.points.len()
                );
                arena.children[root].push(i);
                arena.parent[i] = root;
                continue;
            }
            arena.insert(contours, root, i);
        }

        // Order siblings by contour index so the flattened layout is stable.
        for children in arena.children.iter_mut() {
            children.sort_unstable();
        }

        let mut nodes: Vec<ContourTreeNode> = (0..n)
            .map(|i| ContourTreeNode {
                contour_index: i as u32,
                parent_index: if arena.parent[i] == root {
                    NO_PARENT
                } else {
                    arena.parent[i] as i32
                },
                depth: 0,
                child_start: 0,
                child_count: 0,
            })
            .collect();

        let roots: Vec<u32> = arena.children[root].iter().map(|&i| i as u32).collect();
        let mut child_indices = Vec::with_capacity(n);
        let mut queue: VecDeque<usize> = arena.children[root].iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            let depth = match nodes[i].parent_index {
                NO_PARENT => 0,
                p => nodes[p as usize].depth + 1,
            };
            let node = &mut nodes[i];
            node.depth = depth;
            node.child_start = child_indices.len() as u32;
            node.child_count = arena.children[i].len() as u32;
            for &c in &arena.children[i] {
                child_indices.push(c as u32);
                queue.push_back(c);
            }
        }

        let tree = Self {
            nodes,
            child_indices,
            roots,
        };
        debug!(
            "Built contour tree: {} contours, {} roots, max depth {}.",
            n,
            tree.roots.len(),
            tree.max_depth()
        );
        tree
    }

    /// Reassemble a tree from already-flattened parts (e.g. a packed buffer).
    pub fn from_parts(nodes: Vec<ContourTreeNode>, child_indices: Vec<u32>) -> Self {
        let roots = nodes
            .iter()
            .filter(|n| n.is_root())
            .map(|n| n.contour_index)
            .collect();
        Self {
            nodes,
            child_indices,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ContourTreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ContourTreeNode> {
        self.nodes.get(index)
    }

    /// Flat array holding every node's children back to back.
    pub fn child_indices(&self) -> &[u32] {
        &self.child_indices
    }

    pub fn children(&self, index: usize) -> &[u32] {
        match self.nodes.get(index) {
            Some(node) => {
                let start = node.child_start as usize;
                &self.child_indices[start..start + node.child_count as usize]
            }
            None => &[],
        }
    }

    pub fn roots(&self) -> &[u32] {
        &self.roots
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes
            .get(index)
            .filter(|n| !n.is_root())
            .map(|n| n.parent_index as usize)
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::terrain::contour::{Contour, SamplingConfig};

    fn sample(contours: &[Contour]) -> Vec<SampledContour> {
        let sampling = SamplingConfig::default();
        contours
            .iter()
            .map(|c| SampledContour::from_contour(c, &sampling))
            .collect()
    }

    fn circle(x: f32, y: f32, r: f32, h: f32) -> Contour {
        Contour::circle(Vec2::new(x, y), r, 16, h)
    }

    fn assert_depths_consistent(tree: &ContourTree) {
        for node in tree.nodes() {
            match tree.parent(node.contour_index as usize) {
                Some(p) => assert_eq!(node.depth, tree.nodes()[p].depth + 1),
                None => assert_eq!(node.depth, 0),
            }
        }
    }

    #[test]
    fn concentric_contours_form_a_chain() {
        let sampled = sample(&[
            circle(0.0, 0.0, 100.0, 0.0),
            circle(0.0, 0.0, 50.0, 5.0),
            circle(0.0, 0.0, 10.0, 10.0),
        ]);
        let tree = ContourTree::build(&sampled);

        assert_eq!(tree.roots(), &[0]);
        assert_eq!(tree.nodes()[0].parent_index, NO_PARENT);
        assert_eq!(tree.nodes()[1].parent_index, 0);
        assert_eq!(tree.nodes()[2].parent_index, 1);
        assert_eq!(tree.children(0), &[1]);
        assert_eq!(tree.children(1), &[2]);
        assert!(tree.children(2).is_empty());
        assert_eq!(tree.max_depth(), 2);
        assert_depths_consistent(&tree);
    }

    #[test]
    fn insertion_order_does_not_change_the_result() {
        // Innermost first, then outermost, then middle.
        let sampled = sample(&[
            circle(0.0, 0.0, 10.0, 10.0),
            circle(0.0, 0.0, 100.0, 0.0),
            circle(0.0, 0.0, 50.0, 5.0),
        ]);
        let tree = ContourTree::build(&sampled);

        assert_eq!(tree.roots(), &[1]);
        assert_eq!(tree.parent(2), Some(1));
        assert_eq!(tree.parent(0), Some(2));
        assert_depths_consistent(&tree);
    }

    #[test]
    fn parent_is_the_smallest_enclosing_contour() {
        let sampled = sample(&[
            circle(0.0, 0.0, 100.0, 0.0),
            circle(-40.0, 0.0, 30.0, 2.0),
            circle(40.0, 0.0, 30.0, 3.0),
            circle(40.0, 0.0, 10.0, 6.0),
            circle(-40.0, 5.0, 5.0, 4.0),
        ]);
        let tree = ContourTree::build(&sampled);

        assert_eq!(tree.parent(1), Some(0));
        assert_eq!(tree.parent(2), Some(0));
        assert_eq!(tree.parent(3), Some(2));
        assert_eq!(tree.parent(4), Some(1));
        assert_eq!(tree.children(0), &[1, 2]);

        for node in tree.nodes() {
            let i = node.contour_index as usize;
            // Every contour that encloses i is an ancestor, and the parent is the smallest.
            let enclosing: Vec<usize> = (0..sampled.len())
                .filter(|&j| j != i && sampled[j].contains(&sampled[i]))
                .collect();
            match tree.parent(i) {
                Some(p) => {
                    let smallest = enclosing
                        .iter()
                        .copied()
                        .min_by(|&a, &b| sampled[a].area.total_cmp(&sampled[b].area))
                        .expect("has enclosing contour");
                    assert_eq!(p, smallest);
                }
                None => assert!(enclosing.is_empty()),
            }
        }
        assert_depths_consistent(&tree);
    }

    #[test]
    fn disjoint_islands_are_separate_roots() {
        let sampled = sample(&[circle(-50.0, 0.0, 20.0, 1.0), circle(50.0, 0.0, 20.0, 2.0)]);
        let tree = ContourTree::build(&sampled);
        assert_eq!(tree.roots(), &[0, 1]);
        assert!(tree.nodes().iter().all(|n| n.depth == 0));
    }

    #[test]
    fn degenerate_contours_become_isolated_roots() {
        let sampled = sample(&[
            circle(0.0, 0.0, 100.0, 0.0),
            Contour::new(vec![Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)], 7.0),
        ]);
        let tree = ContourTree::build(&sampled);
        assert_eq!(tree.roots(), &[0, 1]);
        assert!(tree.children(0).is_empty());
        assert!(tree.children(1).is_empty());
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        let tree = ContourTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
        assert_eq!(tree.max_depth(), 0);
    }
}
