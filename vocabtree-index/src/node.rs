//! # Tree Nodes
//!
//! A node is either a leaf holding candidate indices or an internal node
//! owning its children; never both. Every node carries the representative
//! descriptor (cluster center) used to pick it during descent.

/// One node of a vocabulary tree
#[derive(Debug, Clone)]
pub struct Node<D> {
    level: u32,
    representative: D,
    descriptor_indices: Vec<u32>,
    children: Vec<Node<D>>,
}

impl<D> Node<D> {
    pub(crate) fn leaf(level: u32, representative: D, descriptor_indices: Vec<u32>) -> Self {
        debug_assert!(!descriptor_indices.is_empty());
        Self {
            level,
            representative,
            descriptor_indices,
            children: Vec::new(),
        }
    }

    pub(crate) fn internal(level: u32, representative: D, children: Vec<Node<D>>) -> Self {
        debug_assert!(children.len() >= 2);
        Self {
            level,
            representative,
            descriptor_indices: Vec::new(),
            children,
        }
    }

    /// Depth of this node, the root is level 0
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn representative(&self) -> &D {
        &self.representative
    }

    /// Candidate indices of a leaf, empty for internal nodes
    pub fn descriptor_indices(&self) -> &[u32] {
        &self.descriptor_indices
    }

    /// Child nodes, empty for leaves
    pub fn children(&self) -> &[Node<D>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Append the indices of every leaf below this node to `out`
    pub fn collect_leaf_indices(&self, out: &mut Vec<u32>) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.extend_from_slice(&node.descriptor_indices);
            stack.extend(node.children.iter().rev());
        }
    }

    /// Structural statistics of the subtree rooted here
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            nodes: 0,
            leaves: 0,
            depth: 0,
            indexed_descriptors: 0,
            min_leaf_size: usize::MAX,
            max_leaf_size: 0,
        };

        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            stats.nodes += 1;
            if node.is_leaf() {
                let size = node.descriptor_indices.len();
                stats.leaves += 1;
                stats.indexed_descriptors += size;
                stats.min_leaf_size = stats.min_leaf_size.min(size);
                stats.max_leaf_size = stats.max_leaf_size.max(size);
                stats.depth = stats.depth.max(node.level - self.level + 1);
            } else {
                stack.extend(node.children.iter());
            }
        }

        stats
    }
}

/// Shape of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of nodes including the root
    pub nodes: usize,
    pub leaves: usize,
    /// Number of levels, 1 for a single-leaf tree
    pub depth: u32,
    /// Sum of all leaf sizes
    pub indexed_descriptors: usize,
    pub min_leaf_size: usize,
    pub max_leaf_size: usize,
}

impl TreeStats {
    /// Average number of indices per leaf
    pub fn mean_leaf_size(&self) -> f64 {
        if self.leaves == 0 {
            0.0
        } else {
            self.indexed_descriptors as f64 / self.leaves as f64
        }
    }
}
