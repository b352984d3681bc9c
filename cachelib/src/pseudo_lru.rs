//! Tree based pseudo least recently used replacement for a fully associative cache
//!
//! The lines are the leaves of a complete binary tree. Each internal node holds one bit naming the
//! subtree that is currently stale: `false` means the right subtree, `true` the left one. That is
//! `n - 1` bits of state for `n` lines, against a full counter per line for exact LRU
//!
//! Nodes are stored heap ordered, the children of node `i` are `2i + 1` and `2i + 2`, and leaf `l`
//! is node `n - 1 + l`
//!
//! Finding a victim only walks the stale path from the root. An empty leaf elsewhere in the tree is
//! not looked for, so a valid line can be evicted while the cache still has room

use crate::address::BLOCK_OFFSET_BITS;
use crate::cache::CacheModel;
use crate::config::CacheGeometry;
use crate::simulator::SimulationResult;
use crate::trace::MemoryAccess;

/// The recency bits of a pseudo-LRU tree with a power of two number of leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoLruTree {
    stale_left: Vec<bool>,
}

impl PseudoLruTree {
    pub fn new(leaves: usize) -> Self {
        debug_assert!(leaves.is_power_of_two());
        Self {
            stale_left: vec![false; leaves - 1],
        }
    }

    /// The internal node bits, in heap order
    pub fn bits(&self) -> &[bool] {
        &self.stale_left
    }

    fn internal_nodes(&self) -> usize {
        self.stale_left.len()
    }

    /// Marks a leaf as the most recently used one, pointing every ancestor away from it
    pub fn touch(&mut self, leaf: usize) {
        let mut node = self.internal_nodes() + leaf;
        while node > 0 {
            let parent = (node - 1) / 2;
            // Left children have odd indices, so the right subtree becomes the stale one
            self.stale_left[parent] = node % 2 == 0;
            node = parent;
        }
    }

    /// Follows the stale bits from the root to a leaf, flipping each bit on the way so the same
    /// path isn't taken again next time. Returns the leaf to replace
    pub fn victim(&mut self) -> usize {
        let internal_nodes = self.internal_nodes();
        let mut node = 0;
        while node < internal_nodes {
            let stale_left = self.stale_left[node];
            self.stale_left[node] = !stale_left;
            node = if stale_left { 2 * node + 1 } else { 2 * node + 2 };
        }
        node - internal_nodes
    }
}

/// A fully associative cache replacing lines with [`PseudoLruTree`]
#[derive(Debug)]
pub struct PseudoLruCache {
    tags: Vec<u32>,
    valid: Vec<bool>,
    tree: PseudoLruTree,
    result: SimulationResult,
}

impl PseudoLruCache {
    /// The geometry's line count must be a power of two, which [`CacheGeometry`] already checks
    pub fn new(geometry: CacheGeometry) -> Self {
        let blocks = geometry.total_blocks() as usize;
        Self {
            tags: vec![0; blocks],
            valid: vec![false; blocks],
            tree: PseudoLruTree::new(blocks),
            result: SimulationResult::default(),
        }
    }

    pub fn tree(&self) -> &PseudoLruTree {
        &self.tree
    }

    /// The tag held by each leaf, `None` for leaves never filled
    pub fn leaves(&self) -> Vec<Option<u32>> {
        self.tags.iter().zip(&self.valid).map(|(tag, valid)| valid.then_some(*tag)).collect()
    }

    fn lookup(&mut self, tag: u32) -> bool {
        if let Some(leaf) = self.tags.iter().zip(&self.valid).position(|(t, v)| *v && *t == tag) {
            self.tree.touch(leaf);
            return true;
        }
        let leaf = self.tree.victim();
        if self.valid[leaf] {
            log::trace!("Pseudo-LRU evicting tag {:#x} from leaf {leaf}", self.tags[leaf]);
        }
        self.tags[leaf] = tag;
        self.valid[leaf] = true;
        false
    }
}

impl CacheModel for PseudoLruCache {
    fn access(&mut self, access: MemoryAccess) -> bool {
        let hit = self.lookup(access.address >> BLOCK_OFFSET_BITS);
        self.result.record(hit);
        hit
    }

    fn result(&self) -> SimulationResult {
        self.result
    }

    fn get_uninitialised_line_count(&self) -> usize {
        self.valid.iter().filter(|v| !**v).count()
    }
}
