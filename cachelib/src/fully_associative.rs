use crate::address::BLOCK_OFFSET_BITS;
use crate::cache::CacheModel;
use crate::config::CacheGeometry;
use crate::replacement_policies::{RecencyCounters, ReplacementPolicy};
use crate::simulator::SimulationResult;
use crate::trace::MemoryAccess;

/// A fully associative cache with exact least recently used replacement
///
/// Every line lives in one global set, so there is no index and the tag is the whole line address.
/// Each access ages every line's recency counter, which makes this O(n) per access, but it's the
/// baseline the approximate policies are measured against
#[derive(Debug)]
pub struct FullyAssociativeCache {
    tags: Vec<u32>,
    valid: Vec<bool>,
    recency: RecencyCounters,
    result: SimulationResult,
}

impl FullyAssociativeCache {
    pub fn new(geometry: CacheGeometry) -> Self {
        let blocks = geometry.total_blocks() as usize;
        Self {
            tags: vec![0; blocks],
            valid: vec![false; blocks],
            recency: RecencyCounters::new(blocks),
            result: SimulationResult::default(),
        }
    }

    /// The tag held by each line, `None` for lines never filled
    pub fn lines(&self) -> Vec<Option<u32>> {
        self.tags.iter().zip(&self.valid).map(|(tag, valid)| valid.then_some(*tag)).collect()
    }

    fn lookup(&mut self, tag: u32) -> bool {
        let blocks = self.tags.len();
        self.recency.age_set(0, blocks);
        let mut b = 0;
        while b < blocks {
            if self.valid[b] && self.tags[b] == tag {
                self.recency.update_on_read(b);
                return true;
            }
            b += 1;
        }
        let line = match self.valid.iter().position(|v| !v) {
            Some(free) => {
                self.recency.update_on_fill(free);
                free
            }
            None => self.recency.get_new_line(0, blocks),
        };
        self.tags[line] = tag;
        self.valid[line] = true;
        false
    }
}

impl CacheModel for FullyAssociativeCache {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(blocks: u32) -> FullyAssociativeCache {
        FullyAssociativeCache::new(CacheGeometry::fully_associative(blocks * 32).unwrap())
    }

    #[test]
    fn any_line_can_go_anywhere() {
        // These would all collide in a direct mapped cache of the same size
        let mut cache = cache(4);
        let trace = [0x0, 0x4000, 0x8000, 0xC000].map(MemoryAccess::load);
        for access in trace {
            assert!(!cache.access(access));
        }
        for access in trace {
            assert!(cache.access(access));
        }
        assert_eq!(cache.result(), SimulationResult::new(4, 8));
        assert_eq!(cache.get_uninitialised_line_count(), 0);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = cache(4);
        let (a, b, c, d, e) = (0x100, 0x200, 0x300, 0x400, 0x500);
        for address in [a, b, c, d, a, b] {
            cache.access(MemoryAccess::load(address));
        }
        // Oldest first: c, d, a, b
        assert!(!cache.access(MemoryAccess::load(e)));
        // d, a, b, e
        assert!(cache.access(MemoryAccess::load(d)));
        // a, b, e, d
        assert!(!cache.access(MemoryAccess::load(c)));
        // b, e, d, c
        assert!(cache.access(MemoryAccess::load(b)));
        assert!(!cache.access(MemoryAccess::load(a)));
    }

    #[test]
    fn stores_allocate() {
        let mut cache = cache(2);
        assert!(!cache.access(MemoryAccess::store(0x40)));
        assert!(cache.access(MemoryAccess::load(0x5c)));
    }

    #[test]
    fn cyclic_pattern_larger_than_cache_never_hits() {
        let mut cache = cache(4);
        for _ in 0..3 {
            for line in 0..5u32 {
                assert!(!cache.access(MemoryAccess::load(line * 32)));
            }
        }
    }
}
