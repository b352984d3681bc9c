use crate::address::{AddressDecomposer, LINE_SIZE};
use crate::config::{CacheGeometry, PrefetchPolicy, WritePolicy};
use crate::fully_associative::FullyAssociativeCache;
use crate::pseudo_lru::PseudoLruCache;
use crate::replacement_policies::{NoPolicy, RecencyCounters, ReplacementPolicy};
use crate::simulator::SimulationResult;
use crate::trace::{AccessKind, MemoryAccess};

/// A generic trait for caches
///
/// Technically not required as we're using static dispatch to speed things up instead of dyn Cache,
/// but this gives flexibility for the future with no overhead
pub trait CacheModel {
    /// Replays one trace access, returning true on a cache hit, and false otherwise
    ///
    /// On both hits and misses, the implementation must update its hit and access counters, and any
    /// replacement metadata
    ///
    /// # Arguments
    ///
    /// * `access`: The access to replay
    ///
    /// returns: bool
    fn access(&mut self, access: MemoryAccess) -> bool;

    /// The hits and accesses counted so far
    fn result(&self) -> SimulationResult;

    /// Gets the number of lines which were never filled. Useful for analysing cache performance or
    /// debugging
    fn get_uninitialised_line_count(&self) -> usize;
}

/// A generic set associative cache, parameterised by a replacement policy
///
/// Direct mapped caches are the one way case, using [`NoPolicy`]; anything wider uses
/// [`RecencyCounters`]. We rely on monomorphisation and the inlining of the replacement policy
/// functions for performance, rather than writing specialised implementations for each cache type
///
/// Lines are stored column-wise in flat vectors, with set `s` occupying slots
/// `s * ways .. (s + 1) * ways`
#[derive(Debug)]
pub struct Cache<R: ReplacementPolicy> {
    decomposer: AddressDecomposer,
    tags: Vec<u32>,
    valid: Vec<bool>,
    replacement_policy: R,
    set_size: usize,
    write_policy: WritePolicy,
    prefetch_policy: PrefetchPolicy,
    result: SimulationResult,
}

impl<R: ReplacementPolicy> Cache<R> {
    pub fn new(geometry: CacheGeometry, policy: R, write_policy: WritePolicy, prefetch_policy: PrefetchPolicy) -> Self {
        let cache_lines = geometry.total_blocks() as usize;
        Self {
            decomposer: geometry.decomposer(),
            tags: vec![0; cache_lines],
            valid: vec![false; cache_lines],
            replacement_policy: policy,
            set_size: geometry.ways() as usize,
            write_policy,
            prefetch_policy,
            result: SimulationResult::default(),
        }
    }

    pub fn ways(&self) -> usize {
        self.set_size
    }

    /// The tag held by each slot, set by set, `None` for slots never filled
    pub fn lines(&self) -> Vec<Option<u32>> {
        self.tags.iter().zip(&self.valid).map(|(tag, valid)| valid.then_some(*tag)).collect()
    }

    /// Looks up the line holding `address`, filling it on a miss when `allocate` is set
    ///
    /// Every slot of the set is aged whether or not the line is found. A fill takes the first empty
    /// slot of the set, and only asks the replacement policy for a victim when there is none
    fn lookup(&mut self, address: u32, allocate: bool) -> bool {
        let (set, tag) = self.decomposer.decompose(address);
        let set_inclusive_lower_bound = set * self.set_size;
        let set_exclusive_upper_bound = set_inclusive_lower_bound + self.set_size;
        self.replacement_policy.age_set(set_inclusive_lower_bound, self.set_size);
        // Only search the relevant set
        let mut x = set_inclusive_lower_bound;
        while x < set_exclusive_upper_bound {
            if self.valid[x] && self.tags[x] == tag {
                self.replacement_policy.update_on_read(x);
                return true;
            }
            x += 1;
        }
        if allocate {
            let line = match self.valid[set_inclusive_lower_bound..set_exclusive_upper_bound].iter().position(|v| !v) {
                Some(free) => {
                    let line = set_inclusive_lower_bound + free;
                    self.replacement_policy.update_on_fill(line);
                    line
                }
                None => self.replacement_policy.get_new_line(set_inclusive_lower_bound, self.set_size),
            };
            self.tags[line] = tag;
            self.valid[line] = true;
        }
        false
    }

    /// Brings the next sequential line in, without counting it as an access
    fn prefetch(&mut self, address: u32) {
        self.lookup(address.wrapping_add(LINE_SIZE), true);
    }
}

impl<R: ReplacementPolicy> CacheModel for Cache<R> {
    fn access(&mut self, access: MemoryAccess) -> bool {
        let allocate = !(access.kind == AccessKind::Store && self.write_policy == WritePolicy::NoWriteAllocate);
        let hit = self.lookup(access.address, allocate);
        self.result.record(hit);
        match self.prefetch_policy {
            PrefetchPolicy::Always => self.prefetch(access.address),
            PrefetchPolicy::OnMiss if !hit => self.prefetch(access.address),
            _ => {}
        }
        hit
    }

    fn result(&self) -> SimulationResult {
        self.result
    }

    fn get_uninitialised_line_count(&self) -> usize {
        self.valid.iter().filter(|v| !**v).count()
    }
}

/// Enum for every cache engine provided by the library
///
/// Using trait objects reduces boilerplate, but it is surprisingly slow, as this is completely
/// opaque to the compiler. We would be de-referencing for each access in the trace, so it's much
/// faster to explicitly branch on all implementations and let the compiler inline them
#[derive(Debug)]
pub enum GenericCache {
    DirectMapped(Cache<NoPolicy>),
    SetAssociative(Cache<RecencyCounters>),
    FullyAssociative(FullyAssociativeCache),
    PseudoLeastRecentlyUsed(PseudoLruCache),
}

impl From<Cache<NoPolicy>> for GenericCache {
    fn from(value: Cache<NoPolicy>) -> Self {
        Self::DirectMapped(value)
    }
}

impl From<Cache<RecencyCounters>> for GenericCache {
    fn from(value: Cache<RecencyCounters>) -> Self {
        Self::SetAssociative(value)
    }
}

impl From<FullyAssociativeCache> for GenericCache {
    fn from(value: FullyAssociativeCache) -> Self {
        Self::FullyAssociative(value)
    }
}

impl From<PseudoLruCache> for GenericCache {
    fn from(value: PseudoLruCache) -> Self {
        Self::PseudoLeastRecentlyUsed(value)
    }
}

impl CacheModel for GenericCache {
    fn access(&mut self, access: MemoryAccess) -> bool {
        match self {
            GenericCache::DirectMapped(c) => c.access(access),
            GenericCache::SetAssociative(c) => c.access(access),
            GenericCache::FullyAssociative(c) => c.access(access),
            GenericCache::PseudoLeastRecentlyUsed(c) => c.access(access),
        }
    }

    fn result(&self) -> SimulationResult {
        match self {
            GenericCache::DirectMapped(c) => c.result(),
            GenericCache::SetAssociative(c) => c.result(),
            GenericCache::FullyAssociative(c) => c.result(),
            GenericCache::PseudoLeastRecentlyUsed(c) => c.result(),
        }
    }

    fn get_uninitialised_line_count(&self) -> usize {
        match self {
            GenericCache::DirectMapped(c) => c.get_uninitialised_line_count(),
            GenericCache::SetAssociative(c) => c.get_uninitialised_line_count(),
            GenericCache::FullyAssociative(c) => c.get_uninitialised_line_count(),
            GenericCache::PseudoLeastRecentlyUsed(c) => c.get_uninitialised_line_count(),
        }
    }
}
